//! Durable settings store with read-merge-write saves.
//!
//! Writes are atomic (temp file → fsync → verify → rename) so a crash during
//! a save never leaves a truncated document behind.

use crate::error::{Result, ShellError};
use crate::settings::SettingsDocument;
use crate::settings::diff::{self, ChangeSet};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Settings document persisted as JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location ([`crate::shell_dirs::settings_file`]).
    #[must_use]
    pub fn at_default_location() -> Self {
        Self::new(crate::shell_dirs::settings_file())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted document.
    ///
    /// A missing, unreadable or malformed file yields an empty document.
    #[must_use]
    pub fn load(&self) -> SettingsDocument {
        match self.read() {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                debug!(path = %self.path.display(), "settings file absent; using empty document");
                SettingsDocument::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read settings; using empty document");
                SettingsDocument::new()
            }
        }
    }

    /// Merge `partial` over the stored document and persist the result.
    ///
    /// Returns the changes the merge produced. Write failures are logged and
    /// reported as an empty change set; use [`try_save`](Self::try_save) to
    /// observe them.
    pub fn save(&self, partial: &SettingsDocument) -> ChangeSet {
        match self.try_save(partial) {
            Ok(changes) => changes,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to save settings");
                ChangeSet::default()
            }
        }
    }

    /// Fallible variant of [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Filesystem`] if the merged document cannot be written.
    pub fn try_save(&self, partial: &SettingsDocument) -> Result<ChangeSet> {
        let before = self.load();
        let mut merged = before.clone();
        diff::merge(merged.as_map_mut(), partial.as_map());

        let changes = diff::diff(before.as_map(), merged.as_map());
        if changes.is_empty() {
            debug!("settings save produced no changes; skipping write");
            return Ok(changes);
        }

        write_json_atomic(&self.path, &merged.into_value())?;
        info!(changed = changes.len(), "settings saved");
        for line in changes.report() {
            debug!(change = %line, "settings change");
        }
        Ok(changes)
    }

    /// Structural comparison of two documents. Keys present only in `before`
    /// are not treated as removals.
    #[must_use]
    pub fn diff(before: &SettingsDocument, after: &SettingsDocument) -> ChangeSet {
        diff::diff(before.as_map(), after.as_map())
    }

    /// Read one dot-separated path (e.g. `server.port`) from the stored document.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<Value> {
        self.load().get_path(path).cloned()
    }

    /// Set one dot-separated path through a read-merge-write save.
    pub fn set_path(&self, path: &str, value: Value) -> ChangeSet {
        self.save(&SettingsDocument::for_path(path, value))
    }

    fn read(&self) -> Result<Option<SettingsDocument>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ShellError::Filesystem(format!(
                    "failed to read '{}': {e}",
                    self.path.display()
                )));
            }
        };
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            ShellError::Filesystem(format!("failed to parse '{}': {e}", self.path.display()))
        })?;
        SettingsDocument::from_value(value).map(Some).ok_or_else(|| {
            ShellError::Filesystem(format!(
                "'{}' does not contain a JSON object",
                self.path.display()
            ))
        })
    }
}

fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ShellError::Filesystem(format!(
                "failed to create settings directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ShellError::Filesystem(format!("failed to serialize settings: {e}")))?;

    let mut file = std::fs::File::create(&tmp_path).map_err(|e| {
        ShellError::Filesystem(format!(
            "failed to create temp file '{}': {e}",
            tmp_path.display()
        ))
    })?;
    file.write_all(text.as_bytes())
        .map_err(|e| ShellError::Filesystem(format!("failed to write temp file: {e}")))?;
    file.sync_all()
        .map_err(|e| ShellError::Filesystem(format!("failed to sync temp file: {e}")))?;
    drop(file);

    let written: Option<Value> = std::fs::read(&tmp_path)
        .ok()
        .and_then(|b| serde_json::from_slice(&b).ok());
    if written.as_ref() != Some(value) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ShellError::Filesystem(
            "settings verification failed after write".to_owned(),
        ));
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        ShellError::Filesystem(format!(
            "failed to rename '{}' to '{}': {e}",
            tmp_path.display(),
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> SettingsDocument {
        SettingsDocument::from_value(value).unwrap()
    }

    fn make_store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        (dir, store)
    }

    #[test]
    fn load_missing_file_is_empty_document() {
        let (_dir, store) = make_store();
        assert!(store.load().is_empty());
    }

    #[test]
    fn load_malformed_file_is_empty_document() {
        let (_dir, store) = make_store();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_empty());

        std::fs::write(store.path(), "[1, 2, 3]").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn sequential_saves_merge() {
        let (_dir, store) = make_store();
        store.save(&doc(json!({"model": "a"})));
        store.save(&doc(json!({"prompt": "hi"})));
        assert_eq!(store.load().into_value(), json!({"model": "a", "prompt": "hi"}));
    }

    #[test]
    fn second_identical_save_reports_no_changes() {
        let (_dir, store) = make_store();
        let partial = doc(json!({"model": "a", "server": {"port": 5001}}));
        let first = store.save(&partial);
        assert_eq!(first.len(), 2);
        let second = store.save(&partial);
        assert!(second.is_empty());
    }

    #[test]
    fn save_never_removes_existing_keys() {
        let (_dir, store) = make_store();
        store.save(&doc(json!({
            "model": "a",
            "apiKeys": {"bithuman": "bh", "openai": "oa"},
            "legacy": {"flag": true}
        })));
        let before: Vec<String> = store.load().keys().cloned().collect();

        store.save(&doc(json!({"apiKeys": {"openai": "new"}, "voice": "v"})));
        let after = store.load();
        for key in &before {
            assert!(after.get(key).is_some(), "key {key} was removed");
        }
        assert_eq!(after.api_key("bithuman"), Some("bh"));
        assert_eq!(after.api_key("openai"), Some("new"));
    }

    #[test]
    fn change_set_reports_old_and_new() {
        let (_dir, store) = make_store();
        store.save(&doc(json!({"model": "a"})));
        let changes = store.save(&doc(json!({"model": "b"})));
        let change = changes.get("model").unwrap();
        assert_eq!(change.old, Some(json!("a")));
        assert_eq!(change.new, json!("b"));
    }

    #[test]
    fn write_leaves_no_temp_file() {
        let (dir, store) = make_store();
        store.save(&doc(json!({"model": "a"})));
        assert!(store.path().exists());
        assert!(!dir.path().join("settings.json.tmp").exists());
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("a").join("b").join("settings.json"));
        store.try_save(&doc(json!({"model": "a"}))).unwrap();
        assert_eq!(store.load().model(), Some("a"));
    }

    #[test]
    fn unwritable_location_is_swallowed_by_save() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let store = SettingsStore::new(blocker.join("settings.json"));

        assert!(store.try_save(&doc(json!({"model": "a"}))).is_err());
        assert!(store.save(&doc(json!({"model": "a"}))).is_empty());
    }

    #[test]
    fn unknown_top_level_keys_survive_merges() {
        let (_dir, store) = make_store();
        std::fs::write(store.path(), r#"{"window": {"opacity": 0.9}, "model": "a"}"#).unwrap();
        store.save(&doc(json!({"model": "b"})));
        assert_eq!(store.get_path("window.opacity"), Some(json!(0.9)));
    }

    #[test]
    fn set_path_updates_nested_value() {
        let (_dir, store) = make_store();
        store.save(&doc(json!({"server": {"port": 5001, "mode": "production"}})));
        let changes = store.set_path("server.port", json!(5002));
        assert_eq!(changes.paths().collect::<Vec<_>>(), vec!["server.port"]);
        assert_eq!(store.load().server_port(), Some(5002));
        assert_eq!(store.get_path("server.mode"), Some(json!("production")));
    }

    #[test]
    fn diff_ignores_removed_keys() {
        let a = doc(json!({"model": "a", "prompt": "p"}));
        let b = doc(json!({"model": "a"}));
        assert!(SettingsStore::diff(&a, &b).is_empty());
        assert_eq!(SettingsStore::diff(&b, &a).len(), 1);
    }
}
