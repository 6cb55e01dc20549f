//! Asset directory registry: models, images, voices and prompts.
//!
//! Assets live in one directory per kind under a shared root. An asset id is
//! its file stem; model files use the `.imx` extension.

use crate::error::{Result, ShellError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Kind of user asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Models,
    Images,
    Voices,
    Prompts,
}

impl AssetKind {
    pub const ALL: [Self; 4] = [Self::Models, Self::Images, Self::Voices, Self::Prompts];

    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Models => "models",
            Self::Images => "images",
            Self::Voices => "voices",
            Self::Prompts => "prompts",
        }
    }

    /// Accepted file extensions, lowercase, without the dot.
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Models => &["imx"],
            Self::Images => &["jpg", "jpeg", "png"],
            Self::Voices => &["wav"],
            Self::Prompts => &["txt"],
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "models" | "model" => Some(Self::Models),
            "images" | "image" => Some(Self::Images),
            "voices" | "voice" => Some(Self::Voices),
            "prompts" | "prompt" => Some(Self::Prompts),
            _ => None,
        }
    }

    fn accepts(self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions().contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

/// One asset file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub modified_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Character summary broadcast to windows in `models-updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub id: String,
    pub name: String,
    pub modified_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&AssetEntry> for ModelSummary {
    fn from(entry: &AssetEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            modified_at: entry.modified_at,
            created_at: entry.created_at,
        }
    }
}

/// Resolves per-kind asset directories under a root.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    root: PathBuf,
}

impl AssetRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn dir(&self, kind: AssetKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Create every asset directory.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Filesystem`] if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        for kind in AssetKind::ALL {
            let dir = self.dir(kind);
            std::fs::create_dir_all(&dir).map_err(|e| {
                ShellError::Filesystem(format!("failed to create '{}': {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    /// List assets of one kind, sorted by id. A missing directory is empty.
    #[must_use]
    pub fn list(&self, kind: AssetKind) -> Vec<AssetEntry> {
        let dir = self.dir(kind);
        let read_dir = match std::fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "asset directory not readable");
                return Vec::new();
            }
        };

        let mut entries: Vec<AssetEntry> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && kind.accepts(path))
            .filter_map(|path| entry_for(&path))
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    /// Character models, newest modification first, capped at `limit`.
    #[must_use]
    pub fn recent_models(&self, limit: usize) -> Vec<AssetEntry> {
        let mut models = self.list(AssetKind::Models);
        models.sort_by(|a, b| b.modified_at.cmp(&a.modified_at).then(a.id.cmp(&b.id)));
        models.truncate(limit);
        models
    }

    #[must_use]
    pub fn model_summaries(&self) -> Vec<ModelSummary> {
        self.list(AssetKind::Models)
            .iter()
            .map(ModelSummary::from)
            .collect()
    }

    /// Find an asset by id: exact match first, then case-insensitive.
    #[must_use]
    pub fn find(&self, kind: AssetKind, id: &str) -> Option<AssetEntry> {
        let entries = self.list(kind);
        if let Some(exact) = entries.iter().find(|e| e.id == id) {
            return Some(exact.clone());
        }
        let lower = id.to_lowercase();
        entries.into_iter().find(|e| e.id.to_lowercase() == lower)
    }

    #[must_use]
    pub fn exists(&self, kind: AssetKind, id: &str) -> bool {
        self.find(kind, id).is_some()
    }

    /// Resolved model file for a model id.
    #[must_use]
    pub fn model_path(&self, id: &str) -> Option<PathBuf> {
        self.find(AssetKind::Models, id).map(|e| e.path)
    }

    /// Copy a user-selected file into the asset directory for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Filesystem`] if the source is missing, has the
    /// wrong extension, or cannot be copied.
    pub fn import(&self, kind: AssetKind, source: &Path) -> Result<AssetEntry> {
        if !source.is_file() {
            return Err(ShellError::Filesystem(format!(
                "import source '{}' is not a file",
                source.display()
            )));
        }
        if !kind.accepts(source) {
            return Err(ShellError::Filesystem(format!(
                "'{}' is not a valid {} file (expected {})",
                source.display(),
                kind.dir_name(),
                kind.extensions().join(", ")
            )));
        }
        let file_name = source.file_name().ok_or_else(|| {
            ShellError::Filesystem(format!("'{}' has no file name", source.display()))
        })?;

        let dir = self.dir(kind);
        std::fs::create_dir_all(&dir).map_err(|e| {
            ShellError::Filesystem(format!("failed to create '{}': {e}", dir.display()))
        })?;

        let dest = dir.join(file_name);
        let tmp = dir.join(format!(".{}.importing", file_name.to_string_lossy()));
        std::fs::copy(source, &tmp).map_err(|e| {
            ShellError::Filesystem(format!(
                "failed to copy '{}' into '{}': {e}",
                source.display(),
                dir.display()
            ))
        })?;
        std::fs::rename(&tmp, &dest).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            ShellError::Filesystem(format!("failed to finalize '{}': {e}", dest.display()))
        })?;

        let entry = entry_for(&dest).ok_or_else(|| {
            ShellError::Filesystem(format!("imported file '{}' is unreadable", dest.display()))
        })?;
        info!(kind = kind.dir_name(), id = %entry.id, "asset imported");
        Ok(entry)
    }
}

/// Human-readable name from an asset id: `albert_einstein` → `Albert Einstein`.
#[must_use]
pub fn display_name(id: &str) -> String {
    id.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn entry_for(path: &Path) -> Option<AssetEntry> {
    let id = path.file_stem()?.to_str()?.to_owned();
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot stat asset");
            return None;
        }
    };
    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let created = metadata.created().unwrap_or(modified);
    Some(AssetEntry {
        name: display_name(&id),
        id,
        path: path.to_path_buf(),
        modified_at: DateTime::<Utc>::from(modified),
        created_at: DateTime::<Utc>::from(created),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::time::Duration;

    fn touch(path: &Path, age_secs: u64) {
        std::fs::write(path, b"x").unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    fn make_registry() -> (tempfile::TempDir, AssetRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = AssetRegistry::new(dir.path().join("assets"));
        registry.ensure_dirs().unwrap();
        (dir, registry)
    }

    #[test]
    fn display_name_title_cases_ids() {
        assert_eq!(display_name("albert_einstein"), "Albert Einstein");
        assert_eq!(display_name("MARIE_curie"), "Marie Curie");
        assert_eq!(display_name("solo"), "Solo");
    }

    #[test]
    fn list_filters_by_extension() {
        let (_dir, registry) = make_registry();
        let models = registry.dir(AssetKind::Models);
        touch(&models.join("albert_einstein.imx"), 10);
        touch(&models.join("notes.txt"), 10);

        let listed = registry.list(AssetKind::Models);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "albert_einstein");
        assert_eq!(listed[0].name, "Albert Einstein");
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let registry = AssetRegistry::new("/nonexistent/avatar-shell-assets");
        assert!(registry.list(AssetKind::Voices).is_empty());
    }

    #[test]
    fn recent_models_sorts_newest_first_and_caps() {
        let (_dir, registry) = make_registry();
        let models = registry.dir(AssetKind::Models);
        for (i, id) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            touch(&models.join(format!("{id}.imx")), 100 - (i as u64) * 10);
        }

        let recent: Vec<String> = registry.recent_models(4).into_iter().map(|m| m.id).collect();
        assert_eq!(recent, vec!["e", "d", "c", "b"]);
    }

    #[test]
    fn find_falls_back_to_case_insensitive() {
        let (_dir, registry) = make_registry();
        touch(&registry.dir(AssetKind::Models).join("Albert.imx"), 1);
        assert!(registry.exists(AssetKind::Models, "Albert"));
        assert!(registry.model_path("albert").is_some());
        assert!(registry.model_path("nobody").is_none());
    }

    #[test]
    fn import_copies_into_kind_directory() {
        let (dir, registry) = make_registry();
        let source = dir.path().join("new_face.imx");
        touch(&source, 0);

        let entry = registry.import(AssetKind::Models, &source).unwrap();
        assert_eq!(entry.id, "new_face");
        assert!(registry.dir(AssetKind::Models).join("new_face.imx").exists());
        assert!(source.exists());
    }

    #[test]
    fn import_rejects_wrong_extension_and_missing_source() {
        let (dir, registry) = make_registry();
        let source = dir.path().join("voice.mp3");
        touch(&source, 0);

        assert!(matches!(
            registry.import(AssetKind::Voices, &source),
            Err(ShellError::Filesystem(_))
        ));
        assert!(registry
            .import(AssetKind::Voices, &dir.path().join("absent.wav"))
            .is_err());
    }

    #[test]
    fn asset_kind_parse_accepts_singular_and_plural() {
        assert_eq!(AssetKind::parse("model"), Some(AssetKind::Models));
        assert_eq!(AssetKind::parse("Images"), Some(AssetKind::Images));
        assert_eq!(AssetKind::parse("sounds"), None);
    }
}
