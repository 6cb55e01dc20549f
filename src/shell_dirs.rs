//! Centralized application directory paths for the avatar shell.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/bitHumanVisualAgent/` | `~/.local/share/bitHumanVisualAgent/` |
//! | Config | `~/Library/Application Support/bitHumanVisualAgent/` | `~/.config/bitHumanVisualAgent/` |
//!
//! # Environment Overrides
//!
//! - `AVATAR_SHELL_DATA_DIR` overrides [`data_dir`]
//! - `AVATAR_SHELL_CONFIG_DIR` overrides [`config_dir`]

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Directory name shared with the inference backend, which reads the same
/// settings document.
pub const APP_DIR_NAME: &str = "bitHumanVisualAgent";

/// Application data root: settings document, assets and logs.
#[must_use]
pub fn data_dir() -> PathBuf {
    resolve_dir(
        std::env::var_os("AVATAR_SHELL_DATA_DIR"),
        dirs::data_dir(),
        "/tmp/avatar-shell-data",
    )
}

/// Application config directory (`shell.toml`).
#[must_use]
pub fn config_dir() -> PathBuf {
    resolve_dir(
        std::env::var_os("AVATAR_SHELL_CONFIG_DIR"),
        dirs::config_dir(),
        "/tmp/avatar-shell-config",
    )
}

/// Shell config file path (`config_dir()/shell.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("shell.toml")
}

/// Persisted settings document (`data_dir()/settings.json`).
#[must_use]
pub fn settings_file() -> PathBuf {
    data_dir().join("settings.json")
}

/// Asset root (`data_dir()/assets/`).
#[must_use]
pub fn assets_dir() -> PathBuf {
    data_dir().join("assets")
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

fn resolve_dir(override_dir: Option<OsString>, base: Option<PathBuf>, fallback: &str) -> PathBuf {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    base.map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| Path::new(fallback).to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_nonempty() {
        assert!(!data_dir().as_os_str().is_empty());
    }

    #[test]
    fn settings_file_is_json_under_data_dir() {
        let path = settings_file();
        assert!(path.starts_with(data_dir()));
        assert!(path.to_string_lossy().ends_with("settings.json"));
    }

    #[test]
    fn config_file_ends_with_shell_toml() {
        let s = config_file().to_string_lossy().into_owned();
        assert!(s.ends_with("shell.toml"), "config_file: {s}");
    }

    #[test]
    fn logs_and_assets_are_subpaths_of_data_dir() {
        let data = data_dir();
        assert!(logs_dir().starts_with(&data));
        assert!(assets_dir().starts_with(&data));
    }

    #[test]
    fn override_wins_over_platform_dir() {
        let resolved = resolve_dir(
            Some(OsString::from("/custom/data")),
            Some(PathBuf::from("/home/u/.local/share")),
            "/tmp/x",
        );
        assert_eq!(resolved, PathBuf::from("/custom/data"));
    }

    #[test]
    fn empty_override_is_ignored() {
        let resolved = resolve_dir(
            Some(OsString::new()),
            Some(PathBuf::from("/home/u/.local/share")),
            "/tmp/x",
        );
        assert_eq!(
            resolved,
            PathBuf::from("/home/u/.local/share").join(APP_DIR_NAME)
        );
    }

    #[test]
    fn fallback_used_without_platform_dir() {
        assert_eq!(resolve_dir(None, None, "/tmp/x"), PathBuf::from("/tmp/x"));
    }
}
