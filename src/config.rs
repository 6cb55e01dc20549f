//! Configuration types for the avatar shell.
//!
//! Loaded from `shell.toml` (see [`crate::shell_dirs::config_file`]); every
//! section falls back to its defaults for missing fields.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level shell configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Window geometry and menu layout.
    pub window: WindowConfig,
    /// Settle delays, fades and timers.
    pub timing: TimingConfig,
    /// Inference backend reload protocol.
    pub reload: ReloadConfig,
}

/// Window geometry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Main window width is `floor(work_area_width / width_divisor)`.
    pub width_divisor: f64,
    /// Distance of the main window from the right and bottom work-area edges.
    pub edge_margin: i32,
    /// Side length of each satellite (menu) window.
    pub satellite_size: u32,
    /// Distance from the main window center to each satellite center.
    pub fan_radius: f64,
    /// Total angular span of the satellite fan.
    pub fan_spread_degrees: f64,
    /// Maximum number of character entries shown in the menu.
    pub max_menu_characters: usize,
    pub settings_width: u32,
    pub settings_height: u32,
    pub help_width: u32,
    pub help_height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width_divisor: 6.67,
            edge_margin: 50,
            satellite_size: 100,
            fan_radius: 225.0,
            fan_spread_degrees: 120.0,
            max_menu_characters: 4,
            settings_width: 800,
            settings_height: 600,
            help_width: 480,
            help_height: 360,
        }
    }
}

/// Timer and settle-delay settings, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Fade transition length before a faded-out window is destroyed or hidden.
    pub fade_ms: u64,
    /// Wait after the settings window closes before a reload is issued.
    pub reload_settle_ms: u64,
    /// Wait between forcing native fullscreen off and re-entering it.
    pub fullscreen_reenter_ms: u64,
    /// Wait after entering native fullscreen before announcing it.
    pub fullscreen_announce_ms: u64,
    /// Help panel auto-close timer.
    pub help_auto_close_ms: u64,
    /// Interval of the cooperative scheduler tick in the host loop.
    pub tick_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fade_ms: 300,
            reload_settle_ms: 1000,
            fullscreen_reenter_ms: 50,
            fullscreen_announce_ms: 200,
            help_auto_close_ms: 10_000,
            tick_interval_ms: 25,
        }
    }
}

impl TimingConfig {
    #[must_use]
    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }

    #[must_use]
    pub fn reload_settle(&self) -> Duration {
        Duration::from_millis(self.reload_settle_ms)
    }

    #[must_use]
    pub fn fullscreen_reenter(&self) -> Duration {
        Duration::from_millis(self.fullscreen_reenter_ms)
    }

    #[must_use]
    pub fn fullscreen_announce(&self) -> Duration {
        Duration::from_millis(self.fullscreen_announce_ms)
    }

    #[must_use]
    pub fn help_auto_close(&self) -> Duration {
        Duration::from_millis(self.help_auto_close_ms)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Reload protocol settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Explicit backend base URL. When unset, the URL is derived from the
    /// `server.port` entry of the settings document.
    pub base_url: Option<String>,
    /// Port used when neither `base_url` nor `server.port` is set.
    pub default_port: u16,
    pub status_path: String,
    pub reload_path: String,
    pub poll_interval_ms: u64,
    /// Overall deadline for the backend to finish reloading.
    pub timeout_ms: u64,
    /// Consecutive status-query errors tolerated before giving up.
    pub error_budget_ms: u64,
    /// Retry interval while status queries are failing.
    pub error_retry_ms: u64,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            default_port: 5001,
            status_path: "/api/status".to_owned(),
            reload_path: "/api/reload".to_owned(),
            poll_interval_ms: 500,
            timeout_ms: 30_000,
            error_budget_ms: 5_000,
            error_retry_ms: 1_000,
            request_timeout_secs: 10,
        }
    }
}

impl ReloadConfig {
    /// Resolve the backend base URL, preferring the explicit override.
    #[must_use]
    pub fn resolve_base_url(&self, settings_port: Option<u16>) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => format!(
                "http://127.0.0.1:{}",
                settings_port.unwrap_or(self.default_port)
            ),
        }
    }
}

impl ShellConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::ShellError::Config(e.to_string()))
    }

    /// Load the config at `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default(path: &Path) -> crate::error::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ShellError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_matches_shell_constants() {
        let config = ShellConfig::default();
        assert_eq!(config.window.edge_margin, 50);
        assert_eq!(config.window.satellite_size, 100);
        assert!((config.window.fan_radius - 225.0).abs() < f64::EPSILON);
        assert_eq!(config.window.max_menu_characters, 4);
        assert_eq!(config.timing.fade_ms, 300);
        assert_eq!(config.timing.reload_settle_ms, 1000);
        assert_eq!(config.reload.poll_interval_ms, 500);
        assert_eq!(config.reload.timeout_ms, 30_000);
        assert_eq!(config.reload.error_budget_ms, 5_000);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shell.toml");

        let mut config = ShellConfig::default();
        config.window.fan_radius = 300.0;
        config.reload.base_url = Some("http://localhost:9000".to_owned());

        config.save_to_file(&path).unwrap();
        let loaded = ShellConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell.toml");
        std::fs::write(&path, "[timing]\nfade_ms = 120\n").unwrap();

        let loaded = ShellConfig::from_file(&path).unwrap();
        assert_eq!(loaded.timing.fade_ms, 120);
        assert_eq!(loaded.timing.help_auto_close_ms, 10_000);
        assert_eq!(loaded.window, WindowConfig::default());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell.toml");
        std::fs::write(&path, "{{{{not toml").unwrap();

        let result = ShellConfig::from_file(&path);
        assert!(matches!(result, Err(crate::error::ShellError::Config(_))));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ShellConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, ShellConfig::default());
    }

    #[test]
    fn base_url_prefers_override_then_settings_port() {
        let mut reload = ReloadConfig::default();
        assert_eq!(reload.resolve_base_url(None), "http://127.0.0.1:5001");
        assert_eq!(reload.resolve_base_url(Some(5004)), "http://127.0.0.1:5004");

        reload.base_url = Some("http://example.test:8080/".to_owned());
        assert_eq!(reload.resolve_base_url(Some(5004)), "http://example.test:8080");
    }
}
