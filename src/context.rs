//! Process-wide collaborators, built once at startup and passed explicitly.

use crate::assets::AssetRegistry;
use crate::bus::MessageBus;
use crate::config::ShellConfig;
use crate::error::Result;
use crate::reload::HttpReloadBackend;
use crate::settings::SettingsStore;
use crate::shell_dirs;
use std::sync::Arc;
use tracing::info;

/// Shared services every component constructor receives by reference.
#[derive(Debug, Clone)]
pub struct ShellContext {
    pub config: Arc<ShellConfig>,
    pub settings: SettingsStore,
    pub assets: AssetRegistry,
    pub bus: MessageBus,
}

impl ShellContext {
    #[must_use]
    pub fn new(config: ShellConfig, settings: SettingsStore, assets: AssetRegistry, bus: MessageBus) -> Self {
        Self {
            config: Arc::new(config),
            settings,
            assets,
            bus,
        }
    }

    /// Context rooted at the standard shell directories.
    ///
    /// # Errors
    ///
    /// Returns an error if `shell.toml` exists but is invalid, or the asset
    /// directories cannot be created.
    pub fn from_default_locations() -> Result<Self> {
        let config = ShellConfig::load_or_default(&shell_dirs::config_file())?;
        let assets = AssetRegistry::new(shell_dirs::assets_dir());
        assets.ensure_dirs()?;
        let ctx = Self::new(config, SettingsStore::at_default_location(), assets, MessageBus::default());
        info!(
            settings = %ctx.settings.path().display(),
            assets = %ctx.assets.root().display(),
            "shell context ready"
        );
        Ok(ctx)
    }

    /// Reload backend client for the current settings.
    #[must_use]
    pub fn reload_backend(&self) -> HttpReloadBackend {
        let port = self.settings.load().server_port();
        HttpReloadBackend::new(self.config.reload.resolve_base_url(port), &self.config.reload)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn reload_backend_uses_settings_port() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsStore::new(dir.path().join("settings.json"));
        settings.set_path("server.port", json!(5007));
        let ctx = ShellContext::new(
            ShellConfig::default(),
            settings,
            AssetRegistry::new(dir.path().join("assets")),
            MessageBus::default(),
        );
        assert_eq!(ctx.reload_backend().base_url(), "http://127.0.0.1:5007");
    }
}
