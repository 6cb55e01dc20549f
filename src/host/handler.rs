//! Production host command handler backed by the window orchestrator.

use crate::assets::AssetKind;
use crate::error::{Result, ShellError};
use crate::host::channel::ShellHandler;
use crate::orchestrator::WindowOrchestrator;
use crate::settings::SettingsDocument;
use crate::settings::redact::redact_value;
use crate::window::{Bounds, WindowId, WindowPlatform};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use tracing::info;

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| ShellError::Command(format!("failed to serialize response: {e}")))
}

impl<P: WindowPlatform> ShellHandler for WindowOrchestrator<P> {
    fn start(&mut self, work_area: Option<Bounds>) -> Result<serde_json::Value> {
        if let Some(area) = work_area {
            let area = area.validated()?;
            self.platform_mut().update_work_area(Some(area));
        }
        let handle = self.create_main()?;
        info!(window_id = %handle.id, "shell started");
        to_json(&handle)
    }

    fn query_state(&self) -> Result<serde_json::Value> {
        to_json(&self.state())
    }

    fn toggle_menu(&mut self) -> Result<serde_json::Value> {
        let visible = WindowOrchestrator::toggle_menu(self)?;
        Ok(json!({"visible": visible}))
    }

    fn select_menu(&mut self, window_id: WindowId) -> Result<serde_json::Value> {
        match self.select_menu_entry(window_id)? {
            Some(selection) => to_json(&selection),
            None => Ok(json!({"action": "none"})),
        }
    }

    fn open_settings(&mut self) -> Result<serde_json::Value> {
        let handle = self.create_settings()?;
        to_json(&handle)
    }

    fn close_settings(&mut self) -> Result<serde_json::Value> {
        let changes = WindowOrchestrator::close_settings(self);
        Ok(json!({
            "changed": !changes.is_empty(),
            "changes": changes.report(),
        }))
    }

    fn query_settings(&self, path: Option<&str>) -> Result<serde_json::Value> {
        let store = self.settings_store();
        match path {
            Some(path) => Ok(json!({
                "path": path,
                "value": store
                    .get_path(path)
                    .map_or(serde_json::Value::Null, |v| redact_value(path, &v)),
            })),
            None => Ok(redact_value("", &store.load().into_value())),
        }
    }

    fn save_settings(&mut self, partial: &SettingsDocument) -> Result<serde_json::Value> {
        let changes = WindowOrchestrator::save_settings(self, partial);
        Ok(json!({
            "changed": !changes.is_empty(),
            "changes": changes.report(),
        }))
    }

    fn toggle_display_mode(&mut self) -> Result<serde_json::Value> {
        let mode = WindowOrchestrator::toggle_display_mode(self);
        Ok(json!({"mode": mode}))
    }

    fn toggle_fullscreen(&mut self) -> Result<serde_json::Value> {
        let fullscreen = WindowOrchestrator::toggle_fullscreen(self);
        Ok(json!({"fullscreen": fullscreen}))
    }

    fn minimize(&mut self) -> Result<serde_json::Value> {
        WindowOrchestrator::minimize(self);
        Ok(json!({"accepted": true}))
    }

    fn window_moved(&mut self, window_id: Option<WindowId>, bounds: Bounds) -> Result<serde_json::Value> {
        let id = window_id
            .or_else(|| self.main_window().map(|h| h.id))
            .ok_or_else(|| ShellError::State("no main window".to_owned()))?;
        WindowOrchestrator::window_moved(self, id, bounds);
        Ok(json!({"accepted": true}))
    }

    fn close_window(&mut self, window_id: WindowId) -> Result<serde_json::Value> {
        let closed = WindowOrchestrator::close_window(self, window_id);
        Ok(json!({"closed": closed}))
    }

    fn toggle_help(&mut self) -> Result<serde_json::Value> {
        let id = WindowOrchestrator::toggle_help(self)?;
        Ok(json!({"window_id": id}))
    }

    fn select_model(&mut self, model_id: &str) -> Result<serde_json::Value> {
        let request_id = WindowOrchestrator::select_model(self, model_id);
        Ok(json!({"model_id": model_id, "request_id": request_id}))
    }

    fn query_models(&self) -> Result<serde_json::Value> {
        let models = self.assets().model_summaries();
        Ok(json!({
            "models": to_json(&models)?,
            "selected": self.settings_store().load().model(),
        }))
    }

    fn import_asset(&mut self, kind: AssetKind, path: &Path) -> Result<serde_json::Value> {
        let entry = WindowOrchestrator::import_asset(self, kind, path)?;
        to_json(&entry)
    }

    fn quit(&mut self) -> Result<serde_json::Value> {
        WindowOrchestrator::quit(self);
        Ok(json!({"quitting": true}))
    }

    fn tick(&mut self) {
        WindowOrchestrator::tick(self);
    }
}
