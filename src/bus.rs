//! Typed cross-window message bus.
//!
//! Every message names its target (one window, or the shell itself for
//! blocking notices) and carries one of a fixed set of [`ShellEvent`]s.

use crate::assets::ModelSummary;
use crate::window::WindowId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Notification delivered to windows or the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ShellEvent {
    ModelReloadStatus {
        success: bool,
        #[serde(rename = "characterName")]
        character_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    ModelsUpdated(Vec<ModelSummary>),
    SettingsOpening,
    SettingsClosed,
    LoadingState(bool),
    FadeIn,
    FadeOut,
    FullscreenEntered,
    WindowRestarted,
    /// Blocking user-facing notice.
    ErrorNotice { title: String, message: String },
}

impl ShellEvent {
    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ModelReloadStatus { .. } => "model-reload-status",
            Self::ModelsUpdated(_) => "models-updated",
            Self::SettingsOpening => "settings-opening",
            Self::SettingsClosed => "settings-closed",
            Self::LoadingState(_) => "loading-state",
            Self::FadeIn => "fade-in",
            Self::FadeOut => "fade-out",
            Self::FullscreenEntered => "fullscreen-entered",
            Self::WindowRestarted => "window-restarted",
            Self::ErrorNotice { .. } => "error-notice",
        }
    }

    /// Event payload as JSON, `null` for payload-less events.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(mut value) => value
                .get_mut("payload")
                .map(serde_json::Value::take)
                .unwrap_or(serde_json::Value::Null),
            Err(_) => serde_json::Value::Null,
        }
    }
}

/// Recipient of a bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum BusTarget {
    Window(WindowId),
    /// The shell process itself (dialogs and other app-level surfaces).
    Shell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub target: BusTarget,
    pub event: ShellEvent,
}

/// Broadcast bus shared by every component.
#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<BusMessage>,
}

impl MessageBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a message. Returns the number of subscribers that received it;
    /// publishing with no subscribers is not an error.
    pub fn publish(&self, target: BusTarget, event: ShellEvent) -> usize {
        trace!(event = event.name(), ?target, "bus publish");
        self.tx.send(BusMessage { target, event }).unwrap_or(0)
    }

    pub fn to_window(&self, id: WindowId, event: ShellEvent) -> usize {
        self.publish(BusTarget::Window(id), event)
    }

    pub fn to_shell(&self, event: ShellEvent) -> usize {
        self.publish(BusTarget::Shell, event)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(256)
    }
}
