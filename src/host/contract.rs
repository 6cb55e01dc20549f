//! Versioned host command/event envelopes for native shell integration.

use serde::{Deserialize, Serialize};

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// Command set accepted from the native shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "host.ping")]
    HostPing,
    #[serde(rename = "host.version")]
    HostVersion,
    #[serde(rename = "shell.start")]
    ShellStart,
    #[serde(rename = "shell.state")]
    ShellState,
    #[serde(rename = "menu.toggle")]
    MenuToggle,
    #[serde(rename = "menu.select")]
    MenuSelect,
    #[serde(rename = "settings.open")]
    SettingsOpen,
    #[serde(rename = "settings.close")]
    SettingsClose,
    #[serde(rename = "settings.get")]
    SettingsGet,
    #[serde(rename = "settings.save")]
    SettingsSave,
    #[serde(rename = "display.toggle_mode")]
    DisplayToggleMode,
    #[serde(rename = "display.toggle_fullscreen")]
    DisplayToggleFullscreen,
    #[serde(rename = "window.minimize")]
    WindowMinimize,
    #[serde(rename = "window.moved")]
    WindowMoved,
    #[serde(rename = "window.close")]
    WindowClose,
    #[serde(rename = "help.toggle")]
    HelpToggle,
    #[serde(rename = "model.select")]
    ModelSelect,
    #[serde(rename = "models.list")]
    ModelsList,
    #[serde(rename = "assets.import")]
    AssetsImport,
    #[serde(rename = "app.quit")]
    AppQuit,
}

impl CommandName {
    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostPing => "host.ping",
            Self::HostVersion => "host.version",
            Self::ShellStart => "shell.start",
            Self::ShellState => "shell.state",
            Self::MenuToggle => "menu.toggle",
            Self::MenuSelect => "menu.select",
            Self::SettingsOpen => "settings.open",
            Self::SettingsClose => "settings.close",
            Self::SettingsGet => "settings.get",
            Self::SettingsSave => "settings.save",
            Self::DisplayToggleMode => "display.toggle_mode",
            Self::DisplayToggleFullscreen => "display.toggle_fullscreen",
            Self::WindowMinimize => "window.minimize",
            Self::WindowMoved => "window.moved",
            Self::WindowClose => "window.close",
            Self::HelpToggle => "help.toggle",
            Self::ModelSelect => "model.select",
            Self::ModelsList => "models.list",
            Self::AssetsImport => "assets.import",
            Self::AppQuit => "app.quit",
        }
    }

    /// Parse a command name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "host.ping" => Some(Self::HostPing),
            "host.version" => Some(Self::HostVersion),
            "shell.start" => Some(Self::ShellStart),
            "shell.state" => Some(Self::ShellState),
            "menu.toggle" => Some(Self::MenuToggle),
            "menu.select" => Some(Self::MenuSelect),
            "settings.open" => Some(Self::SettingsOpen),
            "settings.close" => Some(Self::SettingsClose),
            "settings.get" => Some(Self::SettingsGet),
            "settings.save" => Some(Self::SettingsSave),
            "display.toggle_mode" => Some(Self::DisplayToggleMode),
            "display.toggle_fullscreen" => Some(Self::DisplayToggleFullscreen),
            "window.minimize" => Some(Self::WindowMinimize),
            "window.moved" => Some(Self::WindowMoved),
            "window.close" => Some(Self::WindowClose),
            "help.toggle" => Some(Self::HelpToggle),
            "model.select" => Some(Self::ModelSelect),
            "models.list" => Some(Self::ModelsList),
            "assets.import" => Some(Self::AssetsImport),
            "app.quit" => Some(Self::AppQuit),
            _ => None,
        }
    }
}

/// A versioned response envelope from backend host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// A versioned command envelope from frontend -> backend host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    /// Build a v1 command envelope.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != EVENT_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, EVENT_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A versioned event envelope from backend host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }

    /// Envelope with a fresh random event id.
    #[must_use]
    pub fn fresh(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), event, payload)
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ContractError {}
