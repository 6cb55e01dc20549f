//! Shared settings document: typed view, change detection and persistence.
//!
//! The document is a JSON object shared by every window and by the inference
//! backend. Recognized top-level keys are `model`, `prompt`, `voice`,
//! `apiKeys` and `server`; unknown keys are carried through untouched.

pub mod diff;
pub mod redact;
pub mod store;

pub use diff::{Change, ChangeSet};
pub use store::SettingsStore;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend server mode stored under `server.mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    #[default]
    Production,
    Development,
}

impl ServerMode {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" => Some(Self::Production),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// The persisted settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsDocument(Map<String, Value>);

impl SettingsDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value. Returns `None` unless the value is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub(crate) fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert a top-level key, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Look up a dot-separated path such as `server.port`.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Build a partial document that sets a single dot-separated path.
    #[must_use]
    pub fn for_path(path: &str, value: Value) -> Self {
        let mut value = value;
        let segments: Vec<&str> = path.split('.').collect();
        for segment in segments.iter().skip(1).rev() {
            let mut map = Map::new();
            map.insert((*segment).to_owned(), value);
            value = Value::Object(map);
        }
        let mut root = Map::new();
        if let Some(first) = segments.first() {
            root.insert((*first).to_owned(), value);
        }
        Self(root)
    }

    /// Selected model id, if set and non-empty.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.non_empty_str("model")
    }

    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.non_empty_str("prompt")
    }

    #[must_use]
    pub fn voice(&self) -> Option<&str> {
        self.non_empty_str("voice")
    }

    /// API key under `apiKeys.<provider>` (e.g. `bithuman`, `openai`).
    #[must_use]
    pub fn api_key(&self, provider: &str) -> Option<&str> {
        self.get_path(&format!("apiKeys.{provider}"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn server_port(&self) -> Option<u16> {
        self.get_path("server.port")
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok())
    }

    #[must_use]
    pub fn server_mode(&self) -> ServerMode {
        self.get_path("server.mode")
            .and_then(Value::as_str)
            .and_then(ServerMode::parse)
            .unwrap_or_default()
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
