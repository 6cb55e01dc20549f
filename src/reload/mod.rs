//! Model reload workflow: request, poll, report.
//!
//! A reload persists the selected model, asks the inference backend to load
//! it, then polls the backend status until it reports it is no longer
//! reloading, the deadline passes, or status queries keep failing.

pub mod client;
pub mod coordinator;

pub use client::HttpReloadBackend;
pub use coordinator::{ModelReloadCoordinator, ReloadOutcomes};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Lifecycle of one reload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadState {
    Requesting,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl ReloadState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }
}

/// Body of the backend reload request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadPayload {
    pub model_path: String,
    pub prompt: String,
    pub voice: String,
    pub force_reload: bool,
}

/// One reload invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadRequest {
    pub id: u64,
    pub model_id: String,
    pub issued_at: Instant,
    pub deadline: Instant,
    pub state: ReloadState,
    /// Id of the newer request that replaced this one.
    pub superseded_by: Option<u64>,
}

impl ReloadRequest {
    /// Record that `latest` replaced this request. Returns `true` if it did.
    pub fn check_superseded(&mut self, latest: u64) -> bool {
        if latest != self.id {
            self.superseded_by = Some(latest);
            true
        } else {
            false
        }
    }
}

/// Terminal result of a reload, reported to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadOutcome {
    pub request_id: u64,
    pub model_id: String,
    pub state: ReloadState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReloadOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        self.state == ReloadState::Succeeded
    }
}

/// Inference backend endpoints used by the reload workflow.
#[async_trait]
pub trait ReloadBackend: Send + Sync + 'static {
    /// Ask the backend to load a model.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShellError::Network`] on transport failure or a non-2xx reply.
    async fn request_reload(&self, payload: &ReloadPayload) -> Result<()>;

    /// Whether the backend is still reloading.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShellError::Network`] when the status cannot be read.
    async fn is_reloading(&self) -> Result<bool>;
}
