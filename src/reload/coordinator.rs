//! Drives reload requests on the shell runtime and reports their outcome.

use crate::assets::{AssetKind, AssetRegistry};
use crate::config::ReloadConfig;
use crate::reload::{ReloadBackend, ReloadOutcome, ReloadPayload, ReloadRequest, ReloadState};
use crate::settings::{SettingsDocument, SettingsStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Receiving end of terminal reload outcomes.
pub type ReloadOutcomes = mpsc::UnboundedReceiver<ReloadOutcome>;

#[derive(Debug, Clone, Copy)]
struct PollTiming {
    poll_interval: Duration,
    timeout: Duration,
    error_budget: Duration,
    error_retry: Duration,
}

impl From<&ReloadConfig> for PollTiming {
    fn from(config: &ReloadConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            timeout: Duration::from_millis(config.timeout_ms),
            error_budget: Duration::from_millis(config.error_budget_ms),
            error_retry: Duration::from_millis(config.error_retry_ms.max(1)),
        }
    }
}

/// Shared between the coordinator and its spawned request tasks.
#[derive(Clone)]
struct Tracker {
    latest: Arc<AtomicU64>,
    current: Arc<Mutex<Option<ReloadRequest>>>,
}

impl Tracker {
    fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    fn superseded(&self, request: &mut ReloadRequest) -> bool {
        if request.check_superseded(self.latest()) {
            debug!(
                request_id = request.id,
                superseded_by = ?request.superseded_by,
                "reload request superseded; discarding"
            );
            true
        } else {
            false
        }
    }

    fn record(&self, request: &ReloadRequest) {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if request.id == self.latest() {
            *guard = Some(request.clone());
        }
    }
}

/// Runs the reload workflow. At most one request is honored at a time: a
/// newer [`reload`](Self::reload) makes older requests drop their results.
pub struct ModelReloadCoordinator {
    backend: Arc<dyn ReloadBackend>,
    settings: SettingsStore,
    assets: AssetRegistry,
    timing: PollTiming,
    tracker: Tracker,
    outcome_tx: mpsc::UnboundedSender<ReloadOutcome>,
}

impl ModelReloadCoordinator {
    #[must_use]
    pub fn new(
        backend: Arc<dyn ReloadBackend>,
        settings: SettingsStore,
        assets: AssetRegistry,
        config: &ReloadConfig,
    ) -> (Self, ReloadOutcomes) {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        (
            Self {
                backend,
                settings,
                assets,
                timing: PollTiming::from(config),
                tracker: Tracker {
                    latest: Arc::new(AtomicU64::new(0)),
                    current: Arc::new(Mutex::new(None)),
                },
                outcome_tx,
            },
            outcome_rx,
        )
    }

    /// Persist `model_id` as the selected model and start reloading it.
    ///
    /// Must be called from within the shell runtime. Returns the new request id.
    pub fn reload(&self, model_id: &str) -> u64 {
        self.settings
            .save(&SettingsDocument::new().with("model", serde_json::json!(model_id)));

        let id = self.tracker.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let issued_at = Instant::now();
        let request = ReloadRequest {
            id,
            model_id: model_id.to_owned(),
            issued_at,
            deadline: issued_at + self.timing.timeout,
            state: ReloadState::Requesting,
            superseded_by: None,
        };
        self.tracker.record(&request);
        info!(request_id = id, model_id, "model reload requested");

        let payload = self.build_payload(model_id);
        let backend = Arc::clone(&self.backend);
        let tracker = self.tracker.clone();
        let timing = self.timing;
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            if let Some(outcome) = drive(backend, tracker, timing, request, payload).await {
                let _ = outcome_tx.send(outcome);
            }
        });
        id
    }

    /// Id of the newest request, `0` before the first reload.
    #[must_use]
    pub fn latest_id(&self) -> u64 {
        self.tracker.latest()
    }

    /// Snapshot of the newest request.
    #[must_use]
    pub fn current(&self) -> Option<ReloadRequest> {
        self.tracker
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn build_payload(&self, model_id: &str) -> Option<ReloadPayload> {
        let model_path = self.assets.model_path(model_id)?;
        let doc = self.settings.load();
        let voice = doc
            .voice()
            .map(|v| match self.assets.find(AssetKind::Voices, v) {
                Some(entry) => entry.path.to_string_lossy().into_owned(),
                None => v.to_owned(),
            })
            .unwrap_or_default();
        Some(ReloadPayload {
            model_path: model_path.to_string_lossy().into_owned(),
            prompt: doc.prompt().unwrap_or_default().to_owned(),
            voice,
            force_reload: true,
        })
    }
}

async fn drive(
    backend: Arc<dyn ReloadBackend>,
    tracker: Tracker,
    timing: PollTiming,
    mut request: ReloadRequest,
    payload: Option<ReloadPayload>,
) -> Option<ReloadOutcome> {
    let Some(payload) = payload else {
        let error = format!("model file for '{}' not found", request.model_id);
        return finish(&tracker, request, ReloadState::Failed, Some(error));
    };

    let sent = backend.request_reload(&payload).await;
    if tracker.superseded(&mut request) {
        return None;
    }
    if let Err(e) = sent {
        return finish(&tracker, request, ReloadState::Failed, Some(e.to_string()));
    }

    request.state = ReloadState::Polling;
    tracker.record(&request);

    let mut failing_since: Option<Instant> = None;
    let mut wait = timing.poll_interval;
    loop {
        tokio::time::sleep_until((Instant::now() + wait).min(request.deadline)).await;
        if tracker.superseded(&mut request) {
            return None;
        }
        if Instant::now() >= request.deadline {
            return timed_out(&tracker, request, timing);
        }

        let status = tokio::time::timeout_at(request.deadline, backend.is_reloading()).await;
        if tracker.superseded(&mut request) {
            return None;
        }
        let Ok(status) = status else {
            return timed_out(&tracker, request, timing);
        };

        let now = Instant::now();
        match status {
            Ok(false) => return finish(&tracker, request, ReloadState::Succeeded, None),
            Ok(true) => {
                failing_since = None;
                wait = timing.poll_interval;
            }
            Err(e) => {
                let since = *failing_since.get_or_insert(now);
                if now.duration_since(since) >= timing.error_budget {
                    return finish(&tracker, request, ReloadState::Failed, Some(e.to_string()));
                }
                debug!(request_id = request.id, error = %e, "status query failed; retrying");
                wait = timing.error_retry;
            }
        }
    }
}

fn timed_out(tracker: &Tracker, request: ReloadRequest, timing: PollTiming) -> Option<ReloadOutcome> {
    let error = format!(
        "backend did not finish reloading within {}s",
        timing.timeout.as_secs()
    );
    finish(tracker, request, ReloadState::TimedOut, Some(error))
}

fn finish(
    tracker: &Tracker,
    mut request: ReloadRequest,
    state: ReloadState,
    error: Option<String>,
) -> Option<ReloadOutcome> {
    if tracker.superseded(&mut request) {
        return None;
    }
    request.state = state;
    tracker.record(&request);

    match &error {
        None => info!(request_id = request.id, model_id = %request.model_id, "model reload succeeded"),
        Some(e) => warn!(
            request_id = request.id,
            model_id = %request.model_id,
            state = ?state,
            error = %e,
            "model reload did not succeed"
        ),
    }

    Some(ReloadOutcome {
        request_id: request.id,
        model_id: request.model_id,
        state,
        error,
    })
}
