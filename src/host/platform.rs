//! Window platform for the stdio bridge.
//!
//! The core keeps its own model of every window (a [`HeadlessPlatform`]) and
//! mirrors each state change to the native side as a `window.command` event.
//! The native shell reports moves, closes and the display work area back
//! through host commands.

use crate::error::Result;
use crate::host::contract::EventEnvelope;
use crate::window::{Bounds, HeadlessPlatform, WindowId, WindowPlatform, WindowSpec};
use tokio::sync::broadcast;
use tracing::trace;

/// Event name for mirrored platform calls.
pub const WINDOW_COMMAND_EVENT: &str = "window.command";

pub struct BridgePlatform {
    model: HeadlessPlatform,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl BridgePlatform {
    /// Bridge with no display until the native side reports one.
    #[must_use]
    pub fn new(event_tx: broadcast::Sender<EventEnvelope>) -> Self {
        Self {
            model: HeadlessPlatform::without_display(),
            event_tx,
        }
    }

    #[must_use]
    pub fn model(&self) -> &HeadlessPlatform {
        &self.model
    }

    fn flush(&mut self) {
        for call in self.model.take_calls() {
            let payload = match serde_json::to_value(&call) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize window command; skipping");
                    continue;
                }
            };
            trace!(window_id = %call.window_id(), "mirroring window command");
            // No subscriber is fine; the native side may not be attached yet.
            let _ = self
                .event_tx
                .send(EventEnvelope::fresh(WINDOW_COMMAND_EVENT, payload));
        }
    }

    fn mirrored<T>(&mut self, op: impl FnOnce(&mut HeadlessPlatform) -> T) -> T {
        let out = op(&mut self.model);
        self.flush();
        out
    }
}

impl WindowPlatform for BridgePlatform {
    fn primary_work_area(&self) -> Option<Bounds> {
        self.model.primary_work_area()
    }

    fn update_work_area(&mut self, work_area: Option<Bounds>) {
        self.model.update_work_area(work_area);
    }

    fn create(&mut self, spec: &WindowSpec) -> Result<WindowId> {
        self.mirrored(|m| m.create(spec))
    }

    fn destroy(&mut self, id: WindowId) {
        self.mirrored(|m| m.destroy(id));
    }

    fn set_bounds(&mut self, id: WindowId, bounds: Bounds) -> Result<()> {
        self.mirrored(|m| m.set_bounds(id, bounds))
    }

    fn bounds(&self, id: WindowId) -> Option<Bounds> {
        self.model.bounds(id)
    }

    fn observe_bounds(&mut self, id: WindowId, bounds: Bounds) {
        self.model.observe_bounds(id, bounds);
    }

    fn show(&mut self, id: WindowId) {
        self.mirrored(|m| m.show(id));
    }

    fn hide(&mut self, id: WindowId) {
        self.mirrored(|m| m.hide(id));
    }

    fn is_destroyed(&self, id: WindowId) -> bool {
        self.model.is_destroyed(id)
    }

    fn set_resizable(&mut self, id: WindowId, resizable: bool) {
        self.mirrored(|m| m.set_resizable(id, resizable));
    }

    fn is_fullscreen(&self, id: WindowId) -> bool {
        self.model.is_fullscreen(id)
    }

    fn set_fullscreen(&mut self, id: WindowId, fullscreen: bool) {
        self.mirrored(|m| m.set_fullscreen(id, fullscreen));
    }

    fn apply_circle_style(&mut self, id: WindowId) {
        self.mirrored(|m| m.apply_circle_style(id));
    }

    fn minimize(&mut self, id: WindowId) {
        self.mirrored(|m| m.minimize(id));
    }
}

/// Decode a mirrored call's `op` tag, for native-side tests and tooling.
#[must_use]
pub fn command_op(event: &EventEnvelope) -> Option<&str> {
    if event.event != WINDOW_COMMAND_EVENT {
        return None;
    }
    event.payload.get("op").and_then(serde_json::Value::as_str)
}
