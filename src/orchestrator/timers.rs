//! Deferred orchestrator actions keyed by due time.

use crate::window::WindowId;
use tokio::time::Instant;

/// Work the orchestrator runs once its due time has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    /// Destroy a window after its fade-out.
    Destroy(WindowId),
    /// Hide a window after its fade-out.
    Hide(WindowId),
    /// Reload whatever model the settings name once writes have settled.
    ReloadSelectedModel,
}

/// Unordered queue of deferred actions.
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: Vec<(Instant, Deferred)>,
}

impl TimerQueue {
    pub fn schedule(&mut self, due: Instant, action: Deferred) {
        self.entries.push((due, action));
    }

    /// Remove and return every action due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<Deferred> {
        let mut due: Vec<(Instant, Deferred)> = Vec::new();
        let mut pending = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if entry.0 <= now {
                due.push(entry);
            } else {
                pending.push(entry);
            }
        }
        self.entries = pending;
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, action)| action).collect()
    }

    /// Drop queued actions matching `predicate`.
    pub fn cancel(&mut self, predicate: impl Fn(&Deferred) -> bool) {
        self.entries.retain(|(_, action)| !predicate(action));
    }

    #[must_use]
    pub fn contains(&self, action: &Deferred) -> bool {
        self.entries.iter().any(|(_, a)| a == action)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
