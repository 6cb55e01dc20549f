//! Circle → Square → Fullscreen state machine for the main window.
//!
//! Native fullscreen needs settle delays around the platform's own
//! animation. Instead of chaining timers, the controller keeps one pending
//! step with a due time and advances it from [`DisplayModeController::tick`].

use crate::config::TimingConfig;
use crate::window::{WindowId, WindowPlatform};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Shape of the main surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Circle,
    Square,
    Fullscreen,
}

impl DisplayMode {
    #[must_use]
    pub fn is_resizable(self) -> bool {
        matches!(self, Self::Square)
    }
}

/// What the caller must do after a mode toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Nothing happened (no main window).
    Ignored,
    Entered(DisplayMode),
    /// Leaving fullscreen: destroy and recreate the main window in circle mode.
    RestartRequired,
}

/// Deferred platform step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStep {
    /// Native fullscreen was forced off; turn it back on.
    Reenter,
    /// Native fullscreen is on; tell consumers once the platform has settled.
    Announce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    pub step: PendingStep,
    pub due: Instant,
}

/// Display-mode state of the main window.
#[derive(Debug, Clone)]
pub struct DisplayModeController {
    mode: DisplayMode,
    previous_size: Option<(f64, f64)>,
    pending: Option<PendingTransition>,
    history: Vec<DisplayMode>,
    reenter_delay: Duration,
    announce_delay: Duration,
}

impl DisplayModeController {
    #[must_use]
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            mode: DisplayMode::Circle,
            previous_size: None,
            pending: None,
            history: vec![DisplayMode::Circle],
            reenter_delay: timing.fullscreen_reenter(),
            announce_delay: timing.fullscreen_announce(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    #[must_use]
    pub fn pending(&self) -> Option<PendingTransition> {
        self.pending
    }

    /// Every mode entered since creation, oldest first.
    #[must_use]
    pub fn history(&self) -> &[DisplayMode] {
        &self.history
    }

    #[must_use]
    pub fn previous_size(&self) -> Option<(f64, f64)> {
        self.previous_size
    }

    /// Back to circle after the main window was recreated. Any pending step
    /// belonged to the old window and is dropped.
    pub fn reset(&mut self) {
        self.pending = None;
        if self.mode != DisplayMode::Circle {
            self.enter(DisplayMode::Circle);
        }
    }

    /// Advance Circle → Square → Fullscreen.
    pub fn toggle(
        &mut self,
        platform: &mut dyn WindowPlatform,
        main: Option<WindowId>,
        now: Instant,
    ) -> ToggleOutcome {
        let Some(id) = live(platform, main) else {
            debug!("display mode toggle ignored: no main window");
            return ToggleOutcome::Ignored;
        };

        match self.mode {
            DisplayMode::Circle => {
                platform.set_resizable(id, true);
                self.enter(DisplayMode::Square);
                ToggleOutcome::Entered(DisplayMode::Square)
            }
            DisplayMode::Square => {
                self.remember_size(platform, id);
                platform.set_resizable(id, false);
                self.start_native_fullscreen(platform, id, now);
                self.enter(DisplayMode::Fullscreen);
                ToggleOutcome::Entered(DisplayMode::Fullscreen)
            }
            DisplayMode::Fullscreen => ToggleOutcome::RestartRequired,
        }
    }

    /// Flip native fullscreen without changing the display mode.
    ///
    /// Returns the new native fullscreen state, or `None` without a main window.
    pub fn toggle_fullscreen_only(
        &mut self,
        platform: &mut dyn WindowPlatform,
        main: Option<WindowId>,
        now: Instant,
    ) -> Option<bool> {
        let id = live(platform, main)?;

        if platform.is_fullscreen(id) || self.pending.is_some() {
            self.pending = None;
            platform.set_fullscreen(id, false);
            if let (Some((width, height)), Some(bounds)) = (self.previous_size, platform.bounds(id))
            {
                if let Err(e) = platform.set_bounds(id, bounds.with_size(width, height)) {
                    debug!(error = %e, "could not restore size after fullscreen");
                }
            }
            if self.mode == DisplayMode::Circle {
                platform.apply_circle_style(id);
            }
            Some(false)
        } else {
            self.remember_size(platform, id);
            self.start_native_fullscreen(platform, id, now);
            Some(true)
        }
    }

    /// Run the pending step if it is due. Returns `true` when fullscreen
    /// should be announced to consumers.
    pub fn tick(
        &mut self,
        platform: &mut dyn WindowPlatform,
        main: Option<WindowId>,
        now: Instant,
    ) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        if now < pending.due {
            return false;
        }
        let Some(id) = live(platform, main) else {
            self.pending = None;
            return false;
        };

        match pending.step {
            PendingStep::Reenter => {
                platform.set_fullscreen(id, true);
                self.pending = Some(PendingTransition {
                    step: PendingStep::Announce,
                    due: now + self.announce_delay,
                });
                false
            }
            PendingStep::Announce => {
                self.pending = None;
                true
            }
        }
    }

    fn start_native_fullscreen(&mut self, platform: &mut dyn WindowPlatform, id: WindowId, now: Instant) {
        if platform.is_fullscreen(id) {
            platform.set_fullscreen(id, false);
            self.pending = Some(PendingTransition {
                step: PendingStep::Reenter,
                due: now + self.reenter_delay,
            });
        } else {
            platform.set_fullscreen(id, true);
            self.pending = Some(PendingTransition {
                step: PendingStep::Announce,
                due: now + self.announce_delay,
            });
        }
    }

    fn remember_size(&mut self, platform: &dyn WindowPlatform, id: WindowId) {
        if let Some(bounds) = platform.bounds(id) {
            self.previous_size = Some((bounds.width, bounds.height));
        }
    }

    fn enter(&mut self, mode: DisplayMode) {
        self.mode = mode;
        self.history.push(mode);
    }
}

fn live(platform: &dyn WindowPlatform, main: Option<WindowId>) -> Option<WindowId> {
    main.filter(|id| !platform.is_destroyed(*id))
}
