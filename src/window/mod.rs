//! Window handles and the platform capability interface.
//!
//! [`WindowPlatform`] is the only way the core touches real windows. The
//! orchestrator owns every [`WindowHandle`]; other components refer to
//! windows by [`WindowId`] and treat a missing window as a normal condition.

pub mod geometry;
pub mod headless;

pub use geometry::Bounds;
pub use headless::{HeadlessPlatform, PlatformCall};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform-assigned window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Role of a window in the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Main,
    Settings,
    Menu,
    Help,
}

impl WindowKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Settings => "settings",
            Self::Menu => "menu",
            Self::Help => "help",
        }
    }
}

/// Creation parameters for a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub kind: WindowKind,
    pub bounds: Bounds,
    pub resizable: bool,
    pub always_on_top: bool,
    pub transparent: bool,
    /// Show immediately after creation.
    pub visible: bool,
}

impl WindowSpec {
    #[must_use]
    pub fn new(kind: WindowKind, bounds: Bounds) -> Self {
        Self {
            kind,
            bounds,
            resizable: false,
            always_on_top: false,
            transparent: false,
            visible: true,
        }
    }

    #[must_use]
    pub fn always_on_top(mut self) -> Self {
        self.always_on_top = true;
        self
    }

    #[must_use]
    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Orchestrator-side record of a live window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowHandle {
    pub id: WindowId,
    pub kind: WindowKind,
    pub bounds: Bounds,
    pub visible: bool,
    pub always_on_top: bool,
}

/// Minimal capability interface over the native windowing system.
///
/// Calls on a destroyed window must be harmless. The display-mode
/// capabilities have no-op defaults for platforms without them.
pub trait WindowPlatform: Send + 'static {
    /// Work area of the primary display, or `None` when no display is attached.
    fn primary_work_area(&self) -> Option<Bounds>;

    /// Replace the work area with one reported by the native side.
    fn update_work_area(&mut self, _work_area: Option<Bounds>) {}

    /// Create a window.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShellError::Platform`] when the window cannot be created.
    fn create(&mut self, spec: &WindowSpec) -> Result<WindowId>;

    fn destroy(&mut self, id: WindowId);

    /// Move or resize a window.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShellError::Platform`] when the window is gone.
    fn set_bounds(&mut self, id: WindowId, bounds: Bounds) -> Result<()>;

    fn bounds(&self, id: WindowId) -> Option<Bounds>;

    /// Record a move or resize that happened on the native side.
    /// Issues no platform command.
    fn observe_bounds(&mut self, id: WindowId, bounds: Bounds);

    fn show(&mut self, id: WindowId);

    fn hide(&mut self, id: WindowId);

    fn is_destroyed(&self, id: WindowId) -> bool;

    fn set_resizable(&mut self, _id: WindowId, _resizable: bool) {}

    fn is_fullscreen(&self, _id: WindowId) -> bool {
        false
    }

    fn set_fullscreen(&mut self, _id: WindowId, _fullscreen: bool) {}

    /// Re-assert the circle look: transparent background, no shadow, full opacity.
    fn apply_circle_style(&mut self, _id: WindowId) {}

    fn minimize(&mut self, _id: WindowId) {}
}
