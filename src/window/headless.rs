//! In-memory window platform.
//!
//! Tracks window state without a windowing system and records every call,
//! so orchestration can be exercised in tests and mirrored by the host bridge.

use crate::error::{Result, ShellError};
use crate::window::{Bounds, WindowId, WindowKind, WindowPlatform, WindowSpec};
use serde::Serialize;
use std::collections::BTreeMap;

/// One recorded platform call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlatformCall {
    Create { id: WindowId, spec: WindowSpec },
    Destroy { id: WindowId },
    SetBounds { id: WindowId, bounds: Bounds },
    Show { id: WindowId },
    Hide { id: WindowId },
    SetResizable { id: WindowId, resizable: bool },
    SetFullscreen { id: WindowId, fullscreen: bool },
    ApplyCircleStyle { id: WindowId },
    Minimize { id: WindowId },
}

impl PlatformCall {
    #[must_use]
    pub fn window_id(&self) -> WindowId {
        match self {
            Self::Create { id, .. }
            | Self::Destroy { id }
            | Self::SetBounds { id, .. }
            | Self::Show { id }
            | Self::Hide { id }
            | Self::SetResizable { id, .. }
            | Self::SetFullscreen { id, .. }
            | Self::ApplyCircleStyle { id }
            | Self::Minimize { id } => *id,
        }
    }
}

#[derive(Debug, Clone)]
struct WindowState {
    kind: WindowKind,
    bounds: Bounds,
    visible: bool,
    resizable: bool,
    fullscreen: bool,
    minimized: bool,
}

/// Window platform without real windows.
#[derive(Debug, Clone)]
pub struct HeadlessPlatform {
    work_area: Option<Bounds>,
    next_id: u64,
    windows: BTreeMap<WindowId, WindowState>,
    calls: Vec<PlatformCall>,
    fail_creates: bool,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::without_display()
    }
}

impl HeadlessPlatform {
    /// Platform with a primary display of the given work area.
    #[must_use]
    pub fn with_work_area(work_area: Bounds) -> Self {
        Self {
            work_area: Some(work_area),
            ..Self::without_display()
        }
    }

    #[must_use]
    pub fn without_display() -> Self {
        Self {
            work_area: None,
            next_id: 1,
            windows: BTreeMap::new(),
            calls: Vec::new(),
            fail_creates: false,
        }
    }

    /// Make every following `create` fail.
    pub fn set_fail_creates(&mut self, fail: bool) {
        self.fail_creates = fail;
    }

    #[must_use]
    pub fn calls(&self) -> &[PlatformCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<PlatformCall> {
        std::mem::take(&mut self.calls)
    }

    #[must_use]
    pub fn live_windows(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    #[must_use]
    pub fn live_count(&self, kind: WindowKind) -> usize {
        self.windows.values().filter(|w| w.kind == kind).count()
    }

    #[must_use]
    pub fn is_visible(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| w.visible)
    }

    #[must_use]
    pub fn is_resizable(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| w.resizable)
    }

    #[must_use]
    pub fn is_minimized(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| w.minimized)
    }

    /// Simulate the user or OS entering native fullscreen outside the core.
    pub fn force_fullscreen_state(&mut self, id: WindowId, fullscreen: bool) {
        if let Some(w) = self.windows.get_mut(&id) {
            w.fullscreen = fullscreen;
        }
    }

    fn record(&mut self, call: PlatformCall) {
        self.calls.push(call);
    }
}

impl WindowPlatform for HeadlessPlatform {
    fn primary_work_area(&self) -> Option<Bounds> {
        self.work_area
    }

    fn update_work_area(&mut self, work_area: Option<Bounds>) {
        self.work_area = work_area;
    }

    fn create(&mut self, spec: &WindowSpec) -> Result<WindowId> {
        if self.fail_creates {
            return Err(ShellError::Platform(format!(
                "refused to create {} window",
                spec.kind.as_str()
            )));
        }
        let id = WindowId(self.next_id);
        self.next_id += 1;
        self.windows.insert(
            id,
            WindowState {
                kind: spec.kind,
                bounds: spec.bounds,
                visible: spec.visible,
                resizable: spec.resizable,
                fullscreen: false,
                minimized: false,
            },
        );
        self.record(PlatformCall::Create {
            id,
            spec: spec.clone(),
        });
        Ok(id)
    }

    fn destroy(&mut self, id: WindowId) {
        if self.windows.remove(&id).is_some() {
            self.record(PlatformCall::Destroy { id });
        }
    }

    fn set_bounds(&mut self, id: WindowId, bounds: Bounds) -> Result<()> {
        let Some(window) = self.windows.get_mut(&id) else {
            return Err(ShellError::Platform(format!("window {id} is destroyed")));
        };
        window.bounds = bounds;
        self.record(PlatformCall::SetBounds { id, bounds });
        Ok(())
    }

    fn bounds(&self, id: WindowId) -> Option<Bounds> {
        self.windows.get(&id).map(|w| w.bounds)
    }

    fn observe_bounds(&mut self, id: WindowId, bounds: Bounds) {
        if let Some(w) = self.windows.get_mut(&id) {
            w.bounds = bounds;
        }
    }

    fn show(&mut self, id: WindowId) {
        if let Some(w) = self.windows.get_mut(&id) {
            w.visible = true;
            w.minimized = false;
            self.record(PlatformCall::Show { id });
        }
    }

    fn hide(&mut self, id: WindowId) {
        if let Some(w) = self.windows.get_mut(&id) {
            w.visible = false;
            self.record(PlatformCall::Hide { id });
        }
    }

    fn is_destroyed(&self, id: WindowId) -> bool {
        !self.windows.contains_key(&id)
    }

    fn set_resizable(&mut self, id: WindowId, resizable: bool) {
        if let Some(w) = self.windows.get_mut(&id) {
            w.resizable = resizable;
            self.record(PlatformCall::SetResizable { id, resizable });
        }
    }

    fn is_fullscreen(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| w.fullscreen)
    }

    fn set_fullscreen(&mut self, id: WindowId, fullscreen: bool) {
        if let Some(w) = self.windows.get_mut(&id) {
            w.fullscreen = fullscreen;
            self.record(PlatformCall::SetFullscreen { id, fullscreen });
        }
    }

    fn apply_circle_style(&mut self, id: WindowId) {
        if self.windows.contains_key(&id) {
            self.record(PlatformCall::ApplyCircleStyle { id });
        }
    }

    fn minimize(&mut self, id: WindowId) {
        if let Some(w) = self.windows.get_mut(&id) {
            w.minimized = true;
            self.record(PlatformCall::Minimize { id });
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn spec(kind: WindowKind) -> WindowSpec {
        WindowSpec::new(kind, Bounds::new(0.0, 0.0, 100.0, 100.0))
    }

    #[test]
    fn create_and_destroy_track_liveness() {
        let mut platform = HeadlessPlatform::with_work_area(Bounds::new(0.0, 0.0, 800.0, 600.0));
        let id = platform.create(&spec(WindowKind::Menu)).unwrap();
        assert!(!platform.is_destroyed(id));
        assert_eq!(platform.live_count(WindowKind::Menu), 1);

        platform.destroy(id);
        assert!(platform.is_destroyed(id));
        assert_eq!(platform.live_count(WindowKind::Menu), 0);
    }

    #[test]
    fn calls_on_destroyed_window_are_harmless() {
        let mut platform = HeadlessPlatform::default();
        let id = platform.create(&spec(WindowKind::Help)).unwrap();
        platform.destroy(id);
        platform.take_calls();

        platform.show(id);
        platform.hide(id);
        platform.destroy(id);
        assert!(platform.set_bounds(id, Bounds::default()).is_err());
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn failing_create_is_platform_error() {
        let mut platform = HeadlessPlatform::default();
        platform.set_fail_creates(true);
        assert!(matches!(
            platform.create(&spec(WindowKind::Main)),
            Err(ShellError::Platform(_))
        ));
    }

    #[test]
    fn hidden_spec_creates_invisible_window() {
        let mut platform = HeadlessPlatform::default();
        let id = platform.create(&spec(WindowKind::Menu).hidden()).unwrap();
        assert!(!platform.is_visible(id));
        platform.show(id);
        assert!(platform.is_visible(id));
    }
}
