//! Window lifecycle orchestration.
//!
//! [`WindowOrchestrator`] owns every window handle and the state tied to
//! them: display mode, the radial menu, the settings snapshot, the help
//! timer, and the reload coordinator. All work runs on one control loop:
//! user triggers call the public operations, and [`WindowOrchestrator::tick`]
//! advances deferred steps (fades, settle delays, reload outcomes).

pub mod menu;
pub mod timers;

pub use menu::{MenuEntry, MenuItem, MenuSelection, MenuSet};

use crate::assets::{AssetEntry, AssetKind, AssetRegistry, display_name};
use crate::bus::{MessageBus, ShellEvent};
use crate::config::ShellConfig;
use crate::context::ShellContext;
use crate::display_mode::{DisplayMode, DisplayModeController, ToggleOutcome};
use crate::error::{Result, ShellError};
use crate::fan_layout::FanParams;
use crate::reload::{ModelReloadCoordinator, ReloadBackend, ReloadOutcome, ReloadOutcomes, ReloadState};
use crate::settings::{ChangeSet, SettingsDocument, SettingsStore};
use crate::window::geometry::{centered_in, main_window_bounds};
use crate::window::{Bounds, WindowHandle, WindowId, WindowKind, WindowPlatform, WindowSpec};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use timers::{Deferred, TimerQueue};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
struct HelpPanel {
    id: WindowId,
    close_at: Instant,
}

/// Serializable view of the orchestrator for diagnostics and host queries.
#[derive(Debug, Clone, Serialize)]
pub struct ShellState {
    pub main: Option<WindowHandle>,
    pub display_mode: DisplayMode,
    pub menu_visible: bool,
    pub menu: Vec<MenuEntry>,
    pub settings_open: bool,
    pub help_open: bool,
    pub quitting: bool,
    pub windows: Vec<WindowHandle>,
    pub reload: Option<ReloadSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReloadSummary {
    pub request_id: u64,
    pub model_id: String,
    pub state: ReloadState,
}

/// Owner of all shell windows.
pub struct WindowOrchestrator<P: WindowPlatform> {
    platform: P,
    config: Arc<ShellConfig>,
    settings: SettingsStore,
    assets: AssetRegistry,
    bus: MessageBus,
    fan: FanParams,
    windows: BTreeMap<WindowId, WindowHandle>,
    main: Option<WindowId>,
    settings_window: Option<WindowId>,
    settings_snapshot: Option<SettingsDocument>,
    help: Option<HelpPanel>,
    menu: Option<MenuSet>,
    display: DisplayModeController,
    timers: TimerQueue,
    reload: ModelReloadCoordinator,
    outcomes: ReloadOutcomes,
    quitting: bool,
}

impl<P: WindowPlatform> WindowOrchestrator<P> {
    pub fn new(ctx: &ShellContext, platform: P, backend: Arc<dyn ReloadBackend>) -> Self {
        let (reload, outcomes) = ModelReloadCoordinator::new(
            backend,
            ctx.settings.clone(),
            ctx.assets.clone(),
            &ctx.config.reload,
        );
        Self {
            platform,
            config: Arc::clone(&ctx.config),
            settings: ctx.settings.clone(),
            assets: ctx.assets.clone(),
            bus: ctx.bus.clone(),
            fan: FanParams::from(&ctx.config.window),
            windows: BTreeMap::new(),
            main: None,
            settings_window: None,
            settings_snapshot: None,
            help: None,
            menu: None,
            display: DisplayModeController::new(&ctx.config.timing),
            timers: TimerQueue::default(),
            reload,
            outcomes,
            quitting: false,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────

    #[must_use]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    #[must_use]
    pub fn settings_store(&self) -> &SettingsStore {
        &self.settings
    }

    #[must_use]
    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    #[must_use]
    pub fn window(&self, id: WindowId) -> Option<&WindowHandle> {
        self.windows.get(&id)
    }

    pub fn windows(&self) -> impl Iterator<Item = &WindowHandle> {
        self.windows.values()
    }

    #[must_use]
    pub fn main_window(&self) -> Option<&WindowHandle> {
        self.main.and_then(|id| self.windows.get(&id))
    }

    #[must_use]
    pub fn settings_window(&self) -> Option<WindowId> {
        self.settings_window
    }

    #[must_use]
    pub fn help_window(&self) -> Option<WindowId> {
        self.help.map(|h| h.id)
    }

    /// When the help panel closes itself.
    #[must_use]
    pub fn help_close_at(&self) -> Option<Instant> {
        self.help.map(|h| h.close_at)
    }

    #[must_use]
    pub fn display_mode(&self) -> DisplayMode {
        self.display.mode()
    }

    #[must_use]
    pub fn display(&self) -> &DisplayModeController {
        &self.display
    }

    #[must_use]
    pub fn reload_coordinator(&self) -> &ModelReloadCoordinator {
        &self.reload
    }

    #[must_use]
    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// Whether a settle-delayed reload is queued.
    #[must_use]
    pub fn reload_pending(&self) -> bool {
        self.timers.contains(&Deferred::ReloadSelectedModel)
    }

    #[must_use]
    pub fn state(&self) -> ShellState {
        ShellState {
            main: self.main_window().cloned(),
            display_mode: self.display.mode(),
            menu_visible: self.is_menu_visible(),
            menu: self
                .menu
                .as_ref()
                .map(|m| m.entries().to_vec())
                .unwrap_or_default(),
            settings_open: self.settings_window.is_some(),
            help_open: self.help.is_some(),
            quitting: self.quitting,
            windows: self.windows.values().cloned().collect(),
            reload: self.reload.current().map(|r| ReloadSummary {
                request_id: r.id,
                model_id: r.model_id,
                state: r.state,
            }),
        }
    }

    // ── Main window ───────────────────────────────────────────────

    /// Create the main window in the lower-right corner of the primary
    /// display. Returns the existing window if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Platform`] when no display is available or the
    /// window cannot be created.
    pub fn create_main(&mut self) -> Result<WindowHandle> {
        if let Some(handle) = self.main_window().filter(|h| !self.platform.is_destroyed(h.id)) {
            return Ok(handle.clone());
        }
        let work_area = self.work_area()?;
        let window = &self.config.window;
        let bounds = main_window_bounds(&work_area, window.width_divisor, f64::from(window.edge_margin));
        let spec = WindowSpec::new(WindowKind::Main, bounds).always_on_top().transparent();

        let handle = self.create_window(&spec).inspect_err(|e| {
            error!(error = %e, "failed to create main window");
        })?;
        self.main = Some(handle.id);
        self.display.reset();
        info!(window_id = %handle.id, size = bounds.width, "main window created");
        Ok(handle)
    }

    /// Destroy and recreate the main window in circle mode.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Platform`] if the new window cannot be created.
    pub fn restart_main(&mut self) -> Result<WindowHandle> {
        self.close_menu();
        if let Some(old) = self.main.take() {
            self.timers.cancel(|a| matches!(a, Deferred::Hide(id) if *id == old));
            self.destroy_window(old);
        }
        let handle = self.create_main()?;
        self.notify_all(&ShellEvent::WindowRestarted);
        info!(window_id = %handle.id, "main window restarted");
        Ok(handle)
    }

    /// Record a move or resize reported by the native side. Moving the main
    /// window re-places an open menu.
    pub fn window_moved(&mut self, id: WindowId, bounds: Bounds) {
        if !bounds.is_finite() {
            debug!(window_id = %id, "ignoring non-finite move");
            return;
        }
        let Some(handle) = self.windows.get_mut(&id) else {
            return;
        };
        handle.bounds = bounds;
        self.platform.observe_bounds(id, bounds);
        if Some(id) == self.main {
            self.relayout_menu();
        }
    }

    pub fn minimize(&mut self) {
        if let Some((id, _)) = self.live_main() {
            self.platform.minimize(id);
        }
    }

    /// Close a window on request. Returns `true` if it was closed.
    ///
    /// The main window stays open unless the shell is quitting. Closing any
    /// menu window closes the whole menu.
    pub fn close_window(&mut self, id: WindowId) -> bool {
        if Some(id) == self.main {
            if !self.quitting {
                debug!(window_id = %id, "main window stays resident");
                return false;
            }
            self.main = None;
            self.destroy_window(id);
            return true;
        }
        if Some(id) == self.settings_window {
            self.close_settings();
            return true;
        }
        if self.help.is_some_and(|h| h.id == id) {
            self.close_help();
            return true;
        }
        if self.menu.as_ref().is_some_and(|m| m.contains(id)) {
            self.close_menu();
            return true;
        }
        if self.windows.contains_key(&id) {
            self.destroy_window(id);
            return true;
        }
        false
    }

    // ── Display mode ──────────────────────────────────────────────

    /// Advance circle → square → fullscreen; leaving fullscreen restarts
    /// the main window.
    pub fn toggle_display_mode(&mut self) -> DisplayMode {
        let main = self.main;
        let outcome = self.display.toggle(&mut self.platform, main, Instant::now());
        match outcome {
            ToggleOutcome::Ignored => {}
            ToggleOutcome::Entered(mode) => {
                self.sync_handle(main);
                debug!(?mode, "display mode changed");
            }
            ToggleOutcome::RestartRequired => {
                if let Err(e) = self.restart_main() {
                    warn!(error = %e, "main window restart failed");
                }
            }
        }
        self.display.mode()
    }

    /// Flip native fullscreen without changing the display mode.
    pub fn toggle_fullscreen(&mut self) -> Option<bool> {
        let main = self.main;
        let fullscreen = self
            .display
            .toggle_fullscreen_only(&mut self.platform, main, Instant::now());
        self.sync_handle(main);
        fullscreen
    }

    // ── Settings window ───────────────────────────────────────────

    /// Open the settings editor, or return the open one.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Platform`] if the window cannot be created.
    pub fn create_settings(&mut self) -> Result<WindowHandle> {
        if let Some(handle) = self
            .settings_window
            .and_then(|id| self.windows.get(&id))
            .filter(|h| !self.platform.is_destroyed(h.id))
        {
            return Ok(handle.clone());
        }

        let work_area = self.work_area()?;
        self.settings_snapshot = Some(self.settings.load());
        self.notify_all(&ShellEvent::SettingsOpening);

        if let Some((main, _)) = self.live_main() {
            self.bus.to_window(main, ShellEvent::FadeOut);
            let due = Instant::now() + self.config.timing.fade();
            self.timers.schedule(due, Deferred::Hide(main));
        }

        let window = &self.config.window;
        let bounds = centered_in(
            &work_area,
            f64::from(window.settings_width),
            f64::from(window.settings_height),
        );
        let handle = self.create_window(&WindowSpec::new(WindowKind::Settings, bounds))?;
        self.settings_window = Some(handle.id);
        info!(window_id = %handle.id, "settings window opened");
        Ok(handle)
    }

    /// Force-close the settings editor. Returns the settings changes made
    /// while it was open; if there are any and a model is selected, a reload
    /// is scheduled after the settle delay.
    pub fn close_settings(&mut self) -> ChangeSet {
        let Some(id) = self.settings_window.take() else {
            return ChangeSet::default();
        };
        self.destroy_window(id);
        self.end_settings_session()
    }

    /// Diff against the snapshot, schedule a reload if needed and bring the
    /// main window back. The settings window is already gone.
    fn end_settings_session(&mut self) -> ChangeSet {
        let before = self.settings_snapshot.take().unwrap_or_default();
        let current = self.settings.load();
        let changes = SettingsStore::diff(&before, &current);
        for line in changes.report() {
            debug!(change = %line, "settings changed while editor was open");
        }

        if !changes.is_empty() && current.model().is_some() {
            let due = Instant::now() + self.config.timing.reload_settle();
            self.timers.cancel(|a| *a == Deferred::ReloadSelectedModel);
            self.timers.schedule(due, Deferred::ReloadSelectedModel);
            info!(changed = changes.len(), "settings changed; reload scheduled");
        }

        if let Some((main, _)) = self.live_main() {
            self.timers.cancel(|a| *a == Deferred::Hide(main));
            self.show_window(main);
            self.bus.to_window(main, ShellEvent::FadeIn);
        }
        self.notify_all(&ShellEvent::SettingsClosed);
        changes
    }

    /// Merge a partial document from the settings editor into the store.
    pub fn save_settings(&mut self, partial: &SettingsDocument) -> ChangeSet {
        self.settings.save(partial)
    }

    // ── Help panel ────────────────────────────────────────────────

    /// Open the help panel, or restart its auto-close timer when open.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Platform`] if the window cannot be created.
    pub fn toggle_help(&mut self) -> Result<WindowId> {
        let auto_close = self.config.timing.help_auto_close();
        if let Some(help) = self.help.as_mut().filter(|h| !self.platform.is_destroyed(h.id)) {
            help.close_at = Instant::now() + auto_close;
            debug!(window_id = %help.id, "help auto-close timer reset");
            return Ok(help.id);
        }
        self.create_help()
    }

    /// Open the help panel if it is not open.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Platform`] if the window cannot be created.
    pub fn create_help(&mut self) -> Result<WindowId> {
        if let Some(help) = self.help.filter(|h| !self.platform.is_destroyed(h.id)) {
            return Ok(help.id);
        }
        let work_area = self.work_area()?;
        let window = &self.config.window;
        let bounds = centered_in(&work_area, f64::from(window.help_width), f64::from(window.help_height));
        let handle = self.create_window(&WindowSpec::new(WindowKind::Help, bounds).always_on_top())?;
        self.help = Some(HelpPanel {
            id: handle.id,
            close_at: Instant::now() + self.config.timing.help_auto_close(),
        });
        Ok(handle.id)
    }

    pub fn close_help(&mut self) {
        if let Some(help) = self.help.take() {
            self.destroy_window(help.id);
        }
    }

    // ── Models and assets ─────────────────────────────────────────

    /// Start reloading `model_id` and put every window into the loading state.
    /// Returns the reload request id.
    pub fn select_model(&mut self, model_id: &str) -> u64 {
        self.notify_all(&ShellEvent::LoadingState(true));
        self.reload.reload(model_id)
    }

    /// Import a user-selected asset file. Failures raise a blocking notice.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Filesystem`] if the import fails.
    pub fn import_asset(&mut self, kind: AssetKind, source: &Path) -> Result<AssetEntry> {
        match self.assets.import(kind, source) {
            Ok(entry) => {
                if kind == AssetKind::Models {
                    let summaries = self.assets.model_summaries();
                    self.notify_all(&ShellEvent::ModelsUpdated(summaries));
                }
                Ok(entry)
            }
            Err(e) => {
                warn!(error = %e, "asset import failed");
                self.bus.to_shell(ShellEvent::ErrorNotice {
                    title: "Import failed".to_owned(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    // ── Shutdown ──────────────────────────────────────────────────

    /// Mark the shell as quitting and close every window.
    pub fn quit(&mut self) {
        self.quitting = true;
        self.menu = None;
        self.help = None;
        self.settings_window = None;
        self.settings_snapshot = None;
        self.main = None;
        self.timers = TimerQueue::default();
        let ids: Vec<WindowId> = self.windows.keys().copied().collect();
        for id in ids {
            self.destroy_window(id);
        }
        info!("shell quitting; all windows closed");
    }

    // ── Scheduler ─────────────────────────────────────────────────

    /// Advance deferred work. Called periodically from the control loop.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.prune_destroyed();

        for action in self.timers.take_due(now) {
            match action {
                Deferred::Destroy(id) => self.destroy_window(id),
                Deferred::Hide(id) => self.hide_window(id),
                Deferred::ReloadSelectedModel => match self.settings.load().model() {
                    Some(model) => {
                        let model = model.to_owned();
                        self.select_model(&model);
                    }
                    None => debug!("scheduled reload skipped: no model selected"),
                },
            }
        }

        if self.help.is_some_and(|h| now >= h.close_at) {
            debug!("help panel auto-closed");
            self.close_help();
        }

        let main = self.main;
        if self.display.tick(&mut self.platform, main, now) {
            self.notify_all(&ShellEvent::FullscreenEntered);
        }

        while let Ok(outcome) = self.outcomes.try_recv() {
            self.report_reload(outcome);
        }
    }

    fn report_reload(&mut self, outcome: ReloadOutcome) {
        if outcome.request_id != self.reload.latest_id() {
            debug!(request_id = outcome.request_id, "dropping stale reload outcome");
            return;
        }
        let character_name = self
            .assets
            .find(AssetKind::Models, &outcome.model_id)
            .map_or_else(|| display_name(&outcome.model_id), |entry| entry.name);
        self.notify_all(&ShellEvent::ModelReloadStatus {
            success: outcome.success(),
            character_name,
            error: outcome.error.clone(),
        });
        self.notify_all(&ShellEvent::LoadingState(false));

        if !outcome.success() {
            let title = match outcome.state {
                ReloadState::TimedOut => "Model reload timed out",
                _ => "Model reload failed",
            };
            self.bus.to_shell(ShellEvent::ErrorNotice {
                title: title.to_owned(),
                message: outcome
                    .error
                    .unwrap_or_else(|| format!("could not load '{}'", outcome.model_id)),
            });
        }
    }

    // ── Internals ─────────────────────────────────────────────────

    /// Send `event` to every live window.
    fn notify_all(&self, event: &ShellEvent) {
        for id in self.windows.keys() {
            if !self.platform.is_destroyed(*id) {
                self.bus.to_window(*id, event.clone());
            }
        }
    }

    fn work_area(&self) -> Result<Bounds> {
        self.platform
            .primary_work_area()
            .ok_or_else(|| ShellError::Platform("no display available".to_owned()))
    }

    fn live_main(&self) -> Option<(WindowId, Bounds)> {
        let id = self.main?;
        if self.platform.is_destroyed(id) {
            return None;
        }
        self.windows.get(&id).map(|h| (id, h.bounds))
    }

    fn create_window(&mut self, spec: &WindowSpec) -> Result<WindowHandle> {
        let id = self.platform.create(spec)?;
        let handle = WindowHandle {
            id,
            kind: spec.kind,
            bounds: spec.bounds,
            visible: spec.visible,
            always_on_top: spec.always_on_top,
        };
        self.windows.insert(id, handle.clone());
        debug!(window_id = %id, kind = spec.kind.as_str(), "window created");
        Ok(handle)
    }

    fn destroy_window(&mut self, id: WindowId) {
        self.windows.remove(&id);
        self.platform.destroy(id);
    }

    fn show_window(&mut self, id: WindowId) {
        self.platform.show(id);
        if let Some(h) = self.windows.get_mut(&id) {
            h.visible = true;
        }
    }

    fn hide_window(&mut self, id: WindowId) {
        self.platform.hide(id);
        if let Some(h) = self.windows.get_mut(&id) {
            h.visible = false;
        }
    }

    fn move_window(&mut self, id: WindowId, bounds: Bounds) {
        match self.platform.set_bounds(id, bounds) {
            Ok(()) => {
                if let Some(h) = self.windows.get_mut(&id) {
                    h.bounds = bounds;
                }
            }
            Err(e) => debug!(window_id = %id, error = %e, "window move skipped"),
        }
    }

    fn sync_handle(&mut self, id: Option<WindowId>) {
        let Some(id) = id else {
            return;
        };
        if let (Some(bounds), Some(handle)) = (self.platform.bounds(id), self.windows.get_mut(&id)) {
            handle.bounds = bounds;
        }
    }

    /// Forget windows the platform destroyed behind our back.
    fn prune_destroyed(&mut self) {
        let gone: Vec<WindowId> = self
            .windows
            .keys()
            .copied()
            .filter(|id| self.platform.is_destroyed(*id))
            .collect();
        for id in gone {
            debug!(window_id = %id, "window vanished");
            self.windows.remove(&id);
            if self.main == Some(id) {
                self.main = None;
            }
            if self.settings_window == Some(id) {
                self.settings_window = None;
                self.end_settings_session();
            }
            if self.help.is_some_and(|h| h.id == id) {
                self.help = None;
            }
            if self.menu.as_ref().is_some_and(|m| m.contains(id)) {
                self.close_menu();
            }
        }
    }
}
