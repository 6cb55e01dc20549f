//! Radial character menu: one satellite window per recent character plus an
//! options entry, created and torn down as a unit.

use crate::bus::ShellEvent;
use crate::error::Result;
use crate::fan_layout;
use crate::orchestrator::WindowOrchestrator;
use crate::orchestrator::timers::Deferred;
use crate::window::{Bounds, WindowId, WindowKind, WindowPlatform, WindowSpec};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What a satellite window stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MenuItem {
    Character { model_id: String, name: String },
    Options,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub window_id: WindowId,
    pub angle_index: usize,
    pub item: MenuItem,
}

/// Live menu windows in fan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MenuSet {
    entries: Vec<MenuEntry>,
}

impl MenuSet {
    #[must_use]
    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entry(&self, id: WindowId) -> Option<&MenuEntry> {
        self.entries.iter().find(|e| e.window_id == id)
    }

    #[must_use]
    pub fn contains(&self, id: WindowId) -> bool {
        self.entry(id).is_some()
    }
}

/// Result of clicking a menu window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MenuSelection {
    ReloadStarted { model_id: String, request_id: u64 },
    SettingsOpened { window_id: WindowId },
}

impl<P: WindowPlatform> WindowOrchestrator<P> {
    #[must_use]
    pub fn is_menu_visible(&self) -> bool {
        self.menu.is_some()
    }

    #[must_use]
    pub fn menu(&self) -> Option<&MenuSet> {
        self.menu.as_ref()
    }

    /// Open the menu if closed, close it if open. Returns the new visibility.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShellError::Platform`] if a menu window cannot be
    /// created; windows created so far are destroyed again.
    pub fn toggle_menu(&mut self) -> Result<bool> {
        if self.menu.is_some() {
            self.close_menu();
            return Ok(false);
        }
        self.open_menu()
    }

    /// Fade out and schedule destruction of every menu window.
    pub fn close_menu(&mut self) {
        let Some(menu) = self.menu.take() else {
            return;
        };
        let due = Instant::now() + self.config.timing.fade();
        for entry in menu.entries {
            self.bus.to_window(entry.window_id, ShellEvent::FadeOut);
            self.timers.schedule(due, Deferred::Destroy(entry.window_id));
        }
        debug!("menu closing");
    }

    fn open_menu(&mut self) -> Result<bool> {
        let Some((main_id, main_bounds)) = self.live_main() else {
            debug!("menu toggle ignored: no main window");
            return Ok(false);
        };
        let work_area = self.work_area()?;

        let mut items: Vec<MenuItem> = self
            .assets
            .recent_models(self.config.window.max_menu_characters)
            .into_iter()
            .map(|m| MenuItem::Character {
                model_id: m.id,
                name: m.name,
            })
            .collect();
        items.push(MenuItem::Options);

        let (cx, cy) = main_bounds.center();
        let placements = fan_layout::layout((cx, cy), &work_area, items.len(), &self.fan);
        let fallback = Bounds::centered_square(cx, cy, self.fan.satellite_size);

        let mut entries = Vec::with_capacity(items.len());
        for (item, placement) in items.into_iter().zip(placements) {
            let bounds = match placement.bounds.validated() {
                Ok(b) => b,
                Err(e) => {
                    debug!(index = placement.index, error = %e, "satellite starts at main center");
                    fallback
                }
            };
            let spec = WindowSpec::new(WindowKind::Menu, bounds)
                .always_on_top()
                .transparent()
                .hidden();
            match self.create_window(&spec) {
                Ok(handle) => entries.push(MenuEntry {
                    window_id: handle.id,
                    angle_index: placement.index,
                    item,
                }),
                Err(e) => {
                    warn!(error = %e, "menu window creation failed; discarding partial menu");
                    for created in entries {
                        self.destroy_window(created.window_id);
                    }
                    return Err(e);
                }
            }
        }

        // Reveal only once every satellite is in place.
        for entry in &entries {
            self.show_window(entry.window_id);
            self.bus.to_window(entry.window_id, ShellEvent::FadeIn);
        }
        info!(main = %main_id, windows = entries.len(), "menu opened");
        self.menu = Some(MenuSet { entries });
        Ok(true)
    }

    /// Re-place the menu around the main window. Satellites whose computed
    /// bounds are not finite keep their previous position.
    pub fn relayout_menu(&mut self) {
        let Some(menu) = self.menu.as_ref() else {
            return;
        };
        let Some((_, main_bounds)) = self.live_main() else {
            return;
        };
        let Some(work_area) = self.platform.primary_work_area() else {
            return;
        };

        let placements = fan_layout::layout(main_bounds.center(), &work_area, menu.len(), &self.fan);
        let moves: Vec<(WindowId, fan_layout::Placement)> = menu
            .entries
            .iter()
            .filter_map(|e| placements.get(e.angle_index).map(|p| (e.window_id, *p)))
            .collect();

        for (id, placement) in moves {
            match placement.bounds.validated() {
                Ok(bounds) => self.move_window(id, bounds),
                Err(e) => debug!(window_id = %id, error = %e, "skipping satellite update"),
            }
        }
    }

    /// Handle a click on a menu window.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShellError::Platform`] if the options entry cannot
    /// open the settings window.
    pub fn select_menu_entry(&mut self, id: WindowId) -> Result<Option<MenuSelection>> {
        let Some(item) = self
            .menu
            .as_ref()
            .and_then(|m| m.entry(id))
            .map(|e| e.item.clone())
        else {
            debug!(window_id = %id, "selection ignored: not a menu window");
            return Ok(None);
        };

        self.close_menu();
        match item {
            MenuItem::Character { model_id, .. } => {
                let request_id = self.select_model(&model_id);
                Ok(Some(MenuSelection::ReloadStarted {
                    model_id,
                    request_id,
                }))
            }
            MenuItem::Options => {
                let handle = self.create_settings()?;
                Ok(Some(MenuSelection::SettingsOpened {
                    window_id: handle.id,
                }))
            }
        }
    }
}
