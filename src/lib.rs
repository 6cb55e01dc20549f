//! Avatar shell: multi-window orchestration core for an always-on-top
//! avatar desktop shell.
//!
//! The crate owns window lifecycle and placement, a radial character menu,
//! display-mode switching, the shared settings document, and the model
//! reload workflow against an external inference backend.
//!
//! # Architecture
//!
//! - **Orchestrator**: [`orchestrator::WindowOrchestrator`] owns every window
//!   and runs all user triggers and deferred steps on one control loop
//! - **Platform**: [`window::WindowPlatform`] is the capability seam over the
//!   native windowing system
//! - **Settings**: [`settings::SettingsStore`] persists the JSON document and
//!   reports structural changes
//! - **Reload**: [`reload::ModelReloadCoordinator`] drives the HTTP
//!   reload/status protocol with timeout and error budget
//! - **Bus**: [`bus::MessageBus`] delivers typed events to windows and the shell
//! - **Host**: [`host`] exposes everything as a newline-delimited JSON bridge

pub mod assets;
pub mod bus;
pub mod config;
pub mod context;
pub mod display_mode;
pub mod error;
pub mod fan_layout;
pub mod host;
pub mod orchestrator;
pub mod reload;
pub mod settings;
pub mod shell_dirs;
pub mod window;

pub use bus::{BusMessage, BusTarget, MessageBus, ShellEvent};
pub use config::ShellConfig;
pub use context::ShellContext;
pub use display_mode::DisplayMode;
pub use error::{Result, ShellError};
pub use orchestrator::WindowOrchestrator;
pub use settings::{SettingsDocument, SettingsStore};
pub use window::{Bounds, WindowId, WindowKind, WindowPlatform};
