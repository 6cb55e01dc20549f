//! Host command channel and router for native shell integrations.
//!
//! The server owns the [`ShellHandler`] and interleaves command routing with
//! a periodic scheduler tick on one task, so handler state is never touched
//! concurrently.

use crate::assets::AssetKind;
use crate::bus::{BusMessage, BusTarget};
use crate::error::{Result, ShellError};
use crate::host::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
use crate::settings::SettingsDocument;
use crate::window::{Bounds, WindowId};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Default scheduler tick for the router loop.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(25);

/// Operations the native shell can trigger.
pub trait ShellHandler: Send + 'static {
    /// Record the display work area and create the main window.
    fn start(&mut self, work_area: Option<Bounds>) -> Result<serde_json::Value>;
    fn query_state(&self) -> Result<serde_json::Value>;
    fn toggle_menu(&mut self) -> Result<serde_json::Value>;
    fn select_menu(&mut self, window_id: WindowId) -> Result<serde_json::Value>;
    fn open_settings(&mut self) -> Result<serde_json::Value>;
    fn close_settings(&mut self) -> Result<serde_json::Value>;
    fn query_settings(&self, path: Option<&str>) -> Result<serde_json::Value>;
    fn save_settings(&mut self, partial: &SettingsDocument) -> Result<serde_json::Value>;
    fn toggle_display_mode(&mut self) -> Result<serde_json::Value>;
    fn toggle_fullscreen(&mut self) -> Result<serde_json::Value>;
    fn minimize(&mut self) -> Result<serde_json::Value>;
    /// A window was moved or resized natively. `None` means the main window.
    fn window_moved(&mut self, window_id: Option<WindowId>, bounds: Bounds) -> Result<serde_json::Value>;
    fn close_window(&mut self, window_id: WindowId) -> Result<serde_json::Value>;
    fn toggle_help(&mut self) -> Result<serde_json::Value>;
    fn select_model(&mut self, model_id: &str) -> Result<serde_json::Value>;
    fn query_models(&self) -> Result<serde_json::Value>;
    fn import_asset(&mut self, kind: AssetKind, path: &Path) -> Result<serde_json::Value>;
    fn quit(&mut self) -> Result<serde_json::Value>;
    /// Advance deferred work; called from the router loop.
    fn tick(&mut self) {}
}

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<Result<ResponseEnvelope>>,
}

#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl HostCommandClient {
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate().map_err(|e| {
            ShellError::Command(format!(
                "invalid host command envelope {}: {}",
                envelope.request_id, e
            ))
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| ShellError::Channel(format!("failed to send host command request: {e}")))?;

        response_rx
            .await
            .map_err(|e| ShellError::Channel(format!("host command response dropped: {e}")))?
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }
}

pub struct HostCommandServer<H: ShellHandler> {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
    handler: H,
    tick_interval: Duration,
}

#[must_use]
pub fn command_channel<H: ShellHandler>(
    request_capacity: usize,
    event_capacity: usize,
    handler: H,
) -> (HostCommandClient, HostCommandServer<H>) {
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    command_channel_with_events(request_capacity, event_tx, handler)
}

/// Create a command channel using an existing event broadcast sender.
///
/// The window platform and the command server then share one event stream
/// towards the native shell.
#[must_use]
pub fn command_channel_with_events<H: ShellHandler>(
    request_capacity: usize,
    event_tx: broadcast::Sender<EventEnvelope>,
    handler: H,
) -> (HostCommandClient, HostCommandServer<H>) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));

    (
        HostCommandClient {
            request_tx,
            event_tx: event_tx.clone(),
        },
        HostCommandServer {
            request_rx,
            event_tx,
            handler,
            tick_interval: DEFAULT_TICK_INTERVAL,
        },
    )
}

impl<H: ShellHandler> HostCommandServer<H> {
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Route commands and tick the handler until every client is dropped.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                request = self.request_rx.recv() => {
                    let Some(request) = request else {
                        break;
                    };
                    let request_id = request.envelope.request_id.clone();
                    let response = match self.route(&request.envelope) {
                        Ok(resp) => resp,
                        Err(e) => {
                            warn!(request_id = %request_id, error = %e, "host command failed");
                            ResponseEnvelope::error(request_id, e.to_string())
                        }
                    };
                    let _ = request.response_tx.send(Ok(response));
                }
                _ = ticker.tick() => self.handler.tick(),
            }
        }
        debug!("host command server stopped");
    }

    /// Route a command envelope to the appropriate handler.
    pub fn route(&mut self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let payload = &envelope.payload;
        let result = match envelope.command {
            CommandName::HostPing => Ok(serde_json::json!({"pong": true})),
            CommandName::HostVersion => Ok(serde_json::json!({
                "contract_version": crate::host::contract::EVENT_VERSION,
                "channel": "avatar_shell_v1",
                "version": env!("CARGO_PKG_VERSION"),
            })),
            CommandName::ShellStart => {
                let work_area = match payload.get("work_area") {
                    Some(value) if !value.is_null() => Some(parse_bounds(value, "shell.start")?),
                    _ => None,
                };
                self.handler.start(work_area)
            }
            CommandName::ShellState => self.handler.query_state(),
            CommandName::MenuToggle => self.handler.toggle_menu(),
            CommandName::MenuSelect => {
                let id = parse_window_id(payload, "menu.select")?;
                self.handler.select_menu(id)
            }
            CommandName::SettingsOpen => self.handler.open_settings(),
            CommandName::SettingsClose => self.handler.close_settings(),
            CommandName::SettingsGet => {
                let path = payload.get("path").and_then(serde_json::Value::as_str);
                self.handler.query_settings(path)
            }
            CommandName::SettingsSave => {
                let partial = parse_settings_partial(payload)?;
                self.handler.save_settings(&partial)
            }
            CommandName::DisplayToggleMode => self.handler.toggle_display_mode(),
            CommandName::DisplayToggleFullscreen => self.handler.toggle_fullscreen(),
            CommandName::WindowMinimize => self.handler.minimize(),
            CommandName::WindowMoved => {
                let id = parse_optional_window_id(payload, "window.moved")?;
                let bounds = parse_bounds(payload, "window.moved")?;
                self.handler.window_moved(id, bounds)
            }
            CommandName::WindowClose => {
                let id = parse_window_id(payload, "window.close")?;
                self.handler.close_window(id)
            }
            CommandName::HelpToggle => self.handler.toggle_help(),
            CommandName::ModelSelect => {
                let model_id = parse_non_empty_field(payload, "model_id", "model.select")?;
                self.handler.select_model(&model_id)
            }
            CommandName::ModelsList => self.handler.query_models(),
            CommandName::AssetsImport => {
                let (kind, path) = parse_import(payload)?;
                self.handler.import_asset(kind, &path)
            }
            CommandName::AppQuit => {
                let result = self.handler.quit();
                self.emit_event(
                    "app.quitting",
                    serde_json::json!({"request_id": envelope.request_id}),
                );
                result
            }
        }?;

        Ok(ResponseEnvelope::ok(envelope.request_id.clone(), result))
    }

    fn emit_event(&self, event: &str, payload: serde_json::Value) {
        let _ = self.event_tx.send(EventEnvelope::fresh(event, payload));
    }
}

/// Wire form of a bus message: the bus event name, with the target and the
/// event payload in the envelope payload.
#[must_use]
pub fn bus_event_envelope(message: &BusMessage) -> EventEnvelope {
    let target = match message.target {
        BusTarget::Window(id) => serde_json::json!({"window_id": id}),
        BusTarget::Shell => serde_json::json!("shell"),
    };
    EventEnvelope::fresh(
        message.event.name(),
        serde_json::json!({
            "target": target,
            "data": message.event.payload(),
        }),
    )
}

fn parse_non_empty_field(payload: &serde_json::Value, field: &str, command: &str) -> Result<String> {
    let Some(raw) = payload.get(field).and_then(serde_json::Value::as_str) else {
        return Err(ShellError::Command(format!(
            "{command} requires payload.{field}"
        )));
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ShellError::Command(format!(
            "{command} payload.{field} cannot be empty"
        )));
    }
    Ok(trimmed.to_owned())
}

fn parse_window_id(payload: &serde_json::Value, command: &str) -> Result<WindowId> {
    parse_optional_window_id(payload, command)?
        .ok_or_else(|| ShellError::Command(format!("{command} requires payload.window_id")))
}

fn parse_optional_window_id(payload: &serde_json::Value, command: &str) -> Result<Option<WindowId>> {
    match payload.get("window_id") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(|id| Some(WindowId(id))).ok_or_else(|| {
            ShellError::Command(format!(
                "{command} payload.window_id must be a non-negative integer"
            ))
        }),
    }
}

fn parse_bounds(value: &serde_json::Value, command: &str) -> Result<Bounds> {
    let field = |name: &str| -> Result<f64> {
        value
            .get(name)
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| ShellError::Command(format!("{command} requires numeric {name}")))
    };
    let bounds = Bounds::new(field("x")?, field("y")?, field("width")?, field("height")?);
    if bounds.width < 0.0 || bounds.height < 0.0 {
        return Err(ShellError::Command(format!(
            "{command} width and height must be non-negative"
        )));
    }
    Ok(bounds)
}

fn parse_settings_partial(payload: &serde_json::Value) -> Result<SettingsDocument> {
    let Some(partial) = payload.get("partial") else {
        return Err(ShellError::Command(
            "settings.save requires payload.partial".to_owned(),
        ));
    };
    SettingsDocument::from_value(partial.clone()).ok_or_else(|| {
        ShellError::Command("settings.save payload.partial must be an object".to_owned())
    })
}

fn parse_import(payload: &serde_json::Value) -> Result<(AssetKind, PathBuf)> {
    let raw_kind = parse_non_empty_field(payload, "kind", "assets.import")?;
    let kind = AssetKind::parse(&raw_kind).ok_or_else(|| {
        ShellError::Command(format!(
            "unsupported asset kind `{raw_kind}` (expected models/images/voices/prompts)"
        ))
    })?;
    let path = parse_non_empty_field(payload, "path", "assets.import")?;
    Ok((kind, PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::bus::ShellEvent;
    use crate::host::contract::{CommandEnvelope, CommandName};
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct TestHandler {
        calls: Arc<Mutex<Vec<String>>>,
        ticks: Arc<Mutex<usize>>,
    }

    impl TestHandler {
        fn record(&self, call: impl Into<String>) -> Result<serde_json::Value> {
            self.calls.lock().unwrap().push(call.into());
            Ok(serde_json::json!({"accepted": true}))
        }
    }

    impl ShellHandler for TestHandler {
        fn start(&mut self, work_area: Option<Bounds>) -> Result<serde_json::Value> {
            self.record(format!("start:{}", work_area.map_or(0.0, |b| b.width)))
        }
        fn query_state(&self) -> Result<serde_json::Value> {
            self.record("state")
        }
        fn toggle_menu(&mut self) -> Result<serde_json::Value> {
            self.record("menu")
        }
        fn select_menu(&mut self, window_id: WindowId) -> Result<serde_json::Value> {
            self.record(format!("select:{window_id}"))
        }
        fn open_settings(&mut self) -> Result<serde_json::Value> {
            self.record("settings.open")
        }
        fn close_settings(&mut self) -> Result<serde_json::Value> {
            self.record("settings.close")
        }
        fn query_settings(&self, path: Option<&str>) -> Result<serde_json::Value> {
            self.record(format!("settings.get:{}", path.unwrap_or("*")))
        }
        fn save_settings(&mut self, partial: &SettingsDocument) -> Result<serde_json::Value> {
            self.record(format!("settings.save:{}", partial.keys().count()))
        }
        fn toggle_display_mode(&mut self) -> Result<serde_json::Value> {
            self.record("display")
        }
        fn toggle_fullscreen(&mut self) -> Result<serde_json::Value> {
            self.record("fullscreen")
        }
        fn minimize(&mut self) -> Result<serde_json::Value> {
            self.record("minimize")
        }
        fn window_moved(&mut self, window_id: Option<WindowId>, bounds: Bounds) -> Result<serde_json::Value> {
            self.record(format!("moved:{:?}:{}", window_id.map(|w| w.0), bounds.x))
        }
        fn close_window(&mut self, window_id: WindowId) -> Result<serde_json::Value> {
            self.record(format!("close:{}", window_id.0))
        }
        fn toggle_help(&mut self) -> Result<serde_json::Value> {
            self.record("help")
        }
        fn select_model(&mut self, model_id: &str) -> Result<serde_json::Value> {
            self.record(format!("model:{model_id}"))
        }
        fn query_models(&self) -> Result<serde_json::Value> {
            self.record("models")
        }
        fn import_asset(&mut self, kind: AssetKind, path: &Path) -> Result<serde_json::Value> {
            self.record(format!("import:{}:{}", kind.dir_name(), path.display()))
        }
        fn quit(&mut self) -> Result<serde_json::Value> {
            self.record("quit")
        }
        fn tick(&mut self) {
            *self.ticks.lock().unwrap() += 1;
        }
    }

    fn make_server() -> (TestHandler, HostCommandServer<TestHandler>) {
        let handler = TestHandler::default();
        let (_client, server) = command_channel(8, 8, handler.clone());
        (handler, server)
    }

    fn make_envelope(command: CommandName, payload: serde_json::Value) -> CommandEnvelope {
        CommandEnvelope::new("test-req-1", command, payload)
    }

    fn last_call(handler: &TestHandler) -> String {
        handler.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }

    #[test]
    fn ping_and_version_need_no_handler() {
        let (handler, mut server) = make_server();
        let resp = server
            .route(&make_envelope(CommandName::HostPing, serde_json::json!({})))
            .unwrap();
        assert_eq!(resp.payload["pong"], true);

        let resp = server
            .route(&make_envelope(CommandName::HostVersion, serde_json::json!({})))
            .unwrap();
        assert_eq!(resp.payload["contract_version"], 1);
        assert!(handler.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn menu_select_parses_window_id() {
        let (handler, mut server) = make_server();
        let resp = server
            .route(&make_envelope(
                CommandName::MenuSelect,
                serde_json::json!({"window_id": 7}),
            ))
            .unwrap();
        assert!(resp.ok);
        assert_eq!(last_call(&handler), "select:w7");
    }

    #[test]
    fn menu_select_missing_window_id_returns_error() {
        let (_handler, mut server) = make_server();
        let result = server.route(&make_envelope(CommandName::MenuSelect, serde_json::json!({})));
        assert!(result.is_err());
    }

    #[test]
    fn window_moved_defaults_to_main_window() {
        let (handler, mut server) = make_server();
        server
            .route(&make_envelope(
                CommandName::WindowMoved,
                serde_json::json!({"x": 12.0, "y": 3, "width": 200, "height": 200}),
            ))
            .unwrap();
        assert_eq!(last_call(&handler), "moved:None:12");
    }

    #[test]
    fn window_moved_rejects_missing_coordinates() {
        let (_handler, mut server) = make_server();
        let result = server.route(&make_envelope(
            CommandName::WindowMoved,
            serde_json::json!({"x": 1, "y": 2}),
        ));
        assert!(matches!(result, Err(ShellError::Command(_))));
    }

    #[test]
    fn settings_save_requires_object_partial() {
        let (handler, mut server) = make_server();
        assert!(server
            .route(&make_envelope(
                CommandName::SettingsSave,
                serde_json::json!({"partial": [1, 2]}),
            ))
            .is_err());

        server
            .route(&make_envelope(
                CommandName::SettingsSave,
                serde_json::json!({"partial": {"model": "a", "voice": "v"}}),
            ))
            .unwrap();
        assert_eq!(last_call(&handler), "settings.save:2");
    }

    #[test]
    fn model_select_empty_id_returns_error() {
        let (_handler, mut server) = make_server();
        let result = server.route(&make_envelope(
            CommandName::ModelSelect,
            serde_json::json!({"model_id": "   "}),
        ));
        assert!(result.is_err());
    }

    #[test]
    fn assets_import_validates_kind() {
        let (handler, mut server) = make_server();
        assert!(server
            .route(&make_envelope(
                CommandName::AssetsImport,
                serde_json::json!({"kind": "sounds", "path": "/tmp/a.wav"}),
            ))
            .is_err());

        server
            .route(&make_envelope(
                CommandName::AssetsImport,
                serde_json::json!({"kind": "voice", "path": "/tmp/a.wav"}),
            ))
            .unwrap();
        assert_eq!(last_call(&handler), "import:voices:/tmp/a.wav");
    }

    #[test]
    fn shell_start_accepts_optional_work_area() {
        let (handler, mut server) = make_server();
        server
            .route(&make_envelope(CommandName::ShellStart, serde_json::json!({})))
            .unwrap();
        assert_eq!(last_call(&handler), "start:0");

        server
            .route(&make_envelope(
                CommandName::ShellStart,
                serde_json::json!({"work_area": {"x": 0, "y": 0, "width": 1920, "height": 1080}}),
            ))
            .unwrap();
        assert_eq!(last_call(&handler), "start:1920");
    }

    #[test]
    fn quit_emits_quitting_event() {
        let handler = TestHandler::default();
        let (client, mut server) = command_channel(8, 8, handler);
        let mut events = client.subscribe_events();
        server
            .route(&make_envelope(CommandName::AppQuit, serde_json::json!({})))
            .unwrap();
        let event = events.try_recv().unwrap();
        assert_eq!(event.event, "app.quitting");
        assert_eq!(event.payload["request_id"], "test-req-1");
    }

    #[test]
    fn bus_messages_map_to_event_envelopes() {
        let message = BusMessage {
            target: BusTarget::Window(WindowId(4)),
            event: ShellEvent::LoadingState(true),
        };
        let envelope = bus_event_envelope(&message);
        assert_eq!(envelope.event, "loading-state");
        assert_eq!(envelope.payload["target"]["window_id"], 4);
        assert_eq!(envelope.payload["data"], true);

        let notice = bus_event_envelope(&BusMessage {
            target: BusTarget::Shell,
            event: ShellEvent::ErrorNotice {
                title: "t".into(),
                message: "m".into(),
            },
        });
        assert_eq!(notice.payload["target"], "shell");
        assert_eq!(notice.payload["data"]["title"], "t");
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_ticks_handler_between_commands() {
        let handler = TestHandler::default();
        let ticks = Arc::clone(&handler.ticks);
        let (client, server) = command_channel(8, 8, handler);
        let server = server.with_tick_interval(Duration::from_millis(10));
        let task = tokio::spawn(server.run());

        tokio::time::sleep(Duration::from_millis(105)).await;
        let resp = client
            .send(make_envelope(CommandName::HostPing, serde_json::json!({})))
            .await
            .unwrap();
        assert!(resp.ok);
        assert!(*ticks.lock().unwrap() >= 10);

        drop(client);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn handler_errors_become_error_responses() {
        let (client, server) = command_channel(8, 8, TestHandler::default());
        let task = tokio::spawn(server.run());
        let resp = client
            .send(CommandEnvelope::new(
                "req-bad",
                CommandName::WindowClose,
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert!(!resp.ok);
        assert_eq!(resp.request_id, "req-bad");
        assert!(resp.error.unwrap().contains("window_id"));

        drop(client);
        task.await.unwrap();
    }
}
