//! Host bridge tests: JSON lines in, responses and events out, with the real
//! orchestrator behind the router.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use avatar_shell::assets::AssetRegistry;
use avatar_shell::bus::MessageBus;
use avatar_shell::config::ShellConfig;
use avatar_shell::context::ShellContext;
use avatar_shell::host::BridgePlatform;
use avatar_shell::host::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
use avatar_shell::host::platform::command_op;
use avatar_shell::host::stdio::run_bridge;
use avatar_shell::orchestrator::WindowOrchestrator;
use avatar_shell::reload::{ReloadBackend, ReloadPayload};
use avatar_shell::settings::SettingsStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

struct IdleBackend;

#[async_trait]
impl ReloadBackend for IdleBackend {
    async fn request_reload(&self, _payload: &ReloadPayload) -> avatar_shell::Result<()> {
        Ok(())
    }

    async fn is_reloading(&self) -> avatar_shell::Result<bool> {
        Ok(false)
    }
}

struct Bridge {
    _dir: TempDir,
    input: DuplexStream,
    output: Lines<BufReader<DuplexStream>>,
    events: Vec<EventEnvelope>,
    task: JoinHandle<avatar_shell::Result<()>>,
}

impl Bridge {
    fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ShellContext::new(
            ShellConfig::default(),
            SettingsStore::new(dir.path().join("settings.json")),
            AssetRegistry::new(dir.path().join("assets")),
            MessageBus::default(),
        );
        let (event_tx, _) = broadcast::channel(256);
        let orchestrator = WindowOrchestrator::new(
            &ctx,
            BridgePlatform::new(event_tx.clone()),
            Arc::new(IdleBackend),
        );

        let (input, bridge_in) = tokio::io::duplex(64 * 1024);
        let (bridge_out, output) = tokio::io::duplex(1024 * 1024);
        let bus = ctx.bus.clone();
        let task = tokio::spawn(async move {
            run_bridge(
                BufReader::new(bridge_in),
                bridge_out,
                orchestrator,
                event_tx,
                &bus,
                Duration::from_millis(5),
            )
            .await
        });

        Self {
            _dir: dir,
            input,
            output: BufReader::new(output).lines(),
            events: Vec::new(),
            task,
        }
    }

    async fn send_raw(&mut self, line: &str) {
        self.input.write_all(line.as_bytes()).await.unwrap();
        self.input.write_all(b"\n").await.unwrap();
    }

    async fn call(&mut self, id: &str, command: CommandName, payload: serde_json::Value) -> ResponseEnvelope {
        let envelope = CommandEnvelope::new(id, command, payload);
        self.send_raw(&serde_json::to_string(&envelope).unwrap()).await;
        self.response(id).await
    }

    /// Read lines until the response for `id`, keeping events seen on the way.
    async fn response(&mut self, id: &str) -> ResponseEnvelope {
        loop {
            let line = tokio::time::timeout(Duration::from_secs(5), self.output.next_line())
                .await
                .expect("bridge output within 5s")
                .unwrap()
                .expect("bridge output open");
            let value: serde_json::Value = serde_json::from_str(&line).unwrap();
            if value.get("event_id").is_some() {
                self.events.push(serde_json::from_value(value).unwrap());
                continue;
            }
            let response: ResponseEnvelope = serde_json::from_value(value).unwrap();
            if response.request_id == id {
                return response;
            }
        }
    }

    /// Wait for the bridge to stop and collect every remaining event.
    async fn finish(mut self) -> Vec<EventEnvelope> {
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("bridge stops within 5s")
            .unwrap()
            .unwrap();
        while let Ok(Some(line)) = self.output.next_line().await {
            if let Ok(event) = serde_json::from_str::<EventEnvelope>(&line) {
                self.events.push(event);
            }
        }
        self.events
    }
}

fn work_area() -> serde_json::Value {
    json!({"work_area": {"x": 0, "y": 0, "width": 1920, "height": 1080}})
}

#[tokio::test]
async fn ping_answers_without_a_display() {
    let mut bridge = Bridge::start();
    let resp = bridge.call("r1", CommandName::HostPing, json!({})).await;
    assert!(resp.ok);
    assert_eq!(resp.payload["pong"], true);

    let resp = bridge.call("r2", CommandName::ShellStart, json!({})).await;
    assert!(!resp.ok);
    assert!(resp.error.unwrap().contains("no display"));

    drop(bridge.input);
    tokio::time::timeout(Duration::from_secs(5), bridge.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn start_creates_main_window_and_mirrors_it() {
    let mut bridge = Bridge::start();
    let resp = bridge.call("start", CommandName::ShellStart, work_area()).await;
    assert!(resp.ok, "{:?}", resp.error);
    assert_eq!(resp.payload["kind"], "main");
    assert_eq!(resp.payload["bounds"]["x"], 1583.0);
    assert_eq!(resp.payload["bounds"]["width"], 287.0);
    let main_id = resp.payload["id"].as_u64().unwrap();

    let resp = bridge
        .call("close", CommandName::WindowClose, json!({"window_id": main_id}))
        .await;
    assert_eq!(resp.payload["closed"], false);

    let resp = bridge.call("quit", CommandName::AppQuit, json!({})).await;
    assert_eq!(resp.payload["quitting"], true);

    let events = bridge.finish().await;
    let ops: Vec<&str> = events.iter().filter_map(command_op).collect();
    assert_eq!(ops.first(), Some(&"create"));
    assert!(ops.contains(&"destroy"));
    assert!(events.iter().any(|e| e.event == "app.quitting"));
}

#[tokio::test]
async fn menu_toggle_reports_state_and_forwards_bus_events() {
    let mut bridge = Bridge::start();
    bridge.call("start", CommandName::ShellStart, work_area()).await;

    let resp = bridge.call("menu", CommandName::MenuToggle, json!({})).await;
    assert_eq!(resp.payload["visible"], true);

    let state = bridge.call("state", CommandName::ShellState, json!({})).await;
    assert_eq!(state.payload["menu_visible"], true);
    assert_eq!(state.payload["display_mode"], "circle");
    let menu = state.payload["menu"].as_array().unwrap();
    assert_eq!(menu.len(), 1);
    assert_eq!(menu[0]["item"]["type"], "options");

    bridge.call("quit", CommandName::AppQuit, json!({})).await;
    let events = bridge.finish().await;
    let fade_in = events
        .iter()
        .find(|e| e.event == "fade-in")
        .expect("fade-in forwarded from the bus");
    assert_eq!(fade_in.payload["target"]["window_id"], menu[0]["window_id"]);
}

#[tokio::test]
async fn settings_round_trip_redacts_secrets() {
    let mut bridge = Bridge::start();
    let resp = bridge
        .call(
            "save",
            CommandName::SettingsSave,
            json!({"partial": {"apiKeys": {"openai": "sk-secret"}, "server": {"port": 5002}}}),
        )
        .await;
    assert!(resp.ok);
    assert_eq!(resp.payload["changed"], true);
    let report = resp.payload["changes"].to_string();
    assert!(!report.contains("sk-secret"));

    let resp = bridge.call("get", CommandName::SettingsGet, json!({})).await;
    assert_eq!(resp.payload["apiKeys"]["openai"], "[REDACTED]");
    assert_eq!(resp.payload["server"]["port"], 5002);

    let resp = bridge
        .call("get-port", CommandName::SettingsGet, json!({"path": "server.port"}))
        .await;
    assert_eq!(resp.payload["value"], 5002);

    let resp = bridge
        .call(
            "again",
            CommandName::SettingsSave,
            json!({"partial": {"server": {"port": 5002}}}),
        )
        .await;
    assert_eq!(resp.payload["changed"], false);
}

#[tokio::test]
async fn malformed_input_gets_error_responses() {
    let mut bridge = Bridge::start();

    bridge.send_raw("this is not json").await;
    let resp = bridge.response("parse-error").await;
    assert!(!resp.ok);

    let resp = bridge.call("sel", CommandName::MenuSelect, json!({})).await;
    assert!(!resp.ok);
    assert!(resp.error.unwrap().contains("window_id"));

    let resp = bridge
        .call("imp", CommandName::AssetsImport, json!({"kind": "fonts", "path": "/x"}))
        .await;
    assert!(!resp.ok);

    let resp = bridge.call("list", CommandName::ModelsList, json!({})).await;
    assert!(resp.ok);
    assert_eq!(resp.payload["models"], json!([]));
}
