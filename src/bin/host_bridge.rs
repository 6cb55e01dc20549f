//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! The native shell drives the window core through this process: it writes
//! `CommandEnvelope` messages as newline-delimited JSON to stdin and reads
//! `ResponseEnvelope` and `EventEnvelope` messages (window commands and bus
//! events) from stdout.
//!
//! All tracing/diagnostic output goes to stderr and a daily log file so that
//! stdout remains a clean JSON protocol channel.

use avatar_shell::context::ShellContext;
use avatar_shell::host::BridgePlatform;
use avatar_shell::host::stdio::run_stdio_bridge;
use avatar_shell::orchestrator::WindowOrchestrator;
use avatar_shell::shell_dirs;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Event broadcast capacity shared by window commands and bus events.
const EVENT_CAPACITY: usize = 256;

// Reload tasks share this runtime with the router loop, so handler state and
// reload progress interleave on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let file_appender = tracing_appender::rolling::daily(shell_dirs::logs_dir(), "avatar-shell.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("avatar_shell=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "avatar-shell-host starting");

    let ctx = ShellContext::from_default_locations()
        .map_err(|e| anyhow::anyhow!("failed to prepare shell context: {e}"))?;
    let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
    let platform = BridgePlatform::new(event_tx.clone());
    let backend = Arc::new(ctx.reload_backend());
    let orchestrator = WindowOrchestrator::new(&ctx, platform, backend);

    run_stdio_bridge(orchestrator, event_tx, &ctx.bus, ctx.config.timing.tick_interval())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "avatar-shell-host exited with error");
            anyhow::anyhow!("avatar-shell-host failed: {e}")
        })?;

    tracing::info!("avatar-shell-host shut down cleanly");
    Ok(())
}
