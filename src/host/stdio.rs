//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages from stdin,
//! dispatches them through the `HostCommandServer` router, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages as newline-delimited
//! JSON to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use crate::bus::MessageBus;
use crate::error::{Result, ShellError};
use crate::host::channel::{
    HostCommandClient, ShellHandler, bus_event_envelope, command_channel_with_events,
};
use crate::host::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex, broadcast};

/// Default request channel capacity for the stdio bridge.
const REQUEST_CAPACITY: usize = 64;

/// Upper bound on flushing queued events after the reader stops.
const EVENT_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

type SharedWriter<W> = Arc<Mutex<BufWriter<W>>>;

/// Run the stdin/stdout JSON bridge until stdin closes or `app.quit` is
/// received.
pub async fn run_stdio_bridge<H: ShellHandler>(
    handler: H,
    event_tx: broadcast::Sender<EventEnvelope>,
    bus: &MessageBus,
    tick_interval: Duration,
) -> Result<()> {
    run_bridge(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        handler,
        event_tx,
        bus,
        tick_interval,
    )
    .await
}

/// Run the JSON bridge over any line reader and writer.
///
/// Four concurrent tasks operate in parallel:
///
/// 1. **Reader** -- reads newline-delimited JSON, dispatches each
///    `CommandEnvelope` through the host command client, and writes the
///    resulting `ResponseEnvelope`.
/// 2. **Event forwarder** -- writes broadcast `EventEnvelope` messages
///    (window commands and router events) as JSON lines.
/// 3. **Bus forwarder** -- re-publishes message bus traffic as events.
/// 4. **Server** -- runs the `HostCommandServer` router and tick loop.
///
/// The bridge exits when the reader finishes. Dropping the client causes the
/// server task to exit naturally.
pub async fn run_bridge<R, W, H>(
    reader: R,
    writer: W,
    handler: H,
    event_tx: broadcast::Sender<EventEnvelope>,
    bus: &MessageBus,
    tick_interval: Duration,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    H: ShellHandler,
{
    let mut event_rx = event_tx.subscribe();
    let bus_handle = spawn_bus_forwarder(bus, event_tx.clone());
    let (client, server) = command_channel_with_events(REQUEST_CAPACITY, event_tx, handler);
    let server = server.with_tick_interval(tick_interval);

    let writer = Arc::new(Mutex::new(BufWriter::new(writer)));

    let server_handle = tokio::spawn(async move {
        server.run().await;
    });

    let event_writer = Arc::clone(&writer);
    let mut event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event_envelope) => match serde_json::to_string(&event_envelope) {
                    Ok(json) => {
                        let mut w = event_writer.lock().await;
                        if let Err(e) = write_line(&mut w, &json).await {
                            tracing::warn!(
                                error = %e,
                                "failed to write event envelope; stopping event forwarder"
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize event envelope; skipping");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("event broadcast channel closed; stopping event forwarder");
                    break;
                }
            }
        }
    });

    let reader_result = run_reader(reader, client, Arc::clone(&writer)).await;

    // The reader dropped the client, so the server drains and exits. Once the
    // bus forwarder is gone too, every event sender is dropped and the event
    // forwarder ends after writing what is still queued.
    let _ = server_handle.await;
    bus_handle.abort();
    let _ = bus_handle.await;
    if tokio::time::timeout(EVENT_DRAIN_TIMEOUT, &mut event_handle)
        .await
        .is_err()
    {
        event_handle.abort();
        let _ = event_handle.await;
    }

    let mut w = writer.lock().await;
    let _ = w.flush().await;

    reader_result
}

fn spawn_bus_forwarder(
    bus: &MessageBus,
    event_tx: broadcast::Sender<EventEnvelope>,
) -> tokio::task::JoinHandle<()> {
    let mut bus_rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match bus_rx.recv().await {
                Ok(message) => {
                    let _ = event_tx.send(bus_event_envelope(&message));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "bus forwarder lagged; some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Read lines, dispatch each command, and write responses.
async fn run_reader<R, W>(mut reader: R, client: HostCommandClient, writer: SharedWriter<W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| ShellError::Channel(format!("failed to read from stdin: {e}")))?;

        if bytes_read == 0 {
            tracing::info!("stdin closed (EOF); shutting down bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, raw_line = %trimmed, "failed to parse command envelope");
                let error_response = ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                );
                write_response(&writer, &error_response).await?;
                continue;
            }
        };

        let is_quit = envelope.command == CommandName::AppQuit;
        let request_id = envelope.request_id.clone();

        let response = match client.send(envelope).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(error = %e, "host command dispatch failed");
                ResponseEnvelope::error(request_id, format!("dispatch failed: {e}"))
            }
        };
        write_response(&writer, &response).await?;

        if is_quit {
            tracing::info!("app.quit received; shutting down bridge");
            break;
        }
    }

    Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &SharedWriter<W>,
    response: &ResponseEnvelope,
) -> Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| ShellError::Channel(format!("failed to serialize response envelope: {e}")))?;
    let mut w = writer.lock().await;
    write_line(&mut w, &json).await
}

/// Write a single JSON line to the buffered writer and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut BufWriter<W>, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| ShellError::Channel(format!("failed to write to stdout: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| ShellError::Channel(format!("failed to write newline to stdout: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| ShellError::Channel(format!("failed to flush stdout: {e}")))?;
    Ok(())
}
