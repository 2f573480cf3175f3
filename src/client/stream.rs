//! EventStreamClient: the push-channel reader.
//!
//! One thread owns one SSE connection at a time — the at-most-one-connection
//! guarantee is structural. On any transport error or server close the
//! thread sleeps a fixed delay and reconnects, forever; missed updates are
//! recovered by the pollers, never replayed here. Malformed payloads are
//! dropped with a diagnostic entry and never surface to the caller.

use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::core::errors::{IrdError, Result};
use crate::logger::{DiagnosticsEvent, DiagnosticsHandle};
use crate::model::StreamEvent;
use crate::sync::SyncMessage;

/// Granularity at which the reconnect sleep notices a shutdown request.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Incremental parser for the `text/event-stream` wire format.
///
/// Feeds one line at a time; yields the accumulated `data:` payload when a
/// blank dispatch line arrives. Comment lines (leading `:`) and the fields
/// we do not use (`event:`, `id:`, `retry:`) are skipped.
#[derive(Debug, Default)]
pub(crate) struct SseParser {
    data: String,
}

impl SseParser {
    pub(crate) fn feed(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.data));
        }
        if let Some(rest) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
        // ':' comments and other fields fall through untouched.
        None
    }
}

/// Handle for the reader thread; dropping it does not stop the reader.
pub struct StreamHandle {
    shutdown: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<()>>,
}

impl StreamHandle {
    /// Ask the reader to exit at the next stream item or reconnect boundary.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stop and wait for the reader thread.
    ///
    /// Joining may block until the server sends the next heartbeat or closes
    /// the connection, since a blocking read cannot be interrupted mid-wait.
    pub fn stop_and_join(mut self) {
        self.stop();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Configuration slice the reader needs.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Fully-resolved stream URL.
    pub url: String,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
}

/// Spawn the reader thread. `tx` is the sole dispatch target.
pub fn spawn(
    config: StreamConfig,
    tx: Sender<SyncMessage>,
    diagnostics: DiagnosticsHandle,
) -> Result<StreamHandle> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    let join = thread::Builder::new()
        .name("irdash-stream".to_string())
        .spawn(move || reader_thread_main(&config, &tx, &diagnostics, &flag))
        .map_err(|source| IrdError::Runtime {
            details: format!("failed to spawn stream reader: {source}"),
        })?;
    Ok(StreamHandle {
        shutdown,
        join: Some(join),
    })
}

fn reader_thread_main(
    config: &StreamConfig,
    tx: &Sender<SyncMessage>,
    diagnostics: &DiagnosticsHandle,
    shutdown: &AtomicBool,
) {
    // The blocking client defaults to a 30 s total-request timeout, which
    // would sever a healthy stream; the stream is long-lived by design.
    let client = match Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(None)
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            diagnostics.send(DiagnosticsEvent::StreamDisconnected {
                details: format!("http client build failed: {err}"),
            });
            return;
        }
    };

    while !shutdown.load(Ordering::Relaxed) {
        match open_stream(&client, &config.url) {
            Ok(response) => {
                diagnostics.send(DiagnosticsEvent::StreamConnected {
                    endpoint: config.url.clone(),
                });
                let receiver_alive = consume(response, tx, diagnostics, shutdown);
                if !receiver_alive {
                    return;
                }
                diagnostics.send(DiagnosticsEvent::StreamDisconnected {
                    details: "stream ended".to_string(),
                });
            }
            Err(IrdError::Unauthorized { .. }) => {
                let _ = tx.send(SyncMessage::SessionInvalid { source: "stream" });
                return;
            }
            Err(err) => {
                diagnostics.send(DiagnosticsEvent::StreamDisconnected {
                    details: err.to_string(),
                });
            }
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        diagnostics.send(DiagnosticsEvent::ReconnectScheduled {
            delay_ms: u64::try_from(config.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
        });
        interruptible_sleep(config.reconnect_delay, shutdown);
    }
}

fn open_stream(client: &Client, url: &str) -> Result<reqwest::blocking::Response> {
    let response = client
        .get(url)
        .header("Accept", "text/event-stream")
        .send()
        .map_err(|err| IrdError::Transport {
            endpoint: url.to_string(),
            details: err.to_string(),
        })?;
    if response.status() == StatusCode::UNAUTHORIZED {
        return Err(IrdError::Unauthorized {
            endpoint: url.to_string(),
        });
    }
    if !response.status().is_success() {
        return Err(IrdError::Transport {
            endpoint: url.to_string(),
            details: format!("unexpected status {}", response.status()),
        });
    }
    Ok(response)
}

/// Read the stream until it errors, closes, or shutdown is requested.
///
/// Returns `false` when the reconciler side of the bus is gone and the
/// reader should exit instead of reconnecting.
fn consume(
    response: reqwest::blocking::Response,
    tx: &Sender<SyncMessage>,
    diagnostics: &DiagnosticsHandle,
    shutdown: &AtomicBool,
) -> bool {
    let mut parser = SseParser::default();
    let reader = BufReader::new(response);
    for line in reader.lines() {
        if shutdown.load(Ordering::Relaxed) {
            return true;
        }
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                diagnostics.send(DiagnosticsEvent::StreamDisconnected {
                    details: format!("read error: {err}"),
                });
                return true;
            }
        };
        let Some(payload) = parser.feed(&line) else {
            continue;
        };
        match serde_json::from_str::<StreamEvent>(&payload) {
            Ok(StreamEvent::CommandUpdate { command }) => {
                if tx.send(SyncMessage::CommandUpdate(command)).is_err() {
                    return false;
                }
            }
            // Keepalive only — must never mutate state.
            Ok(StreamEvent::Heartbeat) => {}
            Err(err) => {
                diagnostics.send(DiagnosticsEvent::PayloadDropped {
                    details: format!("{err}: {payload}"),
                });
            }
        }
    }
    true
}

fn interruptible_sleep(total: Duration, shutdown: &AtomicBool) {
    let mut remaining = total;
    while !remaining.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let slice = remaining.min(SHUTDOWN_POLL);
        thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}
