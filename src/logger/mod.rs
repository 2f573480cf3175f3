//! Diagnostics log: append-only line-delimited JSON on a dedicated thread.
//!
//! Workers send [`DiagnosticsEvent`] via a bounded crossbeam channel with a
//! non-blocking `try_send()`, so the sync loop is never blocked by logging
//! back-pressure. Degradation chain: primary file → stderr with an
//! `[IRD-LOG]` prefix → silent discard. The client must never fail because
//! logging failed.

#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use chrono::{SecondsFormat, Utc};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use serde::Serialize;

use crate::core::errors::{IrdError, Result};

// ──────────────────── events ────────────────────

/// Everything the sync subsystem reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagnosticsEvent {
    SyncStarted {
        version: String,
        base_url: String,
    },
    SyncStopped {
        reason: String,
    },
    StreamConnected {
        endpoint: String,
    },
    StreamDisconnected {
        details: String,
    },
    ReconnectScheduled {
        delay_ms: u64,
    },
    /// A message on the push channel failed to decode and was dropped.
    PayloadDropped {
        details: String,
    },
    StatusApplied {
        id: i64,
        from: Option<String>,
        to: String,
    },
    /// Duplicate `{id, status}` pair skipped by the idempotency check.
    DuplicateSkipped {
        id: i64,
        status: String,
    },
    PollTickFailed {
        task: &'static str,
        code: String,
        message: String,
    },
    SessionInvalidated {
        source: String,
    },
    /// Sentinel requesting graceful shutdown of the logger thread.
    Shutdown,
}

#[derive(Debug, Serialize)]
struct LogLine<'a> {
    ts: String,
    #[serde(flatten)]
    event: &'a DiagnosticsEvent,
}

// ──────────────────── handle ────────────────────

/// Cheaply-cloneable, non-blocking handle for emitting diagnostics.
#[derive(Clone)]
pub struct DiagnosticsHandle {
    tx: Option<Sender<DiagnosticsEvent>>,
    dropped: Arc<AtomicU64>,
}

impl DiagnosticsHandle {
    /// Handle that discards every event (diagnostics disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            tx: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Send an event to the logger thread. Never blocks.
    ///
    /// A full channel drops the event and bumps the dropped counter; a
    /// disconnected channel is fine during shutdown.
    pub fn send(&self, event: DiagnosticsEvent) {
        if let Some(tx) = &self.tx
            && let Err(TrySendError::Full(_)) = tx.try_send(event)
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of events dropped due to back-pressure.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Request graceful shutdown of the logger thread.
    pub fn shutdown(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(DiagnosticsEvent::Shutdown);
        }
    }
}

// ──────────────────── writer thread ────────────────────

enum Sink {
    File(BufWriter<fs::File>),
    Stderr,
    Discard,
}

impl Sink {
    fn open(path: &PathBuf) -> Self {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self::File(BufWriter::new(file)),
            Err(err) => {
                eprintln!("[IRD-LOG] falling back to stderr: {err}");
                Self::Stderr
            }
        }
    }

    fn write_line(&mut self, line: &str) {
        match self {
            Self::File(writer) => {
                // One write_all per line so a tailing process never sees a
                // partially-interleaved entry.
                if writer.write_all(line.as_bytes()).is_err() || writer.flush().is_err() {
                    eprintln!("[IRD-LOG] write failed, degrading to stderr");
                    *self = Self::Stderr;
                    eprintln!("[IRD-LOG] {}", line.trim_end());
                }
            }
            Self::Stderr => eprintln!("[IRD-LOG] {}", line.trim_end()),
            Self::Discard => {}
        }
    }
}

/// Spawn the logger thread; returns the handle and the join handle.
pub fn spawn_diagnostics(
    path: PathBuf,
    channel_capacity: usize,
) -> Result<(DiagnosticsHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<DiagnosticsEvent>(channel_capacity.max(1));
    let join = thread::Builder::new()
        .name("irdash-log".to_string())
        .spawn(move || logger_thread_main(&rx, path))
        .map_err(|source| IrdError::Runtime {
            details: format!("failed to spawn logger thread: {source}"),
        })?;
    Ok((
        DiagnosticsHandle {
            tx: Some(tx),
            dropped: Arc::new(AtomicU64::new(0)),
        },
        join,
    ))
}

fn logger_thread_main(rx: &Receiver<DiagnosticsEvent>, path: PathBuf) {
    let mut sink = Sink::open(&path);
    while let Ok(event) = rx.recv() {
        if event == DiagnosticsEvent::Shutdown {
            break;
        }
        let line = LogLine {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event: &event,
        };
        match serde_json::to_string(&line) {
            Ok(mut serialized) => {
                serialized.push('\n');
                sink.write_line(&serialized);
            }
            Err(err) => eprintln!("[IRD-LOG] serialization failure: {err}"),
        }
    }
    if let Sink::File(writer) = &mut sink {
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_object_per_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sync.jsonl");
        let (handle, join) = spawn_diagnostics(path.clone(), 64).expect("spawn logger");

        handle.send(DiagnosticsEvent::StreamConnected {
            endpoint: "/api/events".to_string(),
        });
        handle.send(DiagnosticsEvent::ReconnectScheduled { delay_ms: 5_000 });
        handle.shutdown();
        join.join().expect("logger thread joins");

        let raw = fs::read_to_string(&path).expect("log file exists");
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).expect("valid json line");
            assert!(value.get("ts").is_some());
            assert!(value.get("event").is_some());
        }
    }

    #[test]
    fn disabled_handle_discards_quietly() {
        let handle = DiagnosticsHandle::disabled();
        handle.send(DiagnosticsEvent::SessionInvalidated {
            source: "stats".to_string(),
        });
        assert_eq!(handle.dropped_events(), 0);
        handle.shutdown();
    }

    #[test]
    fn event_serializes_with_snake_case_tag() {
        let event = DiagnosticsEvent::PayloadDropped {
            details: "bad json".to_string(),
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value.get("event").and_then(|v| v.as_str()), Some("payload_dropped"));
    }
}
