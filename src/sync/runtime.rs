//! SyncRuntime: wires transport workers, the bus, and the reconciler.
//!
//! Thread layout: one stream reader, one poller per cadence, one logger,
//! one frame scheduler pacing counter animations, and one reconciler that
//! exclusively owns the store and the view. The caller's thread only starts
//! and stops the assembly.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Sender, bounded};

use crate::client::{ApiClient, StreamConfig, StreamHandle, stream};
use crate::core::config::Config;
use crate::core::errors::{IrdError, Result};
use crate::logger::{DiagnosticsEvent, DiagnosticsHandle, spawn_diagnostics};
use crate::sync::SyncMessage;
use crate::sync::counter::{CounterAnimator, FrameScheduler};
use crate::sync::poller::{PollingRefresher, TickOutcome};
use crate::sync::reconciler::Reconciler;
use crate::view::DashboardView;

/// Capacity of the bus between transport workers and the reconciler.
const BUS_CAPACITY: usize = 256;

/// A running sync session. Dropping it without [`SyncRuntime::stop`] leaves
/// worker threads detached.
pub struct SyncRuntime<V: DashboardView + Send + 'static> {
    tx: Option<Sender<SyncMessage>>,
    stream: Option<StreamHandle>,
    pollers: Vec<PollingRefresher>,
    reconciler: Option<thread::JoinHandle<V>>,
    diagnostics: DiagnosticsHandle,
    logger: Option<thread::JoinHandle<()>>,
}

impl<V: DashboardView + Send + 'static> SyncRuntime<V> {
    /// Start a full sync session against the configured server.
    ///
    /// Performs the initial snapshot loads, then spawns the stream reader,
    /// the stats and device pollers, and the reconciler loop.
    pub fn start(config: &Config, view: V) -> Result<Self> {
        let api = ApiClient::new(config)?;

        let (diagnostics, logger) = if config.diagnostics.enabled {
            let (handle, join) = spawn_diagnostics(
                config.paths.jsonl_log.clone(),
                config.diagnostics.channel_capacity,
            )?;
            (handle, Some(join))
        } else {
            (DiagnosticsHandle::disabled(), None)
        };
        diagnostics.send(DiagnosticsEvent::SyncStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            base_url: config.server.base_url.clone(),
        });

        let (tx, rx) = bounded::<SyncMessage>(BUS_CAPACITY);

        initial_load(&api, &tx, &diagnostics);

        let animator =
            CounterAnimator::new(Duration::from_millis(config.timing.counter_animation_ms));
        // Counter frames are paced off-thread and come back over the bus, so
        // the reconciler never sleeps between frames.
        let frame_scheduler = FrameScheduler::spawn(tx.clone())?;
        let mut reconciler = Reconciler::new(view, Some(api.clone()), animator, diagnostics.clone())
            .with_frame_scheduler(frame_scheduler);
        let reconciler_join = thread::Builder::new()
            .name("irdash-reconcile".to_string())
            .spawn(move || {
                while let Ok(message) = rx.recv() {
                    if !reconciler.apply(message) {
                        break;
                    }
                }
                reconciler.into_view()
            })
            .map_err(|source| IrdError::Runtime {
                details: format!("failed to spawn reconciler: {source}"),
            })?;

        let stream_handle = stream::spawn(
            StreamConfig {
                url: format!("{}{}", config.server.base_url, config.server.events_path),
                reconnect_delay: Duration::from_millis(config.timing.reconnect_delay_ms),
            },
            tx.clone(),
            diagnostics.clone(),
        )?;

        let pollers = vec![
            spawn_stats_poller(
                &api,
                &tx,
                &diagnostics,
                Duration::from_millis(config.timing.stats_poll_interval_ms),
            )?,
            spawn_device_poller(
                &api,
                &tx,
                &diagnostics,
                Duration::from_millis(config.timing.device_poll_interval_ms),
            )?,
        ];

        Ok(Self {
            tx: Some(tx),
            stream: Some(stream_handle),
            pollers,
            reconciler: Some(reconciler_join),
            diagnostics,
            logger,
        })
    }

    /// Whether the reconciler loop is still running. Turns `false` after a
    /// session invalidation even before `stop` is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.reconciler.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Handle for emitting diagnostics alongside the runtime's own events.
    #[must_use]
    pub fn diagnostics(&self) -> DiagnosticsHandle {
        self.diagnostics.clone()
    }

    /// Stop every worker and return the view.
    ///
    /// The stream reader is signalled but not joined: it may be parked in a
    /// blocking read until the server's next heartbeat, and it exits on its
    /// own once it notices either the flag or the closed bus.
    pub fn stop(mut self, reason: &str) -> V {
        if let Some(stream_handle) = self.stream.take() {
            stream_handle.stop();
        }
        for poller in self.pollers.drain(..) {
            poller.stop();
        }
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(SyncMessage::Shutdown);
        }
        // A panicked reconciler is re-raised here rather than swallowed.
        let view = match self.reconciler.take() {
            Some(join) => match join.join() {
                Ok(view) => view,
                Err(payload) => std::panic::resume_unwind(payload),
            },
            None => unreachable!("stop() consumes self; the handle is present"),
        };

        self.diagnostics.send(DiagnosticsEvent::SyncStopped {
            reason: reason.to_string(),
        });
        self.diagnostics.shutdown();
        if let Some(logger) = self.logger.take() {
            let _ = logger.join();
        }
        view
    }
}

/// Fetch the four initial snapshots and feed them through the bus so they
/// take the same path as every later update.
fn initial_load(api: &ApiClient, tx: &Sender<SyncMessage>, diagnostics: &DiagnosticsHandle) {
    if !forward("commands", tx, diagnostics, api.commands().map(SyncMessage::CommandList)) {
        return;
    }
    if !forward(
        "activity",
        tx,
        diagnostics,
        api.activity().map(SyncMessage::ActivitySnapshot),
    ) {
        return;
    }
    if !forward("stats", tx, diagnostics, api.stats().map(SyncMessage::StatsSnapshot)) {
        return;
    }
    let _ = forward(
        "devices",
        tx,
        diagnostics,
        api.redrat_devices().map(SyncMessage::DeviceSnapshot),
    );
}

/// Forward one fetched snapshot onto the bus, classifying failures the same
/// way a poll tick does. Returns `false` when the session is over.
fn forward(
    task: &'static str,
    tx: &Sender<SyncMessage>,
    diagnostics: &DiagnosticsHandle,
    result: Result<SyncMessage>,
) -> bool {
    match result {
        Ok(message) => {
            let _ = tx.send(message);
            true
        }
        Err(err) if err.is_session_invalid() => {
            let _ = tx.send(SyncMessage::SessionInvalid { source: task });
            false
        }
        Err(err) => {
            diagnostics.send(DiagnosticsEvent::PollTickFailed {
                task,
                code: err.code().to_string(),
                message: err.to_string(),
            });
            true
        }
    }
}

fn spawn_stats_poller(
    api: &ApiClient,
    tx: &Sender<SyncMessage>,
    diagnostics: &DiagnosticsHandle,
    interval: Duration,
) -> Result<PollingRefresher> {
    let api = api.clone();
    let tx = tx.clone();
    let diagnostics = diagnostics.clone();
    PollingRefresher::start("stats", interval, move || {
        poll_once("stats", &tx, &diagnostics, || {
            api.stats().map(SyncMessage::StatsSnapshot)
        })
    })
}

fn spawn_device_poller(
    api: &ApiClient,
    tx: &Sender<SyncMessage>,
    diagnostics: &DiagnosticsHandle,
    interval: Duration,
) -> Result<PollingRefresher> {
    let api = api.clone();
    let tx = tx.clone();
    let diagnostics = diagnostics.clone();
    PollingRefresher::start("devices", interval, move || {
        poll_once("devices", &tx, &diagnostics, || {
            api.redrat_devices().map(SyncMessage::DeviceSnapshot)
        })
    })
}

/// One poll tick: fetch, forward, classify failures.
///
/// A failed tick never tears the session down unless the failure is a 401;
/// transport blips are logged and retried on the next tick.
fn poll_once<F>(
    task: &'static str,
    tx: &Sender<SyncMessage>,
    diagnostics: &DiagnosticsHandle,
    fetch: F,
) -> TickOutcome
where
    F: Fn() -> Result<SyncMessage>,
{
    match fetch() {
        Ok(message) => {
            if tx.send(message).is_err() {
                return TickOutcome::Stop;
            }
            TickOutcome::Continue
        }
        Err(err) if err.is_session_invalid() => {
            let _ = tx.send(SyncMessage::SessionInvalid { source: task });
            TickOutcome::Stop
        }
        Err(err) => {
            diagnostics.send(DiagnosticsEvent::PollTickFailed {
                task,
                code: err.code().to_string(),
                message: err.to_string(),
            });
            TickOutcome::Continue
        }
    }
}
