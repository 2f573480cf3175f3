//! Reconciler: sole consumer of the sync bus, sole writer of the store.
//!
//! Every message is applied atomically with respect to the others because
//! one thread runs this code; the interleaving of push and poll sources is
//! decided at the channel, and the idempotency check in the store makes the
//! push/poll race on one id harmless.

use std::collections::HashMap;

use crate::client::ApiClient;
use crate::core::errors::IrdError;
use crate::logger::{DiagnosticsEvent, DiagnosticsHandle};
use crate::model::{AggregateStats, CommandRecord, DeviceRecord};
use crate::store::{ApplyOutcome, EntityStore};
use crate::sync::SyncMessage;
use crate::sync::aggregate;
use crate::sync::counter::{CounterAnimator, FrameScheduler, plan_frames};
use crate::view::{CounterKind, DashboardView};

/// Applies bus messages to the store and fans the results out to a view.
pub struct Reconciler<V: DashboardView> {
    store: EntityStore,
    view: V,
    /// REST client for coarse refreshes after a status change. `None` in
    /// unit tests and for callers that drive every snapshot themselves.
    api: Option<ApiClient>,
    animator: CounterAnimator,
    /// Pacing thread for counter frames. Without one, frames are applied
    /// inline and unpaced; either way, `apply` never sleeps.
    scheduler: Option<FrameScheduler>,
    /// Current animation epoch per counter; frames carrying an older epoch
    /// belong to a superseded animation and are dropped.
    epochs: HashMap<CounterKind, u64>,
    next_epoch: u64,
    diagnostics: DiagnosticsHandle,
    displayed_stats: AggregateStats,
    session_ended: bool,
}

impl<V: DashboardView> Reconciler<V> {
    pub fn new(
        view: V,
        api: Option<ApiClient>,
        animator: CounterAnimator,
        diagnostics: DiagnosticsHandle,
    ) -> Self {
        Self {
            store: EntityStore::new(),
            view,
            api,
            animator,
            scheduler: None,
            epochs: HashMap::new(),
            next_epoch: 0,
            diagnostics,
            displayed_stats: AggregateStats::default(),
            session_ended: false,
        }
    }

    /// Attach a pacing thread; its frames come back as
    /// [`SyncMessage::CounterFrame`] on the same bus.
    #[must_use]
    pub fn with_frame_scheduler(mut self, scheduler: FrameScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Apply one bus message. Returns `false` once the session is over and
    /// the caller's receive loop should exit.
    pub fn apply(&mut self, message: SyncMessage) -> bool {
        if self.session_ended {
            return false;
        }
        match message {
            SyncMessage::CommandUpdate(record) => self.apply_command_update(record),
            SyncMessage::CommandList(records) => {
                self.store.replace_commands(records.clone());
                self.view.reload_commands(&records);
            }
            SyncMessage::StatsSnapshot(stats) => self.animate_counters(stats),
            SyncMessage::DeviceSnapshot(devices) => self.apply_device_snapshot(devices),
            SyncMessage::ActivitySnapshot(entries) => self.view.reload_activity(&entries),
            SyncMessage::CounterFrame {
                counter,
                value,
                epoch,
            } => self.apply_counter_frame(counter, value, epoch),
            SyncMessage::SessionInvalid { source } => {
                self.end_session(source);
                return false;
            }
            SyncMessage::Shutdown => return false,
        }
        !self.session_ended
    }

    fn apply_command_update(&mut self, record: CommandRecord) {
        let id = record.id;
        let status = record.status;
        let outcome = self.store.apply_command(record);
        match outcome {
            // Idempotent duplicate: zero side effects, by contract.
            ApplyOutcome::Unchanged => {
                self.diagnostics.send(DiagnosticsEvent::DuplicateSkipped {
                    id,
                    status: status.to_string(),
                });
            }
            ApplyOutcome::Inserted | ApplyOutcome::Updated { .. } => {
                let from = match outcome {
                    ApplyOutcome::Updated { previous } => Some(previous.to_string()),
                    _ => None,
                };
                self.diagnostics.send(DiagnosticsEvent::StatusApplied {
                    id,
                    from,
                    to: status.to_string(),
                });
                let rendered = self.view.update_command_status(id, status);
                if !rendered {
                    self.refetch_commands();
                }
                // A transition may change aggregate counters and the feed;
                // refresh coarsely rather than tracking deltas locally.
                self.refetch_activity();
                self.refetch_stats();
            }
        }
    }

    fn apply_device_snapshot(&mut self, devices: Vec<DeviceRecord>) {
        let indicator = aggregate::aggregate(&devices);
        self.store.replace_devices(devices);
        self.view.set_fleet_indicator(indicator);
    }

    fn animate_counters(&mut self, stats: AggregateStats) {
        let previous = self.displayed_stats;
        self.displayed_stats = stats;
        let pairs = [
            (CounterKind::Remotes, previous.remotes, stats.remotes),
            (CounterKind::Commands, previous.commands, stats.commands),
            (CounterKind::Sequences, previous.sequences, stats.sequences),
            (CounterKind::Schedules, previous.schedules, stats.schedules),
        ];
        for (kind, from, to) in pairs {
            self.animate_counter(kind, from, to);
        }
        // Absent means the server build has no RedRat support; keep whatever
        // the header currently shows.
        if let Some(to) = stats.redrat_devices {
            let from = previous.redrat_devices.unwrap_or(0);
            self.animate_counter(CounterKind::RedratDevices, from, to);
        } else {
            self.displayed_stats.redrat_devices = previous.redrat_devices;
        }
    }

    /// Start one counter animation. Never sleeps: paced frames go through
    /// the scheduler thread, unpaced ones are applied directly.
    fn animate_counter(&mut self, counter: CounterKind, from: i64, to: i64) {
        let frames = plan_frames(from, to);
        if frames.is_empty() {
            return;
        }
        self.next_epoch += 1;
        self.epochs.insert(counter, self.next_epoch);
        match &self.scheduler {
            Some(scheduler) => {
                let step_delay = self.animator.step_delay(frames.len());
                scheduler.schedule(counter, frames, step_delay, self.next_epoch);
            }
            None => {
                for value in frames {
                    self.view.set_counter(counter, value);
                }
            }
        }
    }

    fn apply_counter_frame(&mut self, counter: CounterKind, value: i64, epoch: u64) {
        if self.epochs.get(&counter) == Some(&epoch) {
            self.view.set_counter(counter, value);
        }
    }

    // ──────────────────── coarse refreshes ────────────────────

    fn refetch_commands(&mut self) {
        let Some(api) = self.api.clone() else { return };
        match api.commands() {
            Ok(records) => {
                self.store.replace_commands(records.clone());
                self.view.reload_commands(&records);
            }
            Err(err) => self.handle_refresh_error("commands", &err),
        }
    }

    fn refetch_activity(&mut self) {
        let Some(api) = self.api.clone() else { return };
        match api.activity() {
            Ok(entries) => self.view.reload_activity(&entries),
            Err(err) => self.handle_refresh_error("activity", &err),
        }
    }

    fn refetch_stats(&mut self) {
        let Some(api) = self.api.clone() else { return };
        match api.stats() {
            Ok(stats) => self.animate_counters(stats),
            Err(err) => self.handle_refresh_error("stats", &err),
        }
    }

    fn handle_refresh_error(&mut self, task: &'static str, err: &IrdError) {
        if err.is_session_invalid() {
            self.end_session(task);
            return;
        }
        self.diagnostics.send(DiagnosticsEvent::PollTickFailed {
            task,
            code: err.code().to_string(),
            message: err.to_string(),
        });
        if let IrdError::Api { .. } = err {
            self.view.notify_error(&err.to_string());
        }
        // Transport and decode failures stay silent toward the operator;
        // the next tick or stream event will try again.
    }

    fn end_session(&mut self, source: &'static str) {
        if self.session_ended {
            return;
        }
        self.session_ended = true;
        self.diagnostics.send(DiagnosticsEvent::SessionInvalidated {
            source: source.to_string(),
        });
        self.view.redirect_to_login();
    }

    /// Consume the reconciler and hand the view back (used by tests and by
    /// the runtime when the loop exits).
    pub fn into_view(self) -> V {
        self.view
    }

    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }
}
