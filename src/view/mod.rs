//! Render seam: the surfaces the reconciler fans out to.
//!
//! Views hold derived, disposable copies of store state and never mutate a
//! record directly. Implementations: the console view in the CLI, and the
//! recording view used by the test suites.

use crate::model::{ActivityEntry, CommandRecord, CommandStatus};
use crate::sync::aggregate::FleetIndicator;

/// The aggregate counters shown on the dashboard header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    Remotes,
    Commands,
    Sequences,
    Schedules,
    RedratDevices,
}

impl CounterKind {
    /// All counters, in display order.
    pub const ALL: [Self; 5] = [
        Self::Remotes,
        Self::Commands,
        Self::Sequences,
        Self::Schedules,
        Self::RedratDevices,
    ];

    /// Stable label used by console output and diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Remotes => "remotes",
            Self::Commands => "commands",
            Self::Sequences => "sequences",
            Self::Schedules => "schedules",
            Self::RedratDevices => "redrat_devices",
        }
    }
}

/// Everything the reconciler can do to a render target.
pub trait DashboardView {
    /// Update the status badge of a rendered command row in place.
    ///
    /// Returns `false` when the record is not currently rendered; the update
    /// is still stored and becomes visible on the next full list reload.
    fn update_command_status(&mut self, id: i64, status: CommandStatus) -> bool;

    /// Replace the rendered command list wholesale (most recent first).
    fn reload_commands(&mut self, records: &[CommandRecord]);

    /// Replace the rendered activity feed wholesale.
    fn reload_activity(&mut self, entries: &[ActivityEntry]);

    /// Set one header counter to a (possibly intermediate) value.
    fn set_counter(&mut self, counter: CounterKind, value: i64);

    /// Update the per-fleet device-status indicator.
    fn set_fleet_indicator(&mut self, indicator: FleetIndicator);

    /// Surface an application-level failure to the operator.
    fn notify_error(&mut self, message: &str);

    /// Navigate to the login entry point. Called at most once per session.
    fn redirect_to_login(&mut self);
}

/// View that discards everything. Useful for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl DashboardView for NullView {
    fn update_command_status(&mut self, _id: i64, _status: CommandStatus) -> bool {
        false
    }
    fn reload_commands(&mut self, _records: &[CommandRecord]) {}
    fn reload_activity(&mut self, _entries: &[ActivityEntry]) {}
    fn set_counter(&mut self, _counter: CounterKind, _value: i64) {}
    fn set_fleet_indicator(&mut self, _indicator: FleetIndicator) {}
    fn notify_error(&mut self, _message: &str) {}
    fn redirect_to_login(&mut self) {}
}

pub mod recording;
