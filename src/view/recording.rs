//! Recording view: captures every fan-out call for assertion in tests.
//!
//! Shared by the unit suites, the reconciliation property tests, and the
//! integration tests, which is why it lives in the library rather than
//! behind `#[cfg(test)]`.

use std::collections::HashMap;

use crate::model::{ActivityEntry, CommandRecord, CommandStatus};
use crate::sync::aggregate::FleetIndicator;
use crate::view::{CounterKind, DashboardView};

/// One recorded side effect, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewCall {
    BadgeUpdated { id: i64, status: CommandStatus },
    CommandsReloaded { count: usize },
    ActivityReloaded { count: usize },
    CounterSet { counter: CounterKind, value: i64 },
    IndicatorSet(FleetIndicator),
    ErrorNotified(String),
    RedirectedToLogin,
}

/// A `DashboardView` that records calls and simulates rendered rows.
#[derive(Debug, Default)]
pub struct RecordingView {
    /// Ids considered "currently rendered"; badge updates against other ids
    /// report not-rendered, as a real list view would.
    pub rendered_ids: Vec<i64>,
    pub calls: Vec<ViewCall>,
    pub counters: HashMap<&'static str, i64>,
    pub badge: HashMap<i64, CommandStatus>,
}

impl RecordingView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// View that treats the given ids as rendered rows.
    #[must_use]
    pub fn with_rendered(ids: &[i64]) -> Self {
        Self {
            rendered_ids: ids.to_vec(),
            ..Self::default()
        }
    }

    /// Number of activity feed reloads observed.
    #[must_use]
    pub fn feed_reloads(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ViewCall::ActivityReloaded { .. }))
            .count()
    }

    /// Number of login redirects observed.
    #[must_use]
    pub fn login_redirects(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ViewCall::RedirectedToLogin))
            .count()
    }
}

impl DashboardView for RecordingView {
    fn update_command_status(&mut self, id: i64, status: CommandStatus) -> bool {
        self.calls.push(ViewCall::BadgeUpdated { id, status });
        self.badge.insert(id, status);
        self.rendered_ids.contains(&id)
    }

    fn reload_commands(&mut self, records: &[CommandRecord]) {
        self.rendered_ids = records.iter().map(|r| r.id).collect();
        for record in records {
            self.badge.insert(record.id, record.status);
        }
        self.calls.push(ViewCall::CommandsReloaded {
            count: records.len(),
        });
    }

    fn reload_activity(&mut self, entries: &[ActivityEntry]) {
        self.calls.push(ViewCall::ActivityReloaded {
            count: entries.len(),
        });
    }

    fn set_counter(&mut self, counter: CounterKind, value: i64) {
        self.counters.insert(counter.label(), value);
        self.calls.push(ViewCall::CounterSet { counter, value });
    }

    fn set_fleet_indicator(&mut self, indicator: FleetIndicator) {
        self.calls.push(ViewCall::IndicatorSet(indicator));
    }

    fn notify_error(&mut self, message: &str) {
        self.calls.push(ViewCall::ErrorNotified(message.to_string()));
    }

    fn redirect_to_login(&mut self) {
        self.calls.push(ViewCall::RedirectedToLogin);
    }
}
