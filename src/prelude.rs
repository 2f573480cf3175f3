//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use irdash_sync::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{IrdError, Result};

// Transport
pub use crate::client::http::ApiClient;
pub use crate::client::stream::{StreamConfig, StreamHandle};

// Model
pub use crate::model::{
    ActivityEntry, AggregateStats, CommandRecord, CommandRequest, CommandStatus, DeviceRecord,
    DeviceStatus, StreamEvent,
};

// Store
pub use crate::store::{ApplyOutcome, EntityStore};

// Sync
pub use crate::sync::SyncMessage;
pub use crate::sync::aggregate::{FleetIndicator, IndicatorColor, aggregate};
pub use crate::sync::counter::{CounterAnimator, FrameScheduler, plan_frames};
pub use crate::sync::poller::{PollingRefresher, TickOutcome};
pub use crate::sync::reconciler::Reconciler;
pub use crate::sync::runtime::SyncRuntime;

// View
pub use crate::view::{CounterKind, DashboardView, NullView};

// Diagnostics
pub use crate::logger::{DiagnosticsEvent, DiagnosticsHandle, spawn_diagnostics};
