//! The synchronization core: reconciler, pollers, aggregation, animation.

pub mod aggregate;
pub mod counter;
pub mod poller;
pub mod reconciler;
pub mod runtime;

use crate::model::{ActivityEntry, AggregateStats, CommandRecord, DeviceRecord};
use crate::view::CounterKind;

/// Messages flowing from transport workers into the reconciler.
///
/// Both the push channel and the pollers feed the same bus; the reconciler
/// is the only consumer and the only writer of the EntityStore, which is
/// what makes the push/poll race on one id benign.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    /// A status transition, from the stream or from a poll result.
    CommandUpdate(CommandRecord),
    /// Full read-replace of the command list.
    CommandList(Vec<CommandRecord>),
    /// Aggregate counter snapshot.
    StatsSnapshot(AggregateStats),
    /// Full read-replace of the device fleet.
    DeviceSnapshot(Vec<DeviceRecord>),
    /// Full read-replace of the activity feed.
    ActivitySnapshot(Vec<ActivityEntry>),
    /// One paced animation frame, fed back by the frame scheduler. Frames
    /// whose epoch has been superseded are dropped on arrival.
    CounterFrame {
        counter: CounterKind,
        value: i64,
        epoch: u64,
    },
    /// A 401 was observed somewhere; the session is over.
    SessionInvalid { source: &'static str },
    /// Sentinel requesting graceful shutdown of the reconciler loop.
    Shutdown,
}
