//! EntityStore: the single source of truth for rendered status.
//!
//! All mutation passes through the reconciler; views hold derived,
//! disposable copies only. At most one `CommandRecord` per id is live, and
//! it reflects the most recently **accepted** transition — acceptance is by
//! arrival order with last-write-wins by field value, not by embedded
//! timestamp.

use std::collections::HashMap;

use crate::model::{CommandRecord, CommandStatus, DeviceRecord};

/// Result of applying a command update to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// First sighting of this id.
    Inserted,
    /// Status changed from `previous`.
    Updated {
        /// Status the record held before this apply.
        previous: CommandStatus,
    },
    /// Same `{id, status}` pair as the live record — idempotent no-op.
    Unchanged,
}

impl ApplyOutcome {
    /// Whether the apply changed observable state.
    #[must_use]
    pub const fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// In-memory map from entity id to last-known status record.
#[derive(Debug, Default)]
pub struct EntityStore {
    commands: HashMap<i64, CommandRecord>,
    devices: Vec<DeviceRecord>,
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one command update under the last-write-wins-by-value policy.
    ///
    /// A record arriving with the status the store already holds for that id
    /// is `Unchanged` and must trigger no side effects. Any other status
    /// overwrites, even if its `created_at` is older than the live record's.
    pub fn apply_command(&mut self, record: CommandRecord) -> ApplyOutcome {
        match self.commands.get(&record.id) {
            None => {
                self.commands.insert(record.id, record);
                ApplyOutcome::Inserted
            }
            Some(live) if live.status == record.status => ApplyOutcome::Unchanged,
            Some(live) => {
                let previous = live.status;
                self.commands.insert(record.id, record);
                ApplyOutcome::Updated { previous }
            }
        }
    }

    /// Full read-replace from a polled command list.
    pub fn replace_commands(&mut self, records: Vec<CommandRecord>) {
        self.commands = records.into_iter().map(|r| (r.id, r)).collect();
    }

    /// Full read-replace of the device fleet.
    pub fn replace_devices(&mut self, devices: Vec<DeviceRecord>) {
        self.devices = devices;
    }

    #[must_use]
    pub fn command(&self, id: i64) -> Option<&CommandRecord> {
        self.commands.get(&id)
    }

    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    /// Clear command history (mirrors the server-side clear operation).
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }
}
