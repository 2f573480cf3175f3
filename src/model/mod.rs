//! Wire model: records, aggregate snapshots, and the stream event envelope.

#![allow(missing_docs)]

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ──────────────────── command records ────────────────────

/// Execution status of a submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Executed,
    Failed,
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Executed => write!(f, "executed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One command issued against a remote, as the server reports it.
///
/// Created server-side on submission; mutated only by status transitions
/// pushed or polled from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub id: i64,
    #[serde(default)]
    pub remote_id: Option<i64>,
    #[serde(default)]
    pub remote_name: String,
    pub command: String,
    #[serde(default)]
    pub device: String,
    pub status: CommandStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// ──────────────────── device records ────────────────────

/// Last observed status of a RedRat device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    #[default]
    Offline,
    Error,
}

/// A registered RedRat IR transmitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub device_ports: Option<u32>,
    #[serde(default)]
    pub port_descriptions: Option<Vec<String>>,
    /// Defaults to `offline` when the server omits the field.
    #[serde(default)]
    pub last_status: DeviceStatus,
    #[serde(default)]
    pub is_active: bool,
}

// ──────────────────── aggregate snapshots ────────────────────

/// Plain entity counters, no identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateStats {
    pub remotes: i64,
    pub commands: i64,
    pub sequences: i64,
    pub schedules: i64,
    pub redrat_devices: Option<i64>,
}

/// Device-status roll-up from `/api/redrat/devices/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceStatusSummary {
    pub total_devices: u32,
    pub online: u32,
    pub offline: u32,
    pub error: u32,
}

// ──────────────────── activity feed ────────────────────

/// One row of the operator activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    #[serde(default)]
    pub user_name: String,
    pub command: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub remote_name: String,
    pub status: CommandStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// ──────────────────── stream envelope ────────────────────

/// Envelope carried on the push channel.
///
/// `heartbeat` exists only to keep the connection alive and must never
/// mutate state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    CommandUpdate { command: CommandRecord },
    Heartbeat,
}

// ──────────────────── command submission ────────────────────

/// Body of `POST /api/commands`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandRequest {
    /// Standard remote command.
    Standard {
        remote_id: i64,
        command: String,
        device: String,
    },
    /// RedRat direct-port variant.
    RedRat {
        redrat_device_id: i64,
        ir_port: u32,
        power: u32,
        command: String,
    },
}

// ──────────────────── REST response wrappers ────────────────────

/// Wrapper for `GET /api/redrat/devices`.
#[derive(Debug, Clone, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

/// Wrapper for `GET /api/redrat/devices/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub summary: DeviceStatusSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_command_update_envelope() {
        let raw = r#"{"type":"command_update","command":{"id":7,"remote_id":2,
            "remote_name":"Living Room","command":"power","device":"stb-1",
            "status":"executed","created_at":"2026-08-01T10:00:00Z"}}"#;
        let event: StreamEvent = serde_json::from_str(raw).expect("valid envelope");
        match event {
            StreamEvent::CommandUpdate { command } => {
                assert_eq!(command.id, 7);
                assert_eq!(command.status, CommandStatus::Executed);
            }
            StreamEvent::Heartbeat => panic!("expected command_update"),
        }
    }

    #[test]
    fn decodes_heartbeat_without_payload() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"heartbeat"}"#).expect("valid heartbeat");
        assert_eq!(event, StreamEvent::Heartbeat);
    }

    #[test]
    fn device_status_defaults_to_offline_when_absent() {
        let raw = r#"{"id":3,"name":"rack-redrat","ip_address":"10.0.0.9","port":40000}"#;
        let device: DeviceRecord = serde_json::from_str(raw).expect("valid device");
        assert_eq!(device.last_status, DeviceStatus::Offline);
        assert!(!device.is_active);
    }

    #[test]
    fn aggregate_stats_tolerates_missing_counters() {
        let stats: AggregateStats =
            serde_json::from_str(r#"{"remotes":4,"commands":120}"#).expect("partial stats");
        assert_eq!(stats.remotes, 4);
        assert_eq!(stats.sequences, 0);
        assert!(stats.redrat_devices.is_none());
    }

    #[test]
    fn command_request_variants_serialize_distinctly() {
        let standard = CommandRequest::Standard {
            remote_id: 1,
            command: "power".to_string(),
            device: "stb-1".to_string(),
        };
        let redrat = CommandRequest::RedRat {
            redrat_device_id: 5,
            ir_port: 2,
            power: 50,
            command: "power".to_string(),
        };
        let s = serde_json::to_value(&standard).expect("serialize");
        let r = serde_json::to_value(&redrat).expect("serialize");
        assert!(s.get("remote_id").is_some());
        assert!(s.get("redrat_device_id").is_none());
        assert!(r.get("redrat_device_id").is_some());
        assert!(r.get("ir_port").is_some());
    }

    #[test]
    fn unknown_event_type_is_a_decode_error() {
        let result = serde_json::from_str::<StreamEvent>(r#"{"type":"mystery"}"#);
        assert!(result.is_err());
    }
}
