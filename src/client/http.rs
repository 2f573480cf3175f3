//! Blocking REST client for the dashboard API.
//!
//! Every caller observes the same authentication contract: HTTP 401 from
//! any endpoint maps to [`IrdError::Unauthorized`], which the reconciler
//! turns into exactly one login redirect. Non-2xx responses surface as
//! [`IrdError::Api`] with the server's error message when one is present.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use crate::core::config::Config;
use crate::core::errors::{IrdError, Result};
use crate::model::{
    ActivityEntry, AggregateStats, CommandRecord, CommandRequest, DeviceRecord,
    DeviceStatusResponse, DeviceStatusSummary, DevicesResponse,
};

/// Thin wrapper over `reqwest::blocking` with the dashboard's endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timing.request_timeout_ms))
            .build()
            .map_err(|err| IrdError::Runtime {
                details: format!("failed to build http client: {err}"),
            })?;
        Ok(Self {
            http,
            base_url: config.server.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn check(path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(IrdError::Unauthorized {
                endpoint: path.to_string(),
            });
        }
        if !status.is_success() {
            let message = response
                .text()
                .ok()
                .and_then(|body| extract_error_message(&body))
                .unwrap_or_else(|| status.to_string());
            return Err(IrdError::Api {
                endpoint: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .map_err(|err| IrdError::Transport {
                endpoint: path.to_string(),
                details: err.to_string(),
            })?;
        Self::check(path, response)?
            .json::<T>()
            .map_err(|err| IrdError::Decode {
                context: "response body",
                details: format!("{path}: {err}"),
            })
    }

    // ──────────────────── polled snapshots ────────────────────

    /// `GET /api/commands` — most recent first.
    pub fn commands(&self) -> Result<Vec<CommandRecord>> {
        self.get_json("/api/commands")
    }

    /// `GET /api/stats`.
    pub fn stats(&self) -> Result<AggregateStats> {
        self.get_json("/api/stats")
    }

    /// `GET /api/activity`.
    pub fn activity(&self) -> Result<Vec<ActivityEntry>> {
        self.get_json("/api/activity")
    }

    /// `GET /api/redrat/devices`.
    pub fn redrat_devices(&self) -> Result<Vec<DeviceRecord>> {
        let response: DevicesResponse = self.get_json("/api/redrat/devices")?;
        Ok(response.devices)
    }

    /// `GET /api/redrat/devices/status`.
    pub fn redrat_device_status(&self) -> Result<DeviceStatusSummary> {
        let response: DeviceStatusResponse = self.get_json("/api/redrat/devices/status")?;
        Ok(response.summary)
    }

    // ──────────────────── operator actions ────────────────────

    /// `POST /api/commands` — submit a command for execution.
    pub fn submit_command(&self, request: &CommandRequest) -> Result<()> {
        let path = "/api/commands";
        let response = self
            .http
            .post(self.url(path))
            .json(request)
            .send()
            .map_err(|err| IrdError::Transport {
                endpoint: path.to_string(),
                details: err.to_string(),
            })?;
        Self::check(path, response).map(|_| ())
    }

    /// `DELETE /api/activity` — clear the activity feed.
    pub fn clear_activity(&self) -> Result<()> {
        self.delete("/api/activity")
    }

    /// `DELETE /api/history` — clear the command history.
    pub fn clear_history(&self) -> Result<()> {
        self.delete("/api/history")
    }

    fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(path))
            .send()
            .map_err(|err| IrdError::Transport {
                endpoint: path.to_string(),
                details: err.to_string(),
            })?;
        Self::check(path, response).map(|_| ())
    }
}

/// Pull a human-readable message out of a JSON error body, if there is one.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
