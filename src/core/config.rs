//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{IrdError, Result};

/// Full client configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub server: ServerConfig,
    pub timing: TimingConfig,
    pub diagnostics: DiagnosticsConfig,
    pub paths: PathsConfig,
}

/// Dashboard server location and endpoint paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the dashboard API, no trailing slash.
    pub base_url: String,
    /// Path of the server-sent-event stream.
    pub events_path: String,
}

/// Poll cadences, reconnect delay, and animation duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Stats poller cadence.
    pub stats_poll_interval_ms: u64,
    /// Device-status poller cadence (independent task, not multiplexed).
    pub device_poll_interval_ms: u64,
    /// Fixed delay between stream reconnect attempts.
    pub reconnect_delay_ms: u64,
    /// Total duration of one counter animation.
    pub counter_animation_ms: u64,
    /// Per-request timeout for polled REST calls. The stream request is
    /// exempt — it is long-lived by design.
    pub request_timeout_ms: u64,
}

/// Diagnostics (JSONL event log) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    /// Bounded channel capacity between workers and the logger thread.
    pub channel_capacity: usize,
}

/// Filesystem paths used by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            events_path: "/api/events".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            stats_poll_interval_ms: 30_000,
            device_poll_interval_ms: 30_000,
            reconnect_delay_ms: 5_000,
            counter_animation_ms: 1_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: 1024,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[IRD-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("irdash").join("config.toml");
        let data = home_dir.join(".local").join("share").join("irdash");
        Self {
            config_file: cfg,
            jsonl_log: data.join("sync.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| IrdError::ConfigParse {
                context: "read",
                details: format!("{}: {source}", path_buf.display()),
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(IrdError::InvalidConfig {
                details: format!("missing configuration file: {}", path_buf.display()),
            });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        set_env_string("IRDASH_BASE_URL", &mut self.server.base_url);
        set_env_string("IRDASH_EVENTS_PATH", &mut self.server.events_path);

        set_env_u64(
            "IRDASH_STATS_POLL_INTERVAL_MS",
            &mut self.timing.stats_poll_interval_ms,
        )?;
        set_env_u64(
            "IRDASH_DEVICE_POLL_INTERVAL_MS",
            &mut self.timing.device_poll_interval_ms,
        )?;
        set_env_u64(
            "IRDASH_RECONNECT_DELAY_MS",
            &mut self.timing.reconnect_delay_ms,
        )?;
        set_env_u64(
            "IRDASH_COUNTER_ANIMATION_MS",
            &mut self.timing.counter_animation_ms,
        )?;
        set_env_u64(
            "IRDASH_REQUEST_TIMEOUT_MS",
            &mut self.timing.request_timeout_ms,
        )?;

        set_env_bool("IRDASH_DIAGNOSTICS_ENABLED", &mut self.diagnostics.enabled)?;
        Ok(())
    }

    fn normalize(&mut self) {
        while self.server.base_url.ends_with('/') {
            self.server.base_url.pop();
        }
        if !self.server.events_path.starts_with('/') {
            self.server.events_path.insert(0, '/');
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server.base_url.is_empty() {
            return Err(IrdError::InvalidConfig {
                details: "server.base_url must not be empty".to_string(),
            });
        }
        if !self.server.base_url.starts_with("http://")
            && !self.server.base_url.starts_with("https://")
        {
            return Err(IrdError::InvalidConfig {
                details: format!(
                    "server.base_url must start with http:// or https:// (got {})",
                    self.server.base_url
                ),
            });
        }
        if self.timing.stats_poll_interval_ms == 0 || self.timing.device_poll_interval_ms == 0 {
            return Err(IrdError::InvalidConfig {
                details: "poll intervals must be non-zero".to_string(),
            });
        }
        if self.timing.reconnect_delay_ms == 0 {
            return Err(IrdError::InvalidConfig {
                details: "timing.reconnect_delay_ms must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

fn set_env_string(key: &str, target: &mut String) {
    if let Some(raw) = env::var(key).ok().filter(|v| !v.trim().is_empty()) {
        *target = raw.trim().to_string();
    }
}

fn set_env_u64(key: &str, target: &mut u64) -> Result<()> {
    if let Ok(raw) = env::var(key) {
        *target = raw
            .trim()
            .parse::<u64>()
            .map_err(|_| IrdError::InvalidConfig {
                details: format!("{key} must be an unsigned integer (got {raw:?})"),
            })?;
    }
    Ok(())
}

fn set_env_bool(key: &str, target: &mut bool) -> Result<()> {
    if let Ok(raw) = env::var(key) {
        *target = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                return Err(IrdError::InvalidConfig {
                    details: format!("{key} must be a boolean (got {other:?})"),
                });
            }
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_cadence() {
        let cfg = Config::default();
        assert_eq!(cfg.timing.stats_poll_interval_ms, 30_000);
        assert_eq!(cfg.timing.device_poll_interval_ms, 30_000);
        assert_eq!(cfg.timing.reconnect_delay_ms, 5_000);
        assert_eq!(cfg.server.events_path, "/api/events");
    }

    #[test]
    fn normalize_strips_trailing_slash_and_prefixes_events_path() {
        let mut cfg = Config::default();
        cfg.server.base_url = "http://dash.local:5000///".to_string();
        cfg.server.events_path = "api/events".to_string();
        cfg.normalize();
        assert_eq!(cfg.server.base_url, "http://dash.local:5000");
        assert_eq!(cfg.server.events_path, "/api/events");
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let mut cfg = Config::default();
        cfg.timing.stats_poll_interval_ms = 0;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code(), "IRD-1001");
    }

    #[test]
    fn validate_rejects_non_http_base_url() {
        let mut cfg = Config::default();
        cfg.server.base_url = "ftp://dash.local".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [server]
            base_url = "http://10.0.0.2:5000"
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.server.base_url, "http://10.0.0.2:5000");
        assert_eq!(cfg.timing.reconnect_delay_ms, 5_000);
        assert!(cfg.diagnostics.enabled);
    }
}
