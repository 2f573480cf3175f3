//! IRD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, IrdError>;

/// Top-level error type for the dashboard sync client.
#[derive(Debug, Error)]
pub enum IrdError {
    #[error("[IRD-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[IRD-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[IRD-2001] transport failure for {endpoint}: {details}")]
    Transport { endpoint: String, details: String },

    #[error("[IRD-2002] session invalid (401) from {endpoint}")]
    Unauthorized { endpoint: String },

    #[error("[IRD-2003] server rejected request to {endpoint} (HTTP {status}): {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("[IRD-2101] payload decode failure in {context}: {details}")]
    Decode {
        context: &'static str,
        details: String,
    },

    #[error("[IRD-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[IRD-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl IrdError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "IRD-1001",
            Self::ConfigParse { .. } => "IRD-1003",
            Self::Transport { .. } => "IRD-2001",
            Self::Unauthorized { .. } => "IRD-2002",
            Self::Api { .. } => "IRD-2003",
            Self::Decode { .. } => "IRD-2101",
            Self::ChannelClosed { .. } => "IRD-3003",
            Self::Runtime { .. } => "IRD-3900",
        }
    }

    /// Whether the next poll tick or reconnect attempt might resolve the failure.
    ///
    /// `Unauthorized` is deliberately non-retryable: it ends the session.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Decode { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
        )
    }

    /// Whether this error means the client session is over.
    #[must_use]
    pub const fn is_session_invalid(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<serde_json::Error> for IrdError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for IrdError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
