//! Error types for the client.
//!
//! [`RequestError`] is the failure half of a request outcome. It is never
//! returned as `Err` to UI code: hooks publish its message in their state and
//! hand back result values. [`ClientError`] covers fallible setup only.

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;
use crate::http::TransportError;
use crate::storage::StorageError;

/// Why a request did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No response reached us (DNS, connect, reset, timeout).
    #[error("{message}")]
    Network { message: String },

    /// The backend answered 401. Stored credentials are left untouched.
    #[error("{message}")]
    Unauthorized { message: String },

    /// Any other 4xx (validation or business rule failures).
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// 5xx from the backend.
    #[error("{message}")]
    Server { status: StatusCode, message: String },

    /// A 2xx response whose body could not be decoded as JSON.
    #[error("{message}")]
    Decode { status: StatusCode, message: String },
}

impl RequestError {
    /// The HTTP status, when a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Network { .. } => None,
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::Rejected { status, .. }
            | Self::Server { status, .. }
            | Self::Decode { status, .. } => Some(*status),
        }
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Network { message }
            | Self::Unauthorized { message }
            | Self::Rejected { message, .. }
            | Self::Server { message, .. }
            | Self::Decode { message, .. } => message,
        }
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Errors building a client from configuration.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
