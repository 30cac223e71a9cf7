//! Error types for stepsync.

use thiserror::Error;

/// Errors produced by the sync subsystem and its CLI host.
#[derive(Debug, Error)]
pub enum StepsyncError {
    /// The local queue database could not complete an operation.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration could not be loaded, saved, or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A requested item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote service could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The remote service answered with a non-success status.
    #[error("Remote rejected request ({status}): {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// A queued operation type is not part of this client's operation set.
    #[error("Unknown operation type: {0}")]
    UnknownOperation(String),

    /// A queued payload does not match the shape its operation expects.
    #[error("Invalid payload for {operation}: {reason}")]
    InvalidPayload {
        /// Operation identifier.
        operation: String,
        /// Decoder message.
        reason: String,
    },
}

impl StepsyncError {
    /// True for client/server contract mismatches, as opposed to transient
    /// replay failures.
    #[must_use]
    pub const fn is_resolution_failure(&self) -> bool {
        matches!(self, Self::UnknownOperation(_) | Self::InvalidPayload { .. })
    }

    /// True when the error came from the remote boundary (transport or
    /// rejection).
    #[must_use]
    pub const fn is_remote_failure(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Remote { .. })
    }
}

impl From<rusqlite::Error> for StepsyncError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<reqwest::Error> for StepsyncError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Remote {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => Self::Network(e.to_string()),
        }
    }
}
