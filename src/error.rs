//! Error types for lgnet
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur while evaluating and processing tasks
#[derive(Debug, Error)]
pub enum LgError {
    /// Zero, missing, or wrongly shaped bias for a referenced unit
    #[error("Invalid bias: {0}")]
    InvalidBias(String),

    /// Unrecognized `type` tag on a connection
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// Non-numeric, non-finite, non-integral or overflowing input
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Result store unavailable or write rejected
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Job queue submit/dequeue/ack failure
    #[error("Queue failure: {0}")]
    QueueFailure(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LgError {
    /// Whether this error was raised while evaluating the network itself
    pub fn is_evaluation_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidBias(_) | Self::UnknownUnitType(_) | Self::MalformedInput(_)
        )
    }
}

impl From<rusqlite::Error> for LgError {
    fn from(err: rusqlite::Error) -> Self {
        Self::PersistenceFailure(err.to_string())
    }
}

/// Result type alias for lgnet operations
pub type Result<T> = std::result::Result<T, LgError>;
