// error.rs — Error types for the strategy lifecycle subsystem.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during candidate lifecycle operations.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize candidate data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The requested candidate was not found.
    #[error("strategy candidate not found: {0}")]
    NotFound(Uuid),

    /// Invalid status transition.
    #[error("invalid transition from {from} to {to} for strategy {strategy_id}")]
    InvalidTransition {
        strategy_id: Uuid,
        from: String,
        to: String,
    },

    /// A candidate failed validation when it was registered.
    #[error("invalid strategy candidate {strategy_id}: {reason}")]
    InvalidCandidate { strategy_id: Uuid, reason: String },
}
