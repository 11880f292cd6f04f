// error.rs — Error types for the execution log.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing the execution log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to open or create the log file.
    #[error("failed to open execution log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read, lock or write the log file.
    #[error("execution log I/O failed: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Failed to serialize or deserialize a record (malformed JSON).
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The log has been tampered with — hash chain is broken.
    #[error("integrity check failed at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },

    /// Records are missing or reordered — sequence numbers are not contiguous.
    #[error("sequence gap at line {line}: expected {expected}, got {actual}")]
    SequenceGap {
        line: usize,
        expected: u64,
        actual: u64,
    },

    /// The backing store could not serve the request.
    #[error("execution log unavailable: {0}")]
    Unavailable(String),
}
