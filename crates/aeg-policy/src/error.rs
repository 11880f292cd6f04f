// error.rs — Error types for the policy subsystem.

use std::path::PathBuf;

use aeg_audit::AuditError;
use thiserror::Error;

/// Errors that can occur during policy operations.
///
/// A missing config or a rejected candidate is not an error.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A config record violates its invariants and was not stored.
    #[error("invalid policy config for '{entity_name}': {reason}")]
    InvalidConfig { entity_name: String, reason: String },

    /// The config store file could not be read or written.
    #[error("config store I/O error at {path}: {source}")]
    StoreIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The execution log (audit trail) could not be read or written.
    #[error("audit trail error: {0}")]
    Audit(#[from] AuditError),
}
