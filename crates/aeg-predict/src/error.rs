// error.rs — Error types for prediction and pattern analysis.

use aeg_audit::AuditError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    /// The execution log could not be read.
    #[error("execution history unavailable: {0}")]
    Store(#[from] AuditError),

    /// The history scan ran past the configured limit.
    #[error("history scan timed out after {elapsed_ms}ms (limit {limit_ms}ms)")]
    Timeout { elapsed_ms: u64, limit_ms: u64 },
}
