// error.rs — Error types for execution and the gate facade.

use std::path::PathBuf;

use aeg_audit::AuditError;
use aeg_policy::{DecisionReason, PolicyError};
use aeg_predict::PredictError;
use aeg_strategy::StrategyError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ExecutorError {
    /// `execute` was called with a rejection. The policy said no.
    #[error("strategy {strategy_id} was not admitted: {reason}")]
    NotAdmitted { strategy_id: Uuid, reason: String },

    /// The candidate is no longer pending. Executing the same strategy
    /// twice is a caller bug, not a policy outcome.
    #[error("strategy {strategy_id} is already {status}; it can only be executed from pending")]
    Reentrancy { strategy_id: Uuid, status: String },

    /// Admitted earlier, but another execution or a config change since
    /// then means it may no longer run.
    #[error("strategy {strategy_id} can no longer run: {reason}")]
    LimitReached {
        strategy_id: Uuid,
        reason: DecisionReason,
    },

    /// The actions ran and the candidate's status was updated, but the
    /// execution_finished record could not be appended.
    #[error("strategy {strategy_id} ran (success={success}) but its outcome was not logged: {source}")]
    OutcomeUnrecorded {
        strategy_id: Uuid,
        success: bool,
        source: AuditError,
    },

    /// The decision passed to `execute` belongs to another candidate.
    #[error("decision for strategy {decision_strategy} used to execute {candidate}")]
    DecisionMismatch { decision_strategy: Uuid, candidate: Uuid },

    #[error("gate settings error at {path}: {reason}")]
    Settings { path: PathBuf, reason: String },

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Predict(#[from] PredictError),
}

/// Failures reported by an [`crate::ActionPerformer`].
#[derive(Debug, Error)]
pub enum PerformerError {
    #[error("action performer unavailable: {0}")]
    Unavailable(String),

    #[error("action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },
}
