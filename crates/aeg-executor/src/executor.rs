// executor.rs — Runs an admitted strategy exactly once.
//
//   admitted decision
//     → candidate pending → executing (atomic; anything else is re-entrancy)
//     → log execution_started
//     → ActionPerformer::perform
//     → candidate completed | cancelled
//     → log execution_finished
//
// The executor is the only writer of StrategyCandidate.status after
// registration. Failed actions are never retried. It is reached only through
// AutoExecutionGate, which holds the entity lock and rechecks the limits.

use std::sync::Arc;

use aeg_audit::{Clock, LogRecord, LogStore, OutcomeSummary};
use aeg_policy::Decision;
use aeg_strategy::{CandidateStore, ExecutionResult, StrategyCandidate, StrategyError, StrategyStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExecutorError;
use crate::performer::{ActionPerformer, ActionReport};

/// Result of one execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub strategy_id: Uuid,
    /// The decision entry this execution belongs to.
    pub entry_id: Uuid,
    pub entity_name: String,
    pub success: bool,
    pub executed_actions: usize,
    pub details: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Final candidate status: completed or cancelled.
    pub status: StrategyStatus,
}

pub(crate) struct StrategyExecutor {
    candidates: Arc<CandidateStore>,
    log: Arc<dyn LogStore>,
    performer: Arc<dyn ActionPerformer>,
    clock: Arc<dyn Clock>,
}

impl StrategyExecutor {
    pub(crate) fn new(
        candidates: Arc<CandidateStore>,
        log: Arc<dyn LogStore>,
        performer: Arc<dyn ActionPerformer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            candidates,
            log,
            performer,
            clock,
        }
    }

    /// Execute an admitted candidate.
    ///
    /// Returns `NotAdmitted` for a rejection and `Reentrancy` when the
    /// candidate has already left `pending`. Action failures are not errors:
    /// they produce a `cancelled` outcome.
    pub(crate) fn execute(
        &self,
        candidate: &StrategyCandidate,
        decision: &Decision,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        if decision.strategy_id != candidate.id {
            return Err(ExecutorError::DecisionMismatch {
                decision_strategy: decision.strategy_id,
                candidate: candidate.id,
            });
        }
        if !decision.admitted {
            return Err(ExecutorError::NotAdmitted {
                strategy_id: candidate.id,
                reason: decision.reason.to_string(),
            });
        }

        self.candidates.register(candidate)?;
        let started_at = self.clock.now();
        let running = self
            .candidates
            .begin_execution(candidate.id, started_at)
            .map_err(|e| match e {
                StrategyError::InvalidTransition {
                    strategy_id, from, ..
                } => ExecutorError::Reentrancy {
                    strategy_id,
                    status: from,
                },
                other => ExecutorError::Strategy(other),
            })?;

        let started = LogRecord::ExecutionStarted {
            entry_id: decision.entry_id,
            strategy_id: running.id,
            entity_name: running.entity_name.clone(),
            executed_at: started_at,
        };
        if let Err(e) = self.log.append(started) {
            // Without a start record the cap and cooldown cannot see this
            // execution, so nothing may run.
            self.candidates.finish_execution(
                running.id,
                ExecutionResult {
                    success: false,
                    executed_actions: 0,
                    details: format!("execution log unavailable: {}", e),
                    finished_at: self.clock.now(),
                },
            )?;
            return Err(e.into());
        }

        tracing::info!(
            "executing strategy {} for {} ({} actions)",
            running.id,
            running.entity_name,
            running.actions.len()
        );

        let report = match self.performer.perform(&running.entity_name, &running.actions) {
            Ok(report) => report,
            Err(e) => ActionReport {
                success: false,
                executed_actions: 0,
                details: e.to_string(),
            },
        };
        let finished_at = self.clock.now();

        let finished = self.candidates.finish_execution(
            running.id,
            ExecutionResult {
                success: report.success,
                executed_actions: report.executed_actions,
                details: report.details.clone(),
                finished_at,
            },
        )?;
        let recorded = self.log.append(LogRecord::ExecutionFinished {
            entry_id: decision.entry_id,
            strategy_id: running.id,
            entity_name: running.entity_name.clone(),
            outcome: OutcomeSummary {
                success: report.success,
                executed_actions: report.executed_actions,
                details: report.details.clone(),
            },
            finished_at,
        });
        if let Err(source) = recorded {
            tracing::error!(
                "strategy {} finished ({}) but execution_finished was not logged: {}",
                running.id,
                finished.status,
                source
            );
            return Err(ExecutorError::OutcomeUnrecorded {
                strategy_id: running.id,
                success: report.success,
                source,
            });
        }

        if report.success {
            tracing::info!(
                "strategy {} completed ({} actions)",
                running.id,
                report.executed_actions
            );
        } else {
            tracing::warn!("strategy {} cancelled: {}", running.id, report.details);
        }

        Ok(ExecutionOutcome {
            strategy_id: running.id,
            entry_id: decision.entry_id,
            entity_name: running.entity_name,
            success: report.success,
            executed_actions: report.executed_actions,
            details: report.details,
            started_at,
            finished_at,
            status: finished.status,
        })
    }
}
