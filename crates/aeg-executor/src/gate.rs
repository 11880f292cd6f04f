// gate.rs — AutoExecutionGate: the entry point for strategy generators.
//
// Entities are evaluated in parallel, but for a single entity the sequence
// evaluate → admit → mark executing → perform runs inside one critical
// section. The daily cap and cooldown are computed from the entity's log, so
// this is what keeps them exact when candidates for the same entity arrive
// concurrently. `execute` on an earlier decision re-enters the section and
// rechecks the switch, cap and cooldown before anything runs. Cross-entity
// reads (summaries, the global toggle) take no entity lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aeg_audit::{
    Clock, ExecutionSummary, JsonlExecutionLog, LogStore, SystemClock,
};
use aeg_policy::{
    ConfigStore, Decision, EvaluationTrace, Evaluator, JsonlConfigStore, PolicyConfigRegistry,
};
use aeg_predict::{PatternAnalyzer, PredictionResult, PredictiveScorer, ThreatPattern};
use aeg_strategy::{CandidateStore, StrategyCandidate, StrategyError, StrategyStatus};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ExecutorError;
use crate::executor::{ExecutionOutcome, StrategyExecutor};
use crate::performer::ActionPerformer;
use crate::settings::GateSettings;

/// Result of submitting one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReport {
    pub decision: Decision,
    /// Present when the candidate was admitted and handed to the performer.
    pub outcome: Option<ExecutionOutcome>,
}

/// Per-candidate result of [`AutoExecutionGate::process_queue`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum QueueReport {
    Submitted(SubmitReport),
    /// The candidate left `pending` before its turn (withdrawn or raced).
    Skipped { strategy_id: Uuid, reason: String },
}

pub struct AutoExecutionGate {
    configs: Arc<PolicyConfigRegistry>,
    log: Arc<dyn LogStore>,
    candidates: Arc<CandidateStore>,
    scorer: Arc<PredictiveScorer>,
    analyzer: PatternAnalyzer,
    evaluator: Evaluator,
    executor: StrategyExecutor,
    entity_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AutoExecutionGate {
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        log: Arc<dyn LogStore>,
        candidates: Arc<CandidateStore>,
        performer: Arc<dyn ActionPerformer>,
        clock: Arc<dyn Clock>,
        scorer_timeout: Duration,
    ) -> Self {
        let configs = Arc::new(PolicyConfigRegistry::with_clock(config_store, clock.clone()));
        let scorer = Arc::new(PredictiveScorer::new(log.clone()).with_timeout(scorer_timeout));
        Self {
            analyzer: PatternAnalyzer::new(log.clone()).with_timeout(scorer_timeout),
            evaluator: Evaluator::new(configs.clone(), log.clone(), scorer.clone(), clock.clone()),
            executor: StrategyExecutor::new(candidates.clone(), log.clone(), performer, clock),
            configs,
            log,
            candidates,
            scorer,
            entity_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Open the file-backed stores described by `settings`.
    pub fn open(
        settings: &GateSettings,
        performer: Arc<dyn ActionPerformer>,
    ) -> Result<Self, ExecutorError> {
        let log = JsonlExecutionLog::open(settings.execution_log_path())?;
        let candidates = CandidateStore::new(settings.candidates_dir())?;
        Ok(Self::new(
            Arc::new(JsonlConfigStore::new(settings.policy_store_path())),
            Arc::new(log),
            Arc::new(candidates),
            performer,
            Arc::new(SystemClock),
            settings.scorer_timeout(),
        ))
    }

    pub fn configs(&self) -> &PolicyConfigRegistry {
        &self.configs
    }

    pub fn candidates(&self) -> &CandidateStore {
        &self.candidates
    }

    pub fn log(&self) -> &dyn LogStore {
        self.log.as_ref()
    }

    /// Evaluate without executing, inside the entity's critical section.
    pub fn evaluate(&self, candidate: &StrategyCandidate) -> Result<Decision, ExecutorError> {
        Ok(self.evaluate_with_trace(candidate)?.decision)
    }

    pub fn evaluate_with_trace(
        &self,
        candidate: &StrategyCandidate,
    ) -> Result<EvaluationTrace, ExecutorError> {
        let lock = self.entity_lock(&candidate.entity_name);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());
        Ok(self.evaluator.evaluate_with_trace(candidate)?)
    }

    /// Register, evaluate and (if admitted) execute a candidate, holding the
    /// entity's lock throughout.
    ///
    /// A candidate that is no longer pending is refused with `Reentrancy`
    /// and is not evaluated. A rejected candidate stays pending.
    pub fn submit(&self, candidate: &StrategyCandidate) -> Result<SubmitReport, ExecutorError> {
        let lock = self.entity_lock(&candidate.entity_name);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());

        let stored = self.candidates.register(candidate)?;
        if stored.status != StrategyStatus::Pending {
            return Err(ExecutorError::Reentrancy {
                strategy_id: stored.id,
                status: stored.status.to_string(),
            });
        }

        let decision = self.evaluator.evaluate(&stored)?;
        let outcome = if decision.admitted {
            Some(self.executor.execute(&stored, &decision)?)
        } else {
            None
        };
        Ok(SubmitReport { decision, outcome })
    }

    /// Execute a candidate admitted by an earlier [`evaluate`](Self::evaluate).
    ///
    /// Other executions may have landed since the decision, so the automation
    /// switch, daily cap and cooldown are checked again under the entity lock.
    /// A candidate that no longer fits is refused with `LimitReached` and
    /// stays pending.
    pub fn execute(
        &self,
        candidate: &StrategyCandidate,
        decision: &Decision,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let lock = self.entity_lock(&candidate.entity_name);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(stored) = self.candidates.get(candidate.id)? {
            if stored.status != StrategyStatus::Pending {
                return Err(ExecutorError::Reentrancy {
                    strategy_id: stored.id,
                    status: stored.status.to_string(),
                });
            }
        }
        if decision.admitted && decision.strategy_id == candidate.id {
            if let Some(reason) = self.evaluator.recheck_limits(candidate)? {
                tracing::warn!(
                    "strategy {} for {} admitted at {} but no longer runnable: {}",
                    candidate.id,
                    candidate.entity_name,
                    decision.decided_at,
                    reason
                );
                return Err(ExecutorError::LimitReached {
                    strategy_id: candidate.id,
                    reason,
                });
            }
        }
        self.executor.execute(candidate, decision)
    }

    /// Withdraw a pending candidate before it is evaluated.
    pub fn withdraw(
        &self,
        strategy_id: Uuid,
        reason: &str,
    ) -> Result<StrategyCandidate, ExecutorError> {
        let candidate = self
            .candidates
            .get(strategy_id)?
            .ok_or(StrategyError::NotFound(strategy_id))?;
        let lock = self.entity_lock(&candidate.entity_name);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());
        let withdrawn = self.candidates.withdraw(strategy_id, reason)?;
        tracing::info!("withdrew strategy {} for {}", strategy_id, withdrawn.entity_name);
        Ok(withdrawn)
    }

    /// Submit every pending candidate, oldest first.
    ///
    /// Candidates that stop being pending before their turn are skipped.
    /// Store and audit failures abort the pass.
    pub fn process_queue(&self) -> Result<Vec<QueueReport>, ExecutorError> {
        let pending = self.candidates.pending(None)?;
        tracing::info!("processing {} pending strategies", pending.len());

        let mut reports = Vec::with_capacity(pending.len());
        for candidate in pending {
            match self.submit(&candidate) {
                Ok(report) => reports.push(QueueReport::Submitted(report)),
                Err(ExecutorError::Reentrancy { strategy_id, status }) => {
                    reports.push(QueueReport::Skipped {
                        strategy_id,
                        reason: format!("no longer pending ({})", status),
                    })
                }
                Err(e) => return Err(e),
            }
        }
        Ok(reports)
    }

    /// Decision and execution counts, for one entity or all of them.
    pub fn summary(&self, entity_name: Option<&str>) -> Result<ExecutionSummary, ExecutorError> {
        let entries = match entity_name {
            Some(entity) => self.log.entries_for(entity)?,
            None => self.log.entries()?,
        };
        Ok(ExecutionSummary::from_entries(&entries))
    }

    pub fn predict(&self, candidate: &StrategyCandidate) -> Result<PredictionResult, ExecutorError> {
        Ok(self.scorer.predict(candidate, &candidate.entity_name)?)
    }

    pub fn analyze_patterns(&self, entity_name: &str) -> Result<Vec<ThreatPattern>, ExecutorError> {
        Ok(self.analyzer.analyze_patterns(entity_name)?.collect())
    }

    fn entity_lock(&self, entity_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.entity_locks.lock().unwrap_or_else(|p| p.into_inner());
        locks
            .entry(entity_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
