// evaluator.rs — Admission checks for autonomous strategy execution.
//
// Every candidate passes through `evaluate()`, which runs these checks in
// order and stops at the first failure:
//
//  1. Automation enabled for the entity?            → No  → reject
//  2. Strategy type allowed?                        → No  → reject
//  3. Daily execution cap reached (UTC day)?        → Yes → reject
//  4. Cooldown since the last execution active?     → Yes → reject
//  5. Score the candidate (scorer faults fail closed at step 7)
//  6. Success probability below threshold?          → Yes → reject
//  7. Confidence below threshold (or no score)?     → Yes → reject
//     (6 and 7 swap when the prediction is a cold start)
//  8. Risk above threshold?                         → Yes → reject
//  9. Resource requirement above threshold?         → Yes → reject
// 10. Admit.
//
// Exactly one ExecutionLogEntry is appended per call, whatever the outcome.
// Steps 3 and 4 read the entity's log, so callers that need the cap to hold
// under concurrency must serialize evaluate → execute per entity, and callers
// that execute later must run `recheck_limits` first.

use std::fmt;
use std::sync::Arc;

use aeg_audit::{Clock, DecisionKind, ExecutionLogEntry, LogRecord, LogStore};
use aeg_predict::{PredictionResult, PredictiveScorer};
use aeg_strategy::StrategyCandidate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PolicyError;
use crate::rate::RateSnapshot;
use crate::store::PolicyConfigRegistry;

/// Why a candidate was admitted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    AutomationDisabled,
    StrategyTypeNotPermitted,
    DailyCapReached,
    CooldownActive,
    SuccessProbabilityBelowThreshold,
    ConfidenceBelowThreshold,
    RiskExceedsThreshold,
    ResourceExceedsThreshold,
    AllThresholdsSatisfied,
}

impl DecisionReason {
    /// The reason string recorded in the execution log.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::AutomationDisabled => "automation disabled for entity",
            DecisionReason::StrategyTypeNotPermitted => "strategy type not permitted",
            DecisionReason::DailyCapReached => "daily execution cap reached",
            DecisionReason::CooldownActive => "cooldown period active",
            DecisionReason::SuccessProbabilityBelowThreshold => {
                "success probability below threshold"
            }
            DecisionReason::ConfidenceBelowThreshold => "confidence score below threshold",
            DecisionReason::RiskExceedsThreshold => "risk level exceeds threshold",
            DecisionReason::ResourceExceedsThreshold => "resource requirement exceeds threshold",
            DecisionReason::AllThresholdsSatisfied => "all thresholds satisfied",
        }
    }

    pub fn is_admission(&self) -> bool {
        matches!(self, DecisionReason::AllThresholdsSatisfied)
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The evaluator's answer for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Id of the log entry recording this decision.
    pub entry_id: Uuid,
    pub strategy_id: Uuid,
    pub entity_name: String,
    pub admitted: bool,
    pub reason: DecisionReason,
    /// `None` when a check before scoring already rejected the candidate.
    pub prediction: Option<PredictionResult>,
    /// Scorer fault behind a fail-closed rejection.
    pub fault: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// One check in the evaluation chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationStep {
    /// Which check ran (e.g., "daily_cap", "confidence").
    pub check: String,
    /// "passed", or "failed: ..." with the compared values.
    pub outcome: String,
    /// Whether this step decided the result.
    pub terminal: bool,
}

/// A decision together with every check that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationTrace {
    pub decision: Decision,
    pub steps: Vec<EvaluationStep>,
}

struct Verdict {
    reason: DecisionReason,
    prediction: Option<PredictionResult>,
    fault: Option<String>,
}

impl Verdict {
    fn reject(reason: DecisionReason) -> Self {
        Self {
            reason,
            prediction: None,
            fault: None,
        }
    }
}

pub struct Evaluator {
    configs: Arc<PolicyConfigRegistry>,
    log: Arc<dyn LogStore>,
    scorer: Arc<PredictiveScorer>,
    clock: Arc<dyn Clock>,
}

impl Evaluator {
    pub fn new(
        configs: Arc<PolicyConfigRegistry>,
        log: Arc<dyn LogStore>,
        scorer: Arc<PredictiveScorer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            configs,
            log,
            scorer,
            clock,
        }
    }

    /// Decide whether `candidate` may run autonomously, and record the decision.
    ///
    /// Rejection is a normal result. An error means the decision could not
    /// be audited (the log could not be read or written).
    pub fn evaluate(&self, candidate: &StrategyCandidate) -> Result<Decision, PolicyError> {
        Ok(self.evaluate_with_trace(candidate)?.decision)
    }

    /// Same as [`evaluate`](Self::evaluate), also returning the ordered checks.
    pub fn evaluate_with_trace(
        &self,
        candidate: &StrategyCandidate,
    ) -> Result<EvaluationTrace, PolicyError> {
        let now = self.clock.now();
        let mut steps = Vec::new();
        let verdict = self.run_checks(candidate, now, &mut steps)?;

        let kind = if verdict.reason.is_admission() {
            DecisionKind::Admitted
        } else {
            DecisionKind::Rejected
        };
        let mut entry = ExecutionLogEntry::new(candidate, kind, verdict.reason.as_str(), now);
        if let Some(prediction) = &verdict.prediction {
            entry = entry.with_prediction(prediction.snapshot());
        }
        if let Some(fault) = &verdict.fault {
            entry = entry.with_fault(fault.clone());
        }
        let entry_id = entry.entry_id;
        self.log.append(LogRecord::Decision(entry))?;

        if kind == DecisionKind::Admitted {
            tracing::info!(
                "admitted strategy {} for {} ({})",
                candidate.id,
                candidate.entity_name,
                candidate.strategy_type
            );
        } else {
            tracing::debug!(
                "rejected strategy {} for {}: {}",
                candidate.id,
                candidate.entity_name,
                verdict.reason
            );
        }

        Ok(EvaluationTrace {
            decision: Decision {
                entry_id,
                strategy_id: candidate.id,
                entity_name: candidate.entity_name.clone(),
                admitted: kind == DecisionKind::Admitted,
                reason: verdict.reason,
                prediction: verdict.prediction,
                fault: verdict.fault,
                decided_at: now,
            },
            steps,
        })
    }

    /// Re-run the checks that other executions can invalidate after a
    /// decision: the automation switch, the daily cap and the cooldown.
    ///
    /// Returns the reason the candidate may no longer run, if any. Nothing is
    /// logged.
    pub fn recheck_limits(
        &self,
        candidate: &StrategyCandidate,
    ) -> Result<Option<DecisionReason>, PolicyError> {
        let config = self.configs.get_config(&candidate.entity_name);
        if !config.auto_execution_enabled {
            return Ok(Some(DecisionReason::AutomationDisabled));
        }
        let history = self.log.entries_for(&candidate.entity_name)?;
        let rate = RateSnapshot::from_entries(&history, self.clock.now());
        if rate.cap_reached(config.max_daily_executions) {
            return Ok(Some(DecisionReason::DailyCapReached));
        }
        if rate
            .cooldown_remaining(config.cooldown_period_minutes)
            .is_some()
        {
            return Ok(Some(DecisionReason::CooldownActive));
        }
        Ok(None)
    }

    fn run_checks(
        &self,
        candidate: &StrategyCandidate,
        now: DateTime<Utc>,
        steps: &mut Vec<EvaluationStep>,
    ) -> Result<Verdict, PolicyError> {
        let mut step = |check: &str, outcome: String, terminal: bool| {
            steps.push(EvaluationStep {
                check: check.to_string(),
                outcome,
                terminal,
            });
        };
        let entity = candidate.entity_name.as_str();
        let config = self.configs.get_config(entity);

        // 1. Automation switch.
        if !config.auto_execution_enabled {
            step(
                "automation_enabled",
                format!("failed: disabled by '{}' config", config.entity_name),
                true,
            );
            return Ok(Verdict::reject(DecisionReason::AutomationDisabled));
        }
        step("automation_enabled", "passed".to_string(), false);

        // 2. Strategy family.
        if !config.allows(candidate.strategy_type) {
            step(
                "strategy_type",
                format!("failed: {} not allowed", candidate.strategy_type),
                true,
            );
            return Ok(Verdict::reject(DecisionReason::StrategyTypeNotPermitted));
        }
        step("strategy_type", "passed".to_string(), false);

        // 3-4. Rate limits from the entity's own history.
        let history = self.log.entries_for(entity)?;
        let rate = RateSnapshot::from_entries(&history, now);

        if rate.cap_reached(config.max_daily_executions) {
            step(
                "daily_cap",
                format!(
                    "failed: {} of {} executions today",
                    rate.executions_today, config.max_daily_executions
                ),
                true,
            );
            return Ok(Verdict::reject(DecisionReason::DailyCapReached));
        }
        step(
            "daily_cap",
            format!(
                "passed: {} of {} executions today",
                rate.executions_today, config.max_daily_executions
            ),
            false,
        );

        if let Some(remaining) = rate.cooldown_remaining(config.cooldown_period_minutes) {
            step(
                "cooldown",
                format!("failed: {}s remaining", remaining.num_seconds()),
                true,
            );
            return Ok(Verdict::reject(DecisionReason::CooldownActive));
        }
        step("cooldown", "passed".to_string(), false);

        // 5. Score. A scorer fault is treated as insufficient confidence.
        let prediction = match self.scorer.predict(candidate, entity) {
            Ok(prediction) => prediction,
            Err(e) => {
                tracing::warn!(
                    "scoring failed for strategy {} ({}), failing closed: {}",
                    candidate.id,
                    entity,
                    e
                );
                step("prediction", format!("failed: {}", e), true);
                return Ok(Verdict {
                    reason: DecisionReason::ConfidenceBelowThreshold,
                    prediction: None,
                    fault: Some(e.to_string()),
                });
            }
        };
        step(
            "prediction",
            format!(
                "p={:.3} confidence={:.3} samples={}",
                prediction.success_probability,
                prediction.confidence_score,
                prediction.sample_size
            ),
            false,
        );

        let thresholds = config.thresholds;
        let risk = candidate.risk_level.ordinal();
        let resource = candidate.resource_requirement.ordinal();
        let probability = (
            "success_probability",
            DecisionReason::SuccessProbabilityBelowThreshold,
            prediction.success_probability < thresholds.min_success_probability,
            format!(
                "{:.3} < {:.3}",
                prediction.success_probability, thresholds.min_success_probability
            ),
        );
        let confidence = (
            "confidence",
            DecisionReason::ConfidenceBelowThreshold,
            prediction.confidence_score < thresholds.min_confidence_score,
            format!(
                "{:.3} < {:.3}",
                prediction.confidence_score, thresholds.min_confidence_score
            ),
        );
        let risk_check = (
            "risk_level",
            DecisionReason::RiskExceedsThreshold,
            risk > thresholds.max_risk_level,
            format!("{:.1} > {:.1}", risk, thresholds.max_risk_level),
        );
        let resource_check = (
            "resource_requirement",
            DecisionReason::ResourceExceedsThreshold,
            resource > thresholds.max_resource_requirement,
            format!("{:.1} > {:.1}", resource, thresholds.max_resource_requirement),
        );

        // A cold-start probability is a placeholder, so an unproven entity
        // is judged on confidence first.
        let score_checks = if prediction.cold_start {
            [confidence, probability]
        } else {
            [probability, confidence]
        };
        let failed = score_checks
            .into_iter()
            .chain([risk_check, resource_check])
            .find(|(_, _, failed, _)| *failed)
            .map(|(check, reason, _, detail)| (check, reason, format!("failed: {}", detail)));

        let reason = match failed {
            Some((check, reason, outcome)) => {
                step(check, outcome, true);
                reason
            }
            None => {
                step("thresholds", "passed".to_string(), true);
                DecisionReason::AllThresholdsSatisfied
            }
        };

        Ok(Verdict {
            reason,
            prediction: Some(prediction),
            fault: None,
        })
    }
}
