// scorer.rs — Success probability and confidence for a strategy candidate.
//
// History is the entity's executed entries that have an outcome.
//
//   h    = (successes + 1) / (n + 2) over same-type history (0.5 with none)
//   p    = (0.6·h + 0.4·effectiveness) · (1 − 0.25·risk)
//   conf = 0.2 + 0.6·saturate(n) + 0.2·strongest aligned pattern
//
// With no history at all the scorer returns p = 0.5, conf = 0.2. p is linear
// in effectiveness with a positive weight, so a more effective candidate never
// scores lower than an otherwise identical one.
//
// Time to complete is the mean decision-to-finish time of successful
// same-type executions, falling back to a per-type estimate.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use aeg_audit::{ExecutionLogEntry, LogStore, PredictionSnapshot};
use aeg_strategy::{StrategyCandidate, StrategyType};
use serde::{Deserialize, Serialize};

use crate::error::PredictError;
use crate::pattern::{patterns_from_entries, saturate};
use crate::scan::{self, DEFAULT_TIMEOUT};

pub const COLD_START_PROBABILITY: f64 = 0.5;
pub const COLD_START_CONFIDENCE: f64 = 0.2;
/// Used when same-type history exists but none of it finished successfully.
pub const FALLBACK_HOURS: u32 = 8;

/// Coarse forecast derived from the weighted score of all inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictedOutcome {
    Success,
    Partial,
    Failure,
}

impl fmt::Display for PredictedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictedOutcome::Success => write!(f, "success"),
            PredictedOutcome::Partial => write!(f, "partial"),
            PredictedOutcome::Failure => write!(f, "failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub success_probability: f64,
    pub confidence_score: f64,
    /// Aligned pattern ids, strongest first.
    pub contributing_patterns: Vec<String>,
    pub sample_size: usize,
    pub cold_start: bool,
    pub predicted_outcome: PredictedOutcome,
    /// Expected hours from decision to finished execution.
    pub time_to_complete_hours: u32,
    pub recommendations: Vec<String>,
    /// Safer or cheaper approaches worth generating instead.
    pub alternatives: Vec<String>,
}

impl PredictionResult {
    /// The part of the prediction recorded in the execution log.
    pub fn snapshot(&self) -> PredictionSnapshot {
        PredictionSnapshot {
            success_probability: self.success_probability,
            confidence_score: self.confidence_score,
            contributing_patterns: self.contributing_patterns.clone(),
            sample_size: self.sample_size,
            cold_start: self.cold_start,
        }
    }
}

/// A candidate paired with its prediction, as returned by
/// [`PredictiveScorer::rank_candidates`].
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub candidate: StrategyCandidate,
    pub prediction: PredictionResult,
}

pub struct PredictiveScorer {
    log: Arc<dyn LogStore>,
    timeout: Duration,
}

impl PredictiveScorer {
    pub fn new(log: Arc<dyn LogStore>) -> Self {
        Self {
            log,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound the wall time of a single prediction.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Predict how well `candidate` will do for `entity_name`, given that
    /// entity's execution history.
    pub fn predict(
        &self,
        candidate: &StrategyCandidate,
        entity_name: &str,
    ) -> Result<PredictionResult, PredictError> {
        let started = Instant::now();
        let entries = scan::entries_within(&self.log, entity_name, self.timeout)?;

        let history: Vec<_> = entries
            .iter()
            .filter(|e| e.is_executed() && e.outcome.is_some())
            .collect();
        let n = history.len();

        if n == 0 {
            tracing::debug!("cold start for {} ({})", entity_name, candidate.id);
            return Ok(finish(
                candidate,
                COLD_START_PROBABILITY,
                COLD_START_CONFIDENCE,
                Vec::new(),
                &[],
                true,
            ));
        }

        let (same_type, successes) = history
            .iter()
            .filter(|e| e.strategy.strategy_type == candidate.strategy_type)
            .fold((0usize, 0usize), |(total, ok), e| {
                let success = e.outcome.as_ref().map_or(false, |o| o.success);
                (total + 1, ok + usize::from(success))
            });
        let historical_rate = if same_type == 0 {
            0.5
        } else {
            (successes as f64 + 1.0) / (same_type as f64 + 2.0)
        };

        let success_probability = clamp01(
            (0.6 * historical_rate + 0.4 * candidate.effectiveness_score())
                * (1.0 - 0.25 * candidate.risk_level.ordinal()),
        );

        let platforms = candidate.platforms();
        let aligned: Vec<_> = patterns_from_entries(&entries)
            .into_iter()
            .filter(|p| p.matches(candidate.strategy_type, &platforms))
            .collect();
        scan::check_deadline(started, self.timeout)?;

        let strongest = aligned.first().map_or(0.0, |p| p.confidence);
        let confidence = clamp01(0.2 + 0.6 * saturate(n) + 0.2 * strongest);

        Ok(finish(
            candidate,
            success_probability,
            confidence,
            aligned.into_iter().map(|p| p.id).collect(),
            &history,
            false,
        ))
    }

    /// Score every candidate against its own entity's history and return the
    /// best `limit`, highest success probability first.
    pub fn rank_candidates(
        &self,
        candidates: &[StrategyCandidate],
        limit: usize,
    ) -> Result<Vec<RankedCandidate>, PredictError> {
        let mut ranked = candidates
            .iter()
            .map(|c| {
                Ok(RankedCandidate {
                    prediction: self.predict(c, &c.entity_name)?,
                    candidate: c.clone(),
                })
            })
            .collect::<Result<Vec<_>, PredictError>>()?;
        ranked.sort_by(|a, b| {
            b.prediction
                .success_probability
                .total_cmp(&a.prediction.success_probability)
        });
        ranked.truncate(limit);
        Ok(ranked)
    }
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn finish(
    candidate: &StrategyCandidate,
    success_probability: f64,
    confidence_score: f64,
    contributing_patterns: Vec<String>,
    history: &[&ExecutionLogEntry],
    cold_start: bool,
) -> PredictionResult {
    let hours = time_to_complete_hours(candidate, history);
    PredictionResult {
        predicted_outcome: predicted_outcome(candidate, success_probability, confidence_score),
        time_to_complete_hours: hours,
        recommendations: recommendations(candidate, success_probability, hours),
        alternatives: alternatives(candidate, success_probability),
        success_probability,
        confidence_score,
        contributing_patterns,
        sample_size: history.len(),
        cold_start,
    }
}

/// Planning estimate for a strategy type with no history.
pub fn estimated_hours(strategy_type: StrategyType) -> u32 {
    match strategy_type {
        StrategyType::Defensive => 4,
        StrategyType::Proactive => 8,
        StrategyType::CounterNarrative => 6,
        StrategyType::Legal => 24,
        StrategyType::Engagement => 12,
    }
}

/// Mean hours from decision to finish over successful same-type executions,
/// rounded to the nearest hour.
pub fn time_to_complete_hours(
    candidate: &StrategyCandidate,
    history: &[&ExecutionLogEntry],
) -> u32 {
    let same_type: Vec<_> = history
        .iter()
        .filter(|e| e.strategy.strategy_type == candidate.strategy_type)
        .collect();
    if same_type.is_empty() {
        return estimated_hours(candidate.strategy_type);
    }

    let durations: Vec<f64> = same_type
        .iter()
        .filter(|e| e.outcome.as_ref().map_or(false, |o| o.success))
        .filter_map(|e| e.finished_at.map(|at| at - e.timestamp))
        .map(|d| d.num_seconds().max(0) as f64 / 3600.0)
        .collect();
    if durations.is_empty() {
        return FALLBACK_HOURS;
    }
    (durations.iter().sum::<f64>() / durations.len() as f64).round() as u32
}

/// Weighted forecast: 0.4·p + 0.3·(1 − risk) + 0.2·(1 − resource) + 0.1·confidence.
pub fn predicted_outcome(
    candidate: &StrategyCandidate,
    success_probability: f64,
    confidence_score: f64,
) -> PredictedOutcome {
    let score = 0.4 * success_probability
        + 0.3 * (1.0 - candidate.risk_level.ordinal())
        + 0.2 * (1.0 - candidate.resource_requirement.ordinal())
        + 0.1 * confidence_score;
    if score >= 0.75 {
        PredictedOutcome::Success
    } else if score >= 0.5 {
        PredictedOutcome::Partial
    } else {
        PredictedOutcome::Failure
    }
}

/// Operator-facing advice for a scored candidate.
pub fn recommendations(
    candidate: &StrategyCandidate,
    success_probability: f64,
    time_to_complete_hours: u32,
) -> Vec<String> {
    let mut out = Vec::new();
    if success_probability < 0.6 {
        out.push("Consider strategy optimization before execution".to_string());
        out.push("Review historical similar cases for improvements".to_string());
    }
    // `high` maps to 0.8, the top of the scale.
    if candidate.resource_requirement.ordinal() >= 0.8 {
        out.push("Ensure adequate resource allocation".to_string());
        out.push("Consider breaking into smaller phases".to_string());
    }
    if candidate.risk_level.ordinal() > 0.7 {
        out.push("Implement additional risk mitigation measures".to_string());
        out.push("Consider legal review before execution".to_string());
    }
    if time_to_complete_hours > 12 {
        out.push("Set intermediate milestones for tracking".to_string());
        out.push("Consider parallel execution of actions".to_string());
    }
    if out.is_empty() {
        out.push("Strategy shows good success indicators".to_string());
        out.push("Proceed with standard execution protocols".to_string());
    }
    out
}

/// Approaches to generate instead when the candidate is weak, risky or costly.
pub fn alternatives(candidate: &StrategyCandidate, success_probability: f64) -> Vec<String> {
    let mut out = Vec::new();
    if success_probability < 0.5 {
        out.push("Defensive monitoring approach".to_string());
        out.push("Gradual engagement strategy".to_string());
    }
    if candidate.risk_level.ordinal() >= 0.8 {
        out.push("Low-risk monitoring only".to_string());
        out.push("Third-party mediated approach".to_string());
    }
    if candidate.resource_requirement.ordinal() >= 0.8 {
        out.push("Simplified action plan".to_string());
        out.push("Automated response deployment".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeg_audit::{
        AuditError, DecisionKind, ExecutionLogEntry, LogRecord, MemoryExecutionLog,
        OutcomeSummary,
    };
    use aeg_strategy::{Level, StrategyAction, StrategyType};
    use chrono::Utc;

    fn record_execution(log: &MemoryExecutionLog, candidate: &StrategyCandidate, success: bool) {
        let entry = ExecutionLogEntry::new(
            candidate,
            DecisionKind::Admitted,
            "all thresholds satisfied",
            Utc::now(),
        );
        let (entry_id, strategy_id) = (entry.entry_id, entry.strategy_id);
        let entity_name = candidate.entity_name.clone();
        log.append(LogRecord::Decision(entry)).unwrap();
        log.append(LogRecord::ExecutionStarted {
            entry_id,
            strategy_id,
            entity_name: entity_name.clone(),
            executed_at: Utc::now(),
        })
        .unwrap();
        log.append(LogRecord::ExecutionFinished {
            entry_id,
            strategy_id,
            entity_name,
            outcome: OutcomeSummary {
                success,
                executed_actions: 1,
                details: String::new(),
            },
            finished_at: Utc::now(),
        })
        .unwrap();
    }

    fn defensive(effectiveness: u8) -> StrategyCandidate {
        StrategyCandidate::new("AcmeCorp", StrategyType::Defensive)
            .with_effectiveness(effectiveness)
            .with_risk(Level::Low)
            .with_resource_requirement(Level::Low)
    }

    #[test]
    fn cold_start_is_low_confidence() {
        let scorer = PredictiveScorer::new(Arc::new(MemoryExecutionLog::new()));
        let result = scorer.predict(&defensive(85), "AcmeCorp").unwrap();
        assert!(result.cold_start);
        assert_eq!(result.success_probability, COLD_START_PROBABILITY);
        assert!(result.confidence_score <= 0.3);
        assert_eq!(result.sample_size, 0);
        assert!(result.contributing_patterns.is_empty());
    }

    #[test]
    fn ten_successes_lift_both_scores() {
        let log = Arc::new(MemoryExecutionLog::new());
        for _ in 0..10 {
            record_execution(&log, &defensive(90), true);
        }
        let scorer = PredictiveScorer::new(log);
        let result = scorer.predict(&defensive(85), "AcmeCorp").unwrap();

        assert!(!result.cold_start);
        assert_eq!(result.sample_size, 10);
        // h = 11/12, p = (0.55 + 0.34) · 0.95
        assert!((result.success_probability - 0.8455).abs() < 1e-3);
        assert!(result.confidence_score > 0.8);
        assert_eq!(result.contributing_patterns, vec!["defensive@any"]);
        assert_eq!(result.predicted_outcome, PredictedOutcome::Success);
    }

    #[test]
    fn success_probability_is_monotone_in_effectiveness() {
        let log = Arc::new(MemoryExecutionLog::new());
        record_execution(&log, &defensive(70), true);
        record_execution(&log, &defensive(70), false);
        record_execution(&log, &defensive(70), true);
        let scorer = PredictiveScorer::new(log);

        let mut previous = 0.0;
        for effectiveness in (0..=100).step_by(5) {
            let p = scorer
                .predict(&defensive(effectiveness), "AcmeCorp")
                .unwrap()
                .success_probability;
            assert!(p >= previous, "p dropped at effectiveness {}", effectiveness);
            previous = p;
        }
    }

    #[test]
    fn other_entities_do_not_leak_into_history() {
        let log = Arc::new(MemoryExecutionLog::new());
        let other = StrategyCandidate::new("Globex", StrategyType::Defensive);
        for _ in 0..5 {
            record_execution(&log, &other, true);
        }
        let scorer = PredictiveScorer::new(log);
        assert!(scorer.predict(&defensive(85), "AcmeCorp").unwrap().cold_start);
    }

    #[test]
    fn pattern_on_other_platform_does_not_align() {
        let log = Arc::new(MemoryExecutionLog::new());
        let on_reddit = defensive(80)
            .with_action(StrategyAction::new("respond", "1 hour").on_platform("reddit"));
        for _ in 0..3 {
            record_execution(&log, &on_reddit, true);
        }
        let scorer = PredictiveScorer::new(log);
        let on_twitter = defensive(80)
            .with_action(StrategyAction::new("respond", "1 hour").on_platform("twitter"));
        let result = scorer.predict(&on_twitter, "AcmeCorp").unwrap();
        assert!(result.contributing_patterns.is_empty());
        // 0.2 + 0.6 · saturate(3)
        assert!((result.confidence_score - 0.5).abs() < 1e-9);
    }

    struct SlowLog {
        inner: MemoryExecutionLog,
        delay: Duration,
    }

    impl LogStore for SlowLog {
        fn append(&self, record: LogRecord) -> Result<u64, AuditError> {
            self.inner.append(record)
        }

        fn records(&self) -> Result<Vec<LogRecord>, AuditError> {
            std::thread::sleep(self.delay);
            self.inner.records()
        }
    }

    struct BrokenLog;

    impl LogStore for BrokenLog {
        fn append(&self, _record: LogRecord) -> Result<u64, AuditError> {
            Err(AuditError::Unavailable("disk detached".into()))
        }

        fn records(&self) -> Result<Vec<LogRecord>, AuditError> {
            Err(AuditError::Unavailable("disk detached".into()))
        }
    }

    #[test]
    fn slow_history_scan_times_out_without_waiting_for_the_store() {
        let log = Arc::new(SlowLog {
            inner: MemoryExecutionLog::new(),
            delay: Duration::from_millis(400),
        });
        let scorer = PredictiveScorer::new(log).with_timeout(Duration::from_millis(20));
        let started = Instant::now();
        let err = scorer.predict(&defensive(85), "AcmeCorp").unwrap_err();
        assert!(matches!(err, PredictError::Timeout { limit_ms: 20, .. }));
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[test]
    fn store_failure_surfaces_as_store_error() {
        let scorer = PredictiveScorer::new(Arc::new(BrokenLog));
        let err = scorer.predict(&defensive(85), "AcmeCorp").unwrap_err();
        assert!(matches!(err, PredictError::Store(_)));
    }

    #[test]
    fn recommendations_follow_risk_and_resources() {
        let risky = StrategyCandidate::new("AcmeCorp", StrategyType::Legal)
            .with_risk(Level::High)
            .with_resource_requirement(Level::High);
        let advice = recommendations(&risky, 0.4, 24);
        assert_eq!(advice.len(), 8);
        assert!(advice.contains(&"Consider legal review before execution".to_string()));
        assert!(advice.contains(&"Set intermediate milestones for tracking".to_string()));

        let advice = recommendations(&defensive(90), 0.9, 4);
        assert_eq!(
            advice,
            vec![
                "Strategy shows good success indicators",
                "Proceed with standard execution protocols"
            ]
        );
    }

    #[test]
    fn alternatives_offered_for_weak_risky_or_costly_candidates() {
        let risky = StrategyCandidate::new("AcmeCorp", StrategyType::Legal)
            .with_risk(Level::High)
            .with_resource_requirement(Level::High);
        assert_eq!(
            alternatives(&risky, 0.3),
            vec![
                "Defensive monitoring approach",
                "Gradual engagement strategy",
                "Low-risk monitoring only",
                "Third-party mediated approach",
                "Simplified action plan",
                "Automated response deployment",
            ]
        );
        assert!(alternatives(&defensive(90), 0.9).is_empty());
    }

    #[test]
    fn cold_start_uses_the_type_estimate_for_duration() {
        let scorer = PredictiveScorer::new(Arc::new(MemoryExecutionLog::new()));
        let legal = StrategyCandidate::new("AcmeCorp", StrategyType::Legal);
        let result = scorer.predict(&legal, "AcmeCorp").unwrap();
        assert_eq!(result.time_to_complete_hours, 24);
        assert!(result
            .recommendations
            .contains(&"Consider parallel execution of actions".to_string()));

        let result = scorer.predict(&defensive(85), "AcmeCorp").unwrap();
        assert_eq!(result.time_to_complete_hours, 4);
    }

    fn finished_after(
        candidate: &StrategyCandidate,
        hours: i64,
        success: bool,
    ) -> ExecutionLogEntry {
        let decided = Utc::now() - chrono::Duration::days(1);
        let mut entry =
            ExecutionLogEntry::new(candidate, DecisionKind::Admitted, "admitted", decided);
        entry.executed_at = Some(decided);
        entry.outcome = Some(OutcomeSummary {
            success,
            executed_actions: 1,
            details: String::new(),
        });
        entry.finished_at = Some(decided + chrono::Duration::hours(hours));
        entry
    }

    #[test]
    fn duration_averages_successful_same_type_runs() {
        let candidate = defensive(80);
        let legal = StrategyCandidate::new("AcmeCorp", StrategyType::Legal);
        let entries = vec![
            finished_after(&candidate, 6, true),
            finished_after(&candidate, 11, true),
            finished_after(&candidate, 40, false),
            finished_after(&legal, 72, true),
        ];
        let history: Vec<_> = entries.iter().collect();
        // (6 + 11) / 2 rounds to 9.
        assert_eq!(time_to_complete_hours(&candidate, &history), 9);

        let failed_only = vec![finished_after(&candidate, 3, false)];
        let history: Vec<_> = failed_only.iter().collect();
        assert_eq!(time_to_complete_hours(&candidate, &history), FALLBACK_HOURS);
    }

    #[test]
    fn rank_orders_by_success_probability() {
        let log = Arc::new(MemoryExecutionLog::new());
        record_execution(&log, &defensive(80), true);
        let scorer = PredictiveScorer::new(log);

        let weak = defensive(10).with_title("weak");
        let strong = defensive(95).with_title("strong");
        let middling = defensive(50).with_title("middling");
        let ranked = scorer
            .rank_candidates(&[weak, strong, middling], 2)
            .unwrap();

        let titles: Vec<_> = ranked.iter().map(|r| r.candidate.title.as_str()).collect();
        assert_eq!(titles, vec!["strong", "middling"]);
    }
}
