// pattern.rs — Recurring threat patterns mined from an entity's execution history.
//
// A pattern is a (strategy type, primary platform) signature that the entity
// has executed at least twice. Patterns are a read model: they are rebuilt
// from the log on every call and never stored.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use aeg_audit::{ExecutionLogEntry, LogStore};
use aeg_strategy::{Level, StrategyType};
use serde::{Deserialize, Serialize};

use crate::error::PredictError;
use crate::scan::{self, DEFAULT_TIMEOUT};

/// Groups smaller than this are one-offs, not patterns.
pub const MIN_OCCURRENCES: usize = 2;

/// Saturating growth curve `n / (n + 3)` shared by pattern and prediction
/// confidence: 0 with no data, 0.5 at three samples, approaching 1.
pub fn saturate(n: usize) -> f64 {
    let n = n as f64;
    n / (n + 3.0)
}

/// A recurring strategy signature in an entity's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatPattern {
    /// Stable signature, `"<strategy_type>@<platform>"` (`any` when the
    /// strategies named no platform).
    pub id: String,
    pub pattern_type: String,
    pub strategy_type: StrategyType,
    pub platform: Option<String>,
    /// From the average priority severity of the grouped strategies.
    pub impact: Level,
    pub description: String,
    /// Group share of history, scaled by `saturate(group size)`.
    pub confidence: f64,
    pub occurrences: usize,
    /// Share of finished executions in the group that succeeded.
    pub success_rate: f64,
}

impl ThreatPattern {
    /// Whether a candidate with this type and these platforms fits the pattern.
    pub fn matches(&self, strategy_type: StrategyType, platforms: &[String]) -> bool {
        self.strategy_type == strategy_type
            && self
                .platform
                .as_ref()
                .map_or(true, |p| platforms.iter().any(|q| q == p))
    }
}

/// Mines [`ThreatPattern`]s from the execution log.
pub struct PatternAnalyzer {
    log: Arc<dyn LogStore>,
    timeout: Duration,
}

impl PatternAnalyzer {
    pub fn new(log: Arc<dyn LogStore>) -> Self {
        Self {
            log,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound the wall time of the history read.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Recompute the entity's patterns from its current history, strongest
    /// first.
    pub fn analyze_patterns(
        &self,
        entity_name: &str,
    ) -> Result<impl Iterator<Item = ThreatPattern>, PredictError> {
        let entries = scan::entries_within(&self.log, entity_name, self.timeout)?;
        let patterns = patterns_from_entries(&entries);
        tracing::debug!(
            "{} patterns across {} entries for {}",
            patterns.len(),
            entries.len(),
            entity_name
        );
        Ok(patterns.into_iter())
    }
}

#[derive(Default)]
struct Group {
    occurrences: usize,
    severity_total: f64,
    finished: usize,
    succeeded: usize,
}

/// Build patterns from already-projected entries. Only executed entries count.
///
/// Ordered by confidence (descending), then id.
pub fn patterns_from_entries(entries: &[ExecutionLogEntry]) -> Vec<ThreatPattern> {
    let mut groups: BTreeMap<(StrategyType, Option<String>), Group> = BTreeMap::new();
    let mut total = 0;

    for entry in entries.iter().filter(|e| e.is_executed()) {
        total += 1;
        let key = (
            entry.strategy.strategy_type,
            entry.strategy.platforms.first().cloned(),
        );
        let group = groups.entry(key).or_default();
        group.occurrences += 1;
        group.severity_total += entry.strategy.priority.severity();
        if let Some(outcome) = &entry.outcome {
            group.finished += 1;
            if outcome.success {
                group.succeeded += 1;
            }
        }
    }

    let mut patterns: Vec<ThreatPattern> = groups
        .into_iter()
        .filter(|(_, g)| g.occurrences >= MIN_OCCURRENCES)
        .map(|((strategy_type, platform), g)| {
            let signature = format!(
                "{}@{}",
                strategy_type,
                platform.as_deref().unwrap_or("any")
            );
            let success_rate = if g.finished == 0 {
                0.0
            } else {
                g.succeeded as f64 / g.finished as f64
            };
            let confidence =
                (g.occurrences as f64 / total as f64 * saturate(g.occurrences)).clamp(0.0, 1.0);
            ThreatPattern {
                id: signature.clone(),
                pattern_type: signature,
                strategy_type,
                impact: Level::from_score(g.severity_total / g.occurrences as f64),
                description: format!(
                    "{} strategies{} executed {} times, {:.0}% succeeded",
                    strategy_type,
                    platform
                        .as_deref()
                        .map(|p| format!(" on {}", p))
                        .unwrap_or_default(),
                    g.occurrences,
                    success_rate * 100.0
                ),
                platform,
                confidence,
                occurrences: g.occurrences,
                success_rate,
            }
        })
        .collect();

    patterns.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.id.cmp(&b.id))
    });
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeg_audit::{DecisionKind, LogRecord, MemoryExecutionLog, OutcomeSummary};
    use aeg_strategy::{Priority, StrategyAction, StrategyCandidate};
    use chrono::Utc;

    fn executed(
        log: &MemoryExecutionLog,
        candidate: &StrategyCandidate,
        success: bool,
    ) {
        let entry = aeg_audit::ExecutionLogEntry::new(
            candidate,
            DecisionKind::Admitted,
            "all thresholds satisfied",
            Utc::now(),
        );
        let (entry_id, strategy_id) = (entry.entry_id, entry.strategy_id);
        log.append(LogRecord::Decision(entry)).unwrap();
        log.append(LogRecord::ExecutionStarted {
            entry_id,
            strategy_id,
            entity_name: candidate.entity_name.clone(),
            executed_at: Utc::now(),
        })
        .unwrap();
        log.append(LogRecord::ExecutionFinished {
            entry_id,
            strategy_id,
            entity_name: candidate.entity_name.clone(),
            outcome: OutcomeSummary {
                success,
                executed_actions: candidate.actions.len(),
                details: String::new(),
            },
            finished_at: Utc::now(),
        })
        .unwrap();
    }

    fn on(platform: &str, strategy_type: StrategyType) -> StrategyCandidate {
        StrategyCandidate::new("AcmeCorp", strategy_type)
            .with_priority(Priority::High)
            .with_action(StrategyAction::new("respond", "1 hour").on_platform(platform))
    }

    #[test]
    fn saturate_shape() {
        assert_eq!(saturate(0), 0.0);
        assert_eq!(saturate(3), 0.5);
        assert!(saturate(100) < 1.0);
        assert!(saturate(10) > saturate(9));
    }

    #[test]
    fn empty_history_has_no_patterns() {
        let log = Arc::new(MemoryExecutionLog::new());
        let analyzer = PatternAnalyzer::new(log);
        assert_eq!(analyzer.analyze_patterns("AcmeCorp").unwrap().count(), 0);
    }

    #[test]
    fn single_occurrence_is_not_recurring() {
        let log = Arc::new(MemoryExecutionLog::new());
        executed(&log, &on("twitter", StrategyType::Defensive), true);
        executed(&log, &on("reddit", StrategyType::Defensive), true);
        let analyzer = PatternAnalyzer::new(log);
        assert_eq!(analyzer.analyze_patterns("AcmeCorp").unwrap().count(), 0);
    }

    #[test]
    fn groups_by_type_and_primary_platform() {
        let log = Arc::new(MemoryExecutionLog::new());
        for _ in 0..3 {
            executed(&log, &on("twitter", StrategyType::Defensive), true);
        }
        executed(&log, &on("twitter", StrategyType::Engagement), true);
        executed(&log, &on("twitter", StrategyType::Engagement), false);
        executed(&log, &on("reddit", StrategyType::Legal), true);

        let analyzer = PatternAnalyzer::new(log);
        let patterns: Vec<_> = analyzer.analyze_patterns("AcmeCorp").unwrap().collect();
        assert_eq!(patterns.len(), 2);

        let top = &patterns[0];
        assert_eq!(top.id, "defensive@twitter");
        assert_eq!(top.occurrences, 3);
        assert_eq!(top.impact, Level::High);
        assert_eq!(top.success_rate, 1.0);
        // 3 of 6 executions, saturate(3) = 0.5.
        assert!((top.confidence - 0.25).abs() < 1e-9);

        assert_eq!(patterns[1].id, "engagement@twitter");
        assert_eq!(patterns[1].success_rate, 0.5);
        assert!(patterns[1].confidence < top.confidence);
    }

    #[test]
    fn rejected_entries_are_ignored() {
        let log = Arc::new(MemoryExecutionLog::new());
        let candidate = on("twitter", StrategyType::Defensive);
        for _ in 0..4 {
            let entry = aeg_audit::ExecutionLogEntry::new(
                &candidate,
                DecisionKind::Rejected,
                "cooldown period active",
                Utc::now(),
            );
            log.append(LogRecord::Decision(entry)).unwrap();
        }
        let analyzer = PatternAnalyzer::new(log);
        assert_eq!(analyzer.analyze_patterns("AcmeCorp").unwrap().count(), 0);
    }

    struct SlowLog {
        inner: MemoryExecutionLog,
        delay: Duration,
    }

    impl LogStore for SlowLog {
        fn append(&self, record: LogRecord) -> Result<u64, aeg_audit::AuditError> {
            self.inner.append(record)
        }

        fn records(&self) -> Result<Vec<LogRecord>, aeg_audit::AuditError> {
            std::thread::sleep(self.delay);
            self.inner.records()
        }
    }

    #[test]
    fn slow_history_bounds_pattern_analysis() {
        let log = Arc::new(SlowLog {
            inner: MemoryExecutionLog::new(),
            delay: Duration::from_millis(400),
        });
        let analyzer = PatternAnalyzer::new(log).with_timeout(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let err = analyzer.analyze_patterns("AcmeCorp").err().unwrap();
        assert!(matches!(err, PredictError::Timeout { limit_ms: 20, .. }));
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[test]
    fn platformless_pattern_matches_any_platform() {
        let pattern = ThreatPattern {
            id: "legal@any".into(),
            pattern_type: "legal@any".into(),
            strategy_type: StrategyType::Legal,
            platform: None,
            impact: Level::Low,
            description: String::new(),
            confidence: 0.5,
            occurrences: 2,
            success_rate: 1.0,
        };
        assert!(pattern.matches(StrategyType::Legal, &["twitter".to_string()]));
        assert!(!pattern.matches(StrategyType::Defensive, &[]));
    }
}
