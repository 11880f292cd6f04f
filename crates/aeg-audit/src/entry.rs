// entry.rs — Execution log data model.
//
// The log is a totally ordered stream of LogRecords. A Decision record is
// written once per evaluation; ExecutionStarted / ExecutionFinished records
// reference it by entry_id. Each record is wrapped in a LogLine carrying its
// sequence number and the hash of the previous line.

use aeg_strategy::{Level, Priority, StrategyCandidate, StrategyType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether the evaluator allowed autonomous execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Admitted,
    Rejected,
}

/// The prediction an evaluation used, frozen at decision time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionSnapshot {
    pub success_probability: f64,
    pub confidence_score: f64,
    /// Ids of the threat patterns that contributed, strongest first.
    pub contributing_patterns: Vec<String>,
    /// Number of historical outcomes the prediction was based on.
    pub sample_size: usize,
    pub cold_start: bool,
}

/// Strategy metadata copied into the log so history can be analyzed
/// without the candidate store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategySnapshot {
    pub strategy_type: StrategyType,
    pub priority: Priority,
    pub risk_level: Level,
    pub resource_requirement: Level,
    pub estimated_effectiveness: u8,
    /// Distinct action platforms, in action order.
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl From<&StrategyCandidate> for StrategySnapshot {
    fn from(candidate: &StrategyCandidate) -> Self {
        Self {
            strategy_type: candidate.strategy_type,
            priority: candidate.priority,
            risk_level: candidate.risk_level,
            resource_requirement: candidate.resource_requirement,
            estimated_effectiveness: candidate.estimated_effectiveness,
            platforms: candidate.platforms(),
        }
    }
}

/// Result summary of an executed strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeSummary {
    pub success: bool,
    pub executed_actions: usize,
    pub details: String,
}

/// One audited evaluation.
///
/// `executed_at`, `outcome` and `finished_at` are always `None` when the entry is written;
/// they are filled in by [`crate::history::project`] from later records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionLogEntry {
    pub entry_id: Uuid,
    pub strategy_id: Uuid,
    pub entity_name: String,
    pub decision: DecisionKind,
    /// Business reason, e.g. "cooldown period active".
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_used: Option<PredictionSnapshot>,
    /// Underlying scorer/store fault, kept apart from `reason`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    pub strategy: StrategySnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionLogEntry {
    pub fn new(
        candidate: &StrategyCandidate,
        decision: DecisionKind,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            strategy_id: candidate.id,
            entity_name: candidate.entity_name.clone(),
            decision,
            reason: reason.into(),
            prediction_used: None,
            fault: None,
            strategy: StrategySnapshot::from(candidate),
            executed_at: None,
            outcome: None,
            finished_at: None,
            timestamp,
        }
    }

    pub fn with_prediction(mut self, prediction: PredictionSnapshot) -> Self {
        self.prediction_used = Some(prediction);
        self
    }

    pub fn with_fault(mut self, fault: impl Into<String>) -> Self {
        self.fault = Some(fault.into());
        self
    }

    pub fn is_admitted(&self) -> bool {
        self.decision == DecisionKind::Admitted
    }

    /// Admitted and handed to the executor.
    pub fn is_executed(&self) -> bool {
        self.is_admitted() && self.executed_at.is_some()
    }
}

/// A single record in the execution log stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogRecord {
    /// The evaluator's decision for one candidate.
    Decision(ExecutionLogEntry),

    /// The executor moved an admitted strategy to executing.
    ExecutionStarted {
        entry_id: Uuid,
        strategy_id: Uuid,
        entity_name: String,
        executed_at: DateTime<Utc>,
    },

    /// The delegated actions finished (successfully or not).
    ExecutionFinished {
        entry_id: Uuid,
        strategy_id: Uuid,
        entity_name: String,
        outcome: OutcomeSummary,
        finished_at: DateTime<Utc>,
    },
}

impl LogRecord {
    pub fn entity_name(&self) -> &str {
        match self {
            LogRecord::Decision(entry) => &entry.entity_name,
            LogRecord::ExecutionStarted { entity_name, .. } => entity_name,
            LogRecord::ExecutionFinished { entity_name, .. } => entity_name,
        }
    }

    pub fn entry_id(&self) -> Uuid {
        match self {
            LogRecord::Decision(entry) => entry.entry_id,
            LogRecord::ExecutionStarted { entry_id, .. } => *entry_id,
            LogRecord::ExecutionFinished { entry_id, .. } => *entry_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LogRecord::Decision(_) => "decision",
            LogRecord::ExecutionStarted { .. } => "execution_started",
            LogRecord::ExecutionFinished { .. } => "execution_finished",
        }
    }
}

/// One line of the JSONL log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    /// Position in the total order of the log, starting at 1.
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    /// Hash of the previous raw line; `None` for the first line.
    pub previous_hash: Option<String>,
    pub record: LogRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeg_strategy::StrategyAction;

    fn candidate() -> StrategyCandidate {
        StrategyCandidate::new("AcmeCorp", StrategyType::Defensive)
            .with_effectiveness(85)
            .with_risk(Level::Low)
            .with_action(StrategyAction::new("post", "1 hour").on_platform("twitter"))
    }

    #[test]
    fn new_entry_is_not_yet_executed() {
        let entry =
            ExecutionLogEntry::new(&candidate(), DecisionKind::Admitted, "ok", Utc::now());
        assert!(entry.is_admitted());
        assert!(!entry.is_executed());
        assert_eq!(entry.strategy.platforms, vec!["twitter"]);
    }

    #[test]
    fn record_serializes_with_kind_tag() {
        let entry =
            ExecutionLogEntry::new(&candidate(), DecisionKind::Rejected, "no", Utc::now())
                .with_fault("scan timed out");
        let json = serde_json::to_string(&LogRecord::Decision(entry)).unwrap();
        assert!(json.contains("\"kind\":\"decision\""));
        assert!(json.contains("\"decision\":\"rejected\""));
        assert!(json.contains("scan timed out"));
        // Unfilled projection fields are not written.
        assert!(!json.contains("executed_at"));
    }

    #[test]
    fn started_record_parses_back() {
        let record = LogRecord::ExecutionStarted {
            entry_id: Uuid::new_v4(),
            strategy_id: Uuid::new_v4(),
            entity_name: "AcmeCorp".to_string(),
            executed_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let restored: LogRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);
        assert_eq!(restored.kind(), "execution_started");
        assert_eq!(restored.entity_name(), "AcmeCorp");
    }
}
