// history.rs — Entry view over the record stream, plus dashboard counts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entry::{ExecutionLogEntry, LogRecord};

/// Fold a record stream into one entry per Decision record.
///
/// `ExecutionStarted` sets `executed_at`; `ExecutionFinished` sets `outcome`
/// and `finished_at`.
/// Follow-up records that reference an unknown entry are ignored. Entries
/// keep the order of their Decision records.
pub fn project(records: impl IntoIterator<Item = LogRecord>) -> Vec<ExecutionLogEntry> {
    let mut entries: Vec<ExecutionLogEntry> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for record in records {
        match record {
            LogRecord::Decision(entry) => {
                index.insert(entry.entry_id, entries.len());
                entries.push(entry);
            }
            LogRecord::ExecutionStarted {
                entry_id,
                executed_at,
                ..
            } => match index.get(&entry_id) {
                Some(&i) => entries[i].executed_at = Some(executed_at),
                None => tracing::warn!("execution_started for unknown entry {}", entry_id),
            },
            LogRecord::ExecutionFinished {
                entry_id,
                outcome,
                finished_at,
                ..
            } => match index.get(&entry_id) {
                Some(&i) => {
                    entries[i].outcome = Some(outcome);
                    entries[i].finished_at = Some(finished_at);
                }
                None => tracing::warn!("execution_finished for unknown entry {}", entry_id),
            },
        }
    }

    entries
}

/// Decision and execution counts for a set of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total_decisions: usize,
    pub admitted: usize,
    pub rejected: usize,
    /// Started but not yet finished.
    pub executing: usize,
    /// Finished successfully.
    pub completed: usize,
    /// Finished unsuccessfully.
    pub cancelled: usize,
}

impl ExecutionSummary {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a ExecutionLogEntry>) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            summary.total_decisions += 1;
            if !entry.is_admitted() {
                summary.rejected += 1;
                continue;
            }
            summary.admitted += 1;
            match (&entry.executed_at, &entry.outcome) {
                (_, Some(outcome)) if outcome.success => summary.completed += 1,
                (_, Some(_)) => summary.cancelled += 1,
                (Some(_), None) => summary.executing += 1,
                (None, None) => {}
            }
        }
        summary
    }

    /// Share of finished executions that succeeded, if any finished.
    pub fn success_rate(&self) -> Option<f64> {
        let finished = self.completed + self.cancelled;
        (finished > 0).then(|| self.completed as f64 / finished as f64)
    }
}
