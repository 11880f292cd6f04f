// store.rs — The LogStore seam and an in-memory backend.
//
// The gate treats the execution log as a transactional backend partitioned by
// entity name. Implementations must append records in a single total order
// and make every append visible to the next read (read-your-writes).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::entry::{ExecutionLogEntry, LogRecord};
use crate::error::AuditError;
use crate::history;

/// Append-only storage for execution log records.
pub trait LogStore: Send + Sync {
    /// Append a record. Returns the record's sequence number.
    fn append(&self, record: LogRecord) -> Result<u64, AuditError>;

    /// All records, in append order.
    fn records(&self) -> Result<Vec<LogRecord>, AuditError>;

    /// All records for one entity, in append order.
    fn records_for(&self, entity_name: &str) -> Result<Vec<LogRecord>, AuditError> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.entity_name() == entity_name)
            .collect())
    }

    /// Decision entries for one entity with execution records folded in.
    fn entries_for(&self, entity_name: &str) -> Result<Vec<ExecutionLogEntry>, AuditError> {
        Ok(history::project(self.records_for(entity_name)?))
    }

    /// Decision entries for every entity.
    fn entries(&self) -> Result<Vec<ExecutionLogEntry>, AuditError> {
        Ok(history::project(self.records()?))
    }
}

/// Records in append order, with the positions of each entity's records.
///
/// Lets `records_for` copy one entity's partition instead of the whole log.
#[derive(Debug, Default, Clone)]
pub(crate) struct IndexedRecords {
    records: Vec<LogRecord>,
    by_entity: HashMap<String, Vec<usize>>,
}

impl IndexedRecords {
    pub(crate) fn push(&mut self, record: LogRecord) {
        let position = self.records.len();
        self.by_entity
            .entry(record.entity_name().to_string())
            .or_default()
            .push(position);
        self.records.push(record);
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn all(&self) -> Vec<LogRecord> {
        self.records.clone()
    }

    pub(crate) fn for_entity(&self, entity_name: &str) -> Vec<LogRecord> {
        self.by_entity
            .get(entity_name)
            .map(|positions| positions.iter().map(|&i| self.records[i].clone()).collect())
            .unwrap_or_default()
    }
}

/// Volatile log kept in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryExecutionLog {
    records: Mutex<IndexedRecords>,
}

impl MemoryExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, IndexedRecords> {
        self.records.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl LogStore for MemoryExecutionLog {
    fn append(&self, record: LogRecord) -> Result<u64, AuditError> {
        let mut records = self.lock();
        records.push(record);
        Ok(records.len() as u64)
    }

    fn records(&self) -> Result<Vec<LogRecord>, AuditError> {
        Ok(self.lock().all())
    }

    fn records_for(&self, entity_name: &str) -> Result<Vec<LogRecord>, AuditError> {
        Ok(self.lock().for_entity(entity_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::DecisionKind;
    use aeg_strategy::{StrategyCandidate, StrategyType};
    use chrono::Utc;

    fn decision(entity: &str, kind: DecisionKind) -> LogRecord {
        let candidate = StrategyCandidate::new(entity, StrategyType::Defensive);
        LogRecord::Decision(ExecutionLogEntry::new(&candidate, kind, "test", Utc::now()))
    }

    #[test]
    fn sequence_numbers_increase() {
        let log = MemoryExecutionLog::new();
        assert_eq!(log.append(decision("a", DecisionKind::Rejected)).unwrap(), 1);
        assert_eq!(log.append(decision("b", DecisionKind::Rejected)).unwrap(), 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn records_for_partitions_by_entity() {
        let log = MemoryExecutionLog::new();
        log.append(decision("AcmeCorp", DecisionKind::Admitted)).unwrap();
        log.append(decision("Globex", DecisionKind::Rejected)).unwrap();
        log.append(decision("AcmeCorp", DecisionKind::Rejected)).unwrap();

        let acme = log.records_for("AcmeCorp").unwrap();
        assert_eq!(acme.len(), 2);
        assert!(acme.iter().all(|r| r.entity_name() == "AcmeCorp"));
        assert_eq!(log.entries_for("Globex").unwrap().len(), 1);
        assert!(log.entries_for("Initech").unwrap().is_empty());
        assert_eq!(log.records().unwrap().len(), 3);
    }

    #[test]
    fn entity_partition_keeps_append_order() {
        let mut index = IndexedRecords::default();
        let first = decision("AcmeCorp", DecisionKind::Admitted);
        let second = decision("AcmeCorp", DecisionKind::Rejected);
        index.push(first.clone());
        index.push(decision("Globex", DecisionKind::Rejected));
        index.push(second.clone());

        assert_eq!(index.for_entity("AcmeCorp"), vec![first, second]);
        assert_eq!(index.for_entity("Globex").len(), 1);
        assert!(index.for_entity("Initech").is_empty());
    }
}
