// log.rs — Append-only JSONL execution log.
//
// One LogLine per line. Each line carries a sequence number and the SHA-256
// hash of the previous raw line, forming a chain: inserting, deleting, or
// editing a line is detected by `verify_chain`.
//
// Several handles (threads, CLI invocations, a long-running service) may share
// one file. Appends hold an exclusive advisory lock on the file and reads a
// shared one; under either lock a handle first replays whatever other handles
// appended since its last look, so sequence numbers and hashes always chain
// off the true tail of the file.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use fs2::FileExt;

use crate::clock::{Clock, SystemClock};
use crate::entry::{LogLine, LogRecord};
use crate::error::AuditError;
use crate::hasher;
use crate::store::{IndexedRecords, LogStore};

struct LogState {
    file: File,
    /// Bytes of the file already replayed into `records`.
    offset: u64,
    /// Hash of the last line in the file. Becomes `previous_hash` of the next.
    last_hash: Option<String>,
    last_sequence: u64,
    records: IndexedRecords,
}

impl LogState {
    /// Replay complete lines written past `offset`, by this handle or another.
    ///
    /// Must be called with the file lock held.
    fn catch_up(&mut self) -> Result<(), AuditError> {
        if self.file.metadata()?.len() <= self.offset {
            return Ok(());
        }
        self.file.seek(SeekFrom::Start(self.offset))?;
        let mut reader = BufReader::new(&self.file);
        let mut raw = String::new();
        loop {
            raw.clear();
            let read = reader.read_line(&mut raw)?;
            // A trailing line without its newline is an interrupted write.
            if read == 0 || !raw.ends_with('\n') {
                break;
            }
            self.offset += read as u64;
            let line = raw.trim_end_matches(&['\n', '\r'][..]);
            if line.trim().is_empty() {
                continue;
            }
            let parsed: LogLine = serde_json::from_str(line)?;
            self.last_hash = Some(hasher::hash_str(line));
            self.last_sequence = parsed.sequence;
            self.records.push(parsed.record);
        }
        Ok(())
    }
}

/// An append-only execution log backed by a JSONL file.
pub struct JsonlExecutionLog {
    path: PathBuf,
    state: Mutex<LogState>,
    clock: Arc<dyn Clock>,
}

impl JsonlExecutionLog {
    /// Open (or create) a log at the given path.
    ///
    /// Existing lines are loaded so the chain and sequence continue where
    /// they left off.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        path: impl AsRef<Path>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| AuditError::OpenFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Append mode; existing data is never overwritten.
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        let log = Self {
            path,
            state: Mutex::new(LogState {
                file,
                offset: 0,
                last_hash: None,
                last_sequence: 0,
                records: IndexedRecords::default(),
            }),
            clock,
        };
        let loaded = log.read_locked(|records| records.len())?;

        tracing::debug!(
            "opened execution log {} ({} records)",
            log.path.display(),
            loaded
        );

        Ok(log)
    }

    /// Read every line of a log file, oldest first. Skips blank lines.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<LogLine>, AuditError> {
        Ok(Self::read_raw(path.as_ref())?
            .into_iter()
            .map(|(_, line)| line)
            .collect())
    }

    /// Verify the hash chain and sequence numbering of a log file.
    ///
    /// Returns the number of lines verified, or the first violation found.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<usize, AuditError> {
        let mut previous_hash: Option<String> = None;
        let mut expected_sequence = 1;
        let mut verified = 0;

        for (index, (raw, line)) in Self::read_raw(path.as_ref())?.into_iter().enumerate() {
            if line.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    line: index + 1,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: line.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }
            if line.sequence != expected_sequence {
                return Err(AuditError::SequenceGap {
                    line: index + 1,
                    expected: expected_sequence,
                    actual: line.sequence,
                });
            }
            previous_hash = Some(hasher::hash_str(&raw));
            expected_sequence += 1;
            verified += 1;
        }

        Ok(verified)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Bring the in-memory copy up to the file's tail under a shared lock,
    /// then read from it.
    fn read_locked<T>(&self, read: impl FnOnce(&IndexedRecords) -> T) -> Result<T, AuditError> {
        let mut state = self.lock();
        FileExt::lock_shared(&state.file)?;
        let caught_up = state.catch_up();
        FileExt::unlock(&state.file)?;
        caught_up?;
        Ok(read(&state.records))
    }

    fn append_locked(&self, state: &mut LogState, record: LogRecord) -> Result<u64, AuditError> {
        state.catch_up()?;
        let len = state.file.metadata()?.len();
        if len != state.offset {
            return Err(AuditError::Unavailable(format!(
                "{} ends in a partial line at byte {}",
                self.path.display(),
                state.offset
            )));
        }

        let line = LogLine {
            sequence: state.last_sequence + 1,
            recorded_at: self.clock.now(),
            previous_hash: state.last_hash.clone(),
            record,
        };
        let json = serde_json::to_string(&line)?;
        let mut bytes = Vec::with_capacity(json.len() + 1);
        bytes.extend_from_slice(json.as_bytes());
        bytes.push(b'\n');
        state.file.write_all(&bytes)?;
        state.file.flush()?;

        state.offset += bytes.len() as u64;
        state.last_hash = Some(hasher::hash_str(&json));
        state.last_sequence = line.sequence;
        state.records.push(line.record);
        Ok(state.last_sequence)
    }

    fn read_raw(path: &Path) -> Result<Vec<(String, LogLine)>, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: LogLine = serde_json::from_str(&line)?;
            lines.push((line, parsed));
        }
        Ok(lines)
    }
}

impl LogStore for JsonlExecutionLog {
    fn append(&self, record: LogRecord) -> Result<u64, AuditError> {
        let mut state = self.lock();
        FileExt::lock_exclusive(&state.file)?;
        let appended = self.append_locked(&mut state, record);
        let unlocked = FileExt::unlock(&state.file);
        let sequence = appended?;
        unlocked?;
        Ok(sequence)
    }

    fn records(&self) -> Result<Vec<LogRecord>, AuditError> {
        self.read_locked(IndexedRecords::all)
    }

    fn records_for(&self, entity_name: &str) -> Result<Vec<LogRecord>, AuditError> {
        self.read_locked(|records| records.for_entity(entity_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{DecisionKind, ExecutionLogEntry};
    use aeg_strategy::{StrategyCandidate, StrategyType};
    use chrono::Utc;
    use tempfile::tempdir;

    fn decision(entity: &str) -> LogRecord {
        let candidate = StrategyCandidate::new(entity, StrategyType::Engagement);
        LogRecord::Decision(ExecutionLogEntry::new(
            &candidate,
            DecisionKind::Rejected,
            "automation disabled for entity",
            Utc::now(),
        ))
    }

    #[test]
    fn append_and_read_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("execution.jsonl");

        {
            let log = JsonlExecutionLog::open(&path).unwrap();
            log.append(decision("AcmeCorp")).unwrap();
            log.append(decision("Globex")).unwrap();
        }

        let lines = JsonlExecutionLog::read_all(&path).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].sequence, 1);
        assert!(lines[0].previous_hash.is_none());
        assert_eq!(lines[1].record.entity_name(), "Globex");
    }

    #[test]
    fn appended_records_are_immediately_readable() {
        let dir = tempdir().unwrap();
        let log = JsonlExecutionLog::open(dir.path().join("execution.jsonl")).unwrap();
        log.append(decision("AcmeCorp")).unwrap();
        assert_eq!(log.entries_for("AcmeCorp").unwrap().len(), 1);
    }

    #[test]
    fn hash_chain_is_valid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("execution.jsonl");
        {
            let log = JsonlExecutionLog::open(&path).unwrap();
            for i in 0..5 {
                log.append(decision(&format!("entity-{}", i))).unwrap();
            }
        }
        assert_eq!(JsonlExecutionLog::verify_chain(&path).unwrap(), 5);
    }

    #[test]
    fn reopen_continues_chain_and_sequence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("execution.jsonl");
        {
            let log = JsonlExecutionLog::open(&path).unwrap();
            log.append(decision("AcmeCorp")).unwrap();
        }
        {
            let log = JsonlExecutionLog::open(&path).unwrap();
            assert_eq!(log.records().unwrap().len(), 1);
            assert_eq!(log.append(decision("AcmeCorp")).unwrap(), 2);
        }
        assert_eq!(JsonlExecutionLog::verify_chain(&path).unwrap(), 2);
    }

    #[test]
    fn edited_line_breaks_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("execution.jsonl");
        {
            let log = JsonlExecutionLog::open(&path).unwrap();
            for _ in 0..3 {
                log.append(decision("AcmeCorp")).unwrap();
            }
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let tampered = content.replacen("AcmeCorp", "Globex", 1);
        std::fs::write(&path, tampered).unwrap();

        let result = JsonlExecutionLog::verify_chain(&path);
        assert!(matches!(
            result,
            Err(AuditError::IntegrityViolation { line: 2, .. })
        ));
    }

    #[test]
    fn deleted_first_line_is_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("execution.jsonl");
        {
            let log = JsonlExecutionLog::open(&path).unwrap();
            for _ in 0..3 {
                log.append(decision("AcmeCorp")).unwrap();
            }
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let remaining: Vec<&str> = content.lines().skip(1).collect();
        std::fs::write(&path, remaining.join("\n")).unwrap();

        assert!(JsonlExecutionLog::verify_chain(&path).is_err());
    }

    #[test]
    fn handles_sharing_a_file_chain_off_each_other() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("execution.jsonl");
        let service = JsonlExecutionLog::open(&path).unwrap();
        let cli = JsonlExecutionLog::open(&path).unwrap();

        assert_eq!(service.append(decision("AcmeCorp")).unwrap(), 1);
        assert_eq!(cli.append(decision("AcmeCorp")).unwrap(), 2);
        assert_eq!(service.append(decision("Globex")).unwrap(), 3);

        assert_eq!(JsonlExecutionLog::verify_chain(&path).unwrap(), 3);
        assert_eq!(service.entries_for("AcmeCorp").unwrap().len(), 2);
        assert_eq!(cli.records().unwrap().len(), 3);
        assert_eq!(cli.records_for("Globex").unwrap().len(), 1);
    }

    #[test]
    fn concurrent_handles_never_fork_the_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("execution.jsonl");
        let handles: Vec<_> = (0..4)
            .map(|_| JsonlExecutionLog::open(&path).unwrap())
            .collect();

        std::thread::scope(|s| {
            for log in &handles {
                s.spawn(move || {
                    for _ in 0..5 {
                        log.append(decision("AcmeCorp")).unwrap();
                    }
                });
            }
        });

        assert_eq!(JsonlExecutionLog::verify_chain(&path).unwrap(), 20);
    }

    #[test]
    fn partial_trailing_line_blocks_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("execution.jsonl");
        let log = JsonlExecutionLog::open(&path).unwrap();
        log.append(decision("AcmeCorp")).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"sequence\":2").unwrap();

        let err = log.append(decision("AcmeCorp")).unwrap_err();
        assert!(matches!(err, AuditError::Unavailable(_)));
        assert_eq!(log.records().unwrap().len(), 1);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".aeg").join("execution.jsonl");
        let log = JsonlExecutionLog::open(&path).unwrap();
        log.append(decision("AcmeCorp")).unwrap();
        assert!(path.exists());
    }
}
