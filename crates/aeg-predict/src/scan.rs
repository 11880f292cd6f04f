// scan.rs — History reads bounded by a wall-clock limit.
//
// The read runs on a worker thread and the caller waits at most `limit` for
// it. A read that overruns is abandoned: the worker finishes on its own and
// its result is dropped with the channel.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use aeg_audit::{AuditError, ExecutionLogEntry, LogStore};

use crate::error::PredictError;

/// Default bound on one prediction or pattern analysis.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Read an entity's entries, giving up after `limit`.
pub(crate) fn entries_within(
    log: &Arc<dyn LogStore>,
    entity_name: &str,
    limit: Duration,
) -> Result<Vec<ExecutionLogEntry>, PredictError> {
    let started = Instant::now();
    let (tx, rx) = mpsc::channel();
    let log = Arc::clone(log);
    let entity = entity_name.to_string();

    thread::Builder::new()
        .name("aeg-history-scan".to_string())
        .spawn(move || {
            // The receiver is gone once the caller has timed out.
            let _ = tx.send(log.entries_for(&entity));
        })
        .map_err(|e| {
            PredictError::Store(AuditError::Unavailable(format!(
                "could not start history scan: {}",
                e
            )))
        })?;

    match rx.recv_timeout(limit) {
        Ok(entries) => Ok(entries?),
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!(
                "history scan for {} abandoned after {}ms",
                entity_name,
                limit.as_millis()
            );
            Err(timed_out(started, limit))
        }
        Err(RecvTimeoutError::Disconnected) => Err(PredictError::Store(
            AuditError::Unavailable("history scan worker panicked".to_string()),
        )),
    }
}

/// Fail if more than `limit` has passed since `started`.
pub(crate) fn check_deadline(started: Instant, limit: Duration) -> Result<(), PredictError> {
    if started.elapsed() > limit {
        return Err(timed_out(started, limit));
    }
    Ok(())
}

fn timed_out(started: Instant, limit: Duration) -> PredictError {
    PredictError::Timeout {
        elapsed_ms: started.elapsed().as_millis() as u64,
        limit_ms: limit.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeg_audit::{LogRecord, MemoryExecutionLog};

    struct StalledLog {
        delay: Duration,
    }

    impl LogStore for StalledLog {
        fn append(&self, _record: LogRecord) -> Result<u64, AuditError> {
            Ok(0)
        }

        fn records(&self) -> Result<Vec<LogRecord>, AuditError> {
            thread::sleep(self.delay);
            Ok(Vec::new())
        }
    }

    #[test]
    fn stalled_read_returns_at_the_limit() {
        let log: Arc<dyn LogStore> = Arc::new(StalledLog {
            delay: Duration::from_millis(500),
        });
        let started = Instant::now();
        let err = entries_within(&log, "AcmeCorp", Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, PredictError::Timeout { limit_ms: 20, .. }));
        assert!(started.elapsed() < Duration::from_millis(300));
    }

    #[test]
    fn fast_read_is_returned() {
        let log: Arc<dyn LogStore> = Arc::new(MemoryExecutionLog::new());
        let entries = entries_within(&log, "AcmeCorp", DEFAULT_TIMEOUT).unwrap();
        assert!(entries.is_empty());
    }
}
