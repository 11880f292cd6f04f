// store.rs — CandidateStore: persistence for StrategyCandidate lifecycle state.
//
// Each candidate is stored as a JSON file: `<store_dir>/<strategy_id>.json`.
// Status transitions are read-check-write sequences, so they run under a
// store-wide mutex: two callers racing to move the same candidate out of
// Pending see exactly one success.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::candidate::{ExecutionResult, StrategyCandidate, StrategyStatus};
use crate::error::StrategyError;

/// Persistent store for StrategyCandidate records.
pub struct CandidateStore {
    store_dir: PathBuf,
    transitions: Mutex<()>,
}

impl CandidateStore {
    /// Create a new store backed by the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(store_dir: impl AsRef<Path>) -> Result<Self, StrategyError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        fs::create_dir_all(&store_dir).map_err(|source| StrategyError::IoError {
            path: store_dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            store_dir,
            transitions: Mutex::new(()),
        })
    }

    /// Register a freshly generated candidate.
    ///
    /// If a record with the same id already exists, the stored record is
    /// returned unchanged: resubmitting a candidate never resets its status.
    pub fn register(&self, candidate: &StrategyCandidate) -> Result<StrategyCandidate, StrategyError> {
        candidate.validate()?;
        let _guard = self.lock();
        if let Some(existing) = self.get(candidate.id)? {
            return Ok(existing);
        }
        self.save(candidate)?;
        Ok(candidate.clone())
    }

    /// Save a candidate to disk (creates or overwrites).
    pub fn save(&self, candidate: &StrategyCandidate) -> Result<(), StrategyError> {
        let path = self.candidate_file(candidate.id);
        let json = serde_json::to_string_pretty(candidate)?;
        fs::write(&path, json).map_err(|source| StrategyError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    /// Get a specific candidate by ID.
    pub fn get(&self, strategy_id: Uuid) -> Result<Option<StrategyCandidate>, StrategyError> {
        let path = self.candidate_file(strategy_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|source| StrategyError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        let candidate: StrategyCandidate = serde_json::from_str(&json)?;
        Ok(Some(candidate))
    }

    /// List all candidates, oldest first.
    pub fn list(&self) -> Result<Vec<StrategyCandidate>, StrategyError> {
        let mut candidates = Vec::new();

        let entries = fs::read_dir(&self.store_dir).map_err(|source| StrategyError::IoError {
            path: self.store_dir.display().to_string(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| StrategyError::IoError {
                path: self.store_dir.display().to_string(),
                source,
            })?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                let json = fs::read_to_string(&path).map_err(|source| StrategyError::IoError {
                    path: path.display().to_string(),
                    source,
                })?;
                match serde_json::from_str::<StrategyCandidate>(&json) {
                    Ok(candidate) => candidates.push(candidate),
                    Err(e) => {
                        tracing::warn!("skipping unreadable candidate {}: {}", path.display(), e)
                    }
                }
            }
        }

        candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(candidates)
    }

    /// List candidates whose status name matches (e.g., "pending").
    pub fn list_by_status(&self, status_name: &str) -> Result<Vec<StrategyCandidate>, StrategyError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|c| c.status.to_string() == status_name)
            .collect())
    }

    /// Pending candidates for one entity (or all entities), oldest first.
    pub fn pending(&self, entity_name: Option<&str>) -> Result<Vec<StrategyCandidate>, StrategyError> {
        Ok(self
            .list_by_status("pending")?
            .into_iter()
            .filter(|c| entity_name.map_or(true, |e| c.entity_name == e))
            .collect())
    }

    /// Transition a candidate to a new status and save it.
    pub fn transition(
        &self,
        strategy_id: Uuid,
        new_status: StrategyStatus,
    ) -> Result<StrategyCandidate, StrategyError> {
        let _guard = self.lock();
        let mut candidate = self
            .get(strategy_id)?
            .ok_or(StrategyError::NotFound(strategy_id))?;
        candidate.transition(new_status)?;
        self.save(&candidate)?;
        Ok(candidate)
    }

    /// Atomically move a candidate from Pending to Executing.
    ///
    /// Fails with `InvalidTransition` if the candidate is not Pending, which
    /// is how a second execution attempt of the same strategy is detected.
    pub fn begin_execution(
        &self,
        strategy_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<StrategyCandidate, StrategyError> {
        let _guard = self.lock();
        let mut candidate = self
            .get(strategy_id)?
            .ok_or(StrategyError::NotFound(strategy_id))?;
        candidate.transition(StrategyStatus::Executing)?;
        candidate.executed_at = Some(started_at);
        self.save(&candidate)?;
        Ok(candidate)
    }

    /// Record the result of an Executing candidate: Completed on success,
    /// Cancelled (with the failure details as reason) otherwise.
    pub fn finish_execution(
        &self,
        strategy_id: Uuid,
        result: ExecutionResult,
    ) -> Result<StrategyCandidate, StrategyError> {
        let _guard = self.lock();
        let mut candidate = self
            .get(strategy_id)?
            .ok_or(StrategyError::NotFound(strategy_id))?;
        let next = if result.success {
            StrategyStatus::Completed
        } else {
            StrategyStatus::Cancelled {
                reason: result.details.clone(),
            }
        };
        candidate.transition(next)?;
        candidate.execution_result = Some(result);
        self.save(&candidate)?;
        Ok(candidate)
    }

    /// Withdraw a Pending candidate before it is evaluated.
    ///
    /// Only Pending candidates can be withdrawn; once Executing, the
    /// executor's failure path is the only way to reach Cancelled.
    pub fn withdraw(
        &self,
        strategy_id: Uuid,
        reason: impl Into<String>,
    ) -> Result<StrategyCandidate, StrategyError> {
        let _guard = self.lock();
        let mut candidate = self
            .get(strategy_id)?
            .ok_or(StrategyError::NotFound(strategy_id))?;
        if candidate.status != StrategyStatus::Pending {
            return Err(StrategyError::InvalidTransition {
                strategy_id,
                from: candidate.status.to_string(),
                to: "cancelled".to_string(),
            });
        }
        candidate.transition(StrategyStatus::Cancelled {
            reason: reason.into(),
        })?;
        self.save(&candidate)?;
        Ok(candidate)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.transitions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Path to the JSON file for a given candidate.
    fn candidate_file(&self, strategy_id: Uuid) -> PathBuf {
        self.store_dir.join(format!("{}.json", strategy_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::StrategyType;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn make_candidate(entity: &str) -> StrategyCandidate {
        StrategyCandidate::new(entity, StrategyType::Defensive)
    }

    #[test]
    fn register_and_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = CandidateStore::new(dir.path().join("candidates")).unwrap();

        let c = make_candidate("AcmeCorp");
        store.register(&c).unwrap();

        let found = store.get(c.id).unwrap().unwrap();
        assert_eq!(found.id, c.id);
        assert_eq!(found.entity_name, "AcmeCorp");
    }

    #[test]
    fn register_does_not_reset_existing_status() {
        let dir = tempdir().unwrap();
        let store = CandidateStore::new(dir.path()).unwrap();

        let c = make_candidate("AcmeCorp");
        store.register(&c).unwrap();
        store.begin_execution(c.id, Utc::now()).unwrap();

        let again = store.register(&c).unwrap();
        assert_eq!(again.status, StrategyStatus::Executing);
    }

    #[test]
    fn get_nonexistent_returns_none() {
        let dir = tempdir().unwrap();
        let store = CandidateStore::new(dir.path()).unwrap();
        assert!(store.get(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn pending_lists_oldest_first_and_filters_entity() {
        let dir = tempdir().unwrap();
        let store = CandidateStore::new(dir.path()).unwrap();

        let mut older = make_candidate("AcmeCorp");
        older.created_at = Utc::now() - Duration::hours(2);
        let newer = make_candidate("AcmeCorp");
        let other = make_candidate("Globex");
        store.register(&newer).unwrap();
        store.register(&older).unwrap();
        store.register(&other).unwrap();

        let pending = store.pending(Some("AcmeCorp")).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, older.id);
        assert_eq!(store.pending(None).unwrap().len(), 3);
    }

    #[test]
    fn begin_execution_sets_executed_at() {
        let dir = tempdir().unwrap();
        let store = CandidateStore::new(dir.path()).unwrap();
        let c = make_candidate("AcmeCorp");
        store.register(&c).unwrap();

        let at = Utc::now();
        let updated = store.begin_execution(c.id, at).unwrap();
        assert_eq!(updated.status, StrategyStatus::Executing);
        assert_eq!(updated.executed_at, Some(at));
    }

    #[test]
    fn second_begin_execution_fails() {
        let dir = tempdir().unwrap();
        let store = CandidateStore::new(dir.path()).unwrap();
        let c = make_candidate("AcmeCorp");
        store.register(&c).unwrap();

        store.begin_execution(c.id, Utc::now()).unwrap();
        let result = store.begin_execution(c.id, Utc::now());
        assert!(matches!(result, Err(StrategyError::InvalidTransition { .. })));
    }

    #[test]
    fn concurrent_begin_execution_admits_exactly_one() {
        let dir = tempdir().unwrap();
        let store = CandidateStore::new(dir.path()).unwrap();
        let c = make_candidate("AcmeCorp");
        store.register(&c).unwrap();

        let wins = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    if store.begin_execution(c.id, Utc::now()).is_ok() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });
        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn finish_execution_failure_cancels() {
        let dir = tempdir().unwrap();
        let store = CandidateStore::new(dir.path()).unwrap();
        let c = make_candidate("AcmeCorp");
        store.register(&c).unwrap();
        store.begin_execution(c.id, Utc::now()).unwrap();

        let finished = store
            .finish_execution(
                c.id,
                ExecutionResult {
                    success: false,
                    executed_actions: 1,
                    details: "platform API unavailable".to_string(),
                    finished_at: Utc::now(),
                },
            )
            .unwrap();
        assert_eq!(finished.status.to_string(), "cancelled");
        assert!(finished.execution_result.is_some());
    }

    #[test]
    fn withdraw_only_from_pending() {
        let dir = tempdir().unwrap();
        let store = CandidateStore::new(dir.path()).unwrap();

        let running = make_candidate("AcmeCorp");
        store.register(&running).unwrap();
        store.begin_execution(running.id, Utc::now()).unwrap();
        assert!(matches!(
            store.withdraw(running.id, "too late"),
            Err(StrategyError::InvalidTransition { .. })
        ));

        let fresh = make_candidate("AcmeCorp");
        store.register(&fresh).unwrap();
        let withdrawn = store.withdraw(fresh.id, "superseded").unwrap();
        assert_eq!(withdrawn.status.to_string(), "cancelled");
    }

    #[test]
    fn transition_nonexistent_returns_not_found() {
        let dir = tempdir().unwrap();
        let store = CandidateStore::new(dir.path()).unwrap();
        let result = store.transition(Uuid::new_v4(), StrategyStatus::Executing);
        assert!(matches!(result, Err(StrategyError::NotFound(_))));
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempdir().unwrap();
        let c = make_candidate("Persistent");
        {
            let store = CandidateStore::new(dir.path()).unwrap();
            store.register(&c).unwrap();
        }
        let store = CandidateStore::new(dir.path()).unwrap();
        assert_eq!(store.get(c.id).unwrap().unwrap().entity_name, "Persistent");
    }
}
