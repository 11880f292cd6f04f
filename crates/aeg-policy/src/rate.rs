// rate.rs — Daily cap and cooldown state derived from the execution log.
//
// "Today" is the UTC calendar day containing `now`. Only admitted entries
// that were handed to the executor (executed_at set) count.

use aeg_audit::ExecutionLogEntry;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSnapshot {
    pub executions_today: u32,
    pub last_execution_at: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

impl RateSnapshot {
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a ExecutionLogEntry>,
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.date_naive();
        let mut executions_today = 0;
        let mut last_execution_at: Option<DateTime<Utc>> = None;

        for executed_at in entries
            .into_iter()
            .filter(|e| e.is_admitted())
            .filter_map(|e| e.executed_at)
        {
            if executed_at.date_naive() == today {
                executions_today += 1;
            }
            if last_execution_at.map_or(true, |last| executed_at > last) {
                last_execution_at = Some(executed_at);
            }
        }

        Self {
            executions_today,
            last_execution_at,
            now,
        }
    }

    pub fn cap_reached(&self, max_daily_executions: u32) -> bool {
        self.executions_today >= max_daily_executions
    }

    /// Time left before another execution is allowed, or `None` when the
    /// cooldown has elapsed (or nothing has executed yet).
    pub fn cooldown_remaining(&self, cooldown_minutes: u32) -> Option<Duration> {
        let last = self.last_execution_at?;
        let remaining = Duration::minutes(i64::from(cooldown_minutes)) - (self.now - last);
        (remaining > Duration::zero()).then_some(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeg_audit::DecisionKind;
    use aeg_strategy::{StrategyCandidate, StrategyType};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
    }

    fn entry(decision: DecisionKind, executed_at: Option<DateTime<Utc>>) -> ExecutionLogEntry {
        let candidate = StrategyCandidate::new("AcmeCorp", StrategyType::Defensive);
        let mut entry = ExecutionLogEntry::new(&candidate, decision, "test", at(0, 0));
        entry.executed_at = executed_at;
        entry
    }

    #[test]
    fn empty_history_has_no_cooldown() {
        let entries: Vec<ExecutionLogEntry> = Vec::new();
        let snapshot = RateSnapshot::from_entries(&entries, at(12, 0));
        assert_eq!(snapshot.executions_today, 0);
        assert!(snapshot.cooldown_remaining(60).is_none());
        assert!(!snapshot.cap_reached(1));
        assert!(snapshot.cap_reached(0));
    }

    #[test]
    fn counts_only_executed_admissions_today() {
        let yesterday = at(23, 50) - Duration::days(1);
        let entries = vec![
            entry(DecisionKind::Admitted, Some(at(8, 0))),
            entry(DecisionKind::Admitted, Some(at(9, 0))),
            entry(DecisionKind::Admitted, None),
            entry(DecisionKind::Rejected, None),
            entry(DecisionKind::Admitted, Some(yesterday)),
        ];
        let snapshot = RateSnapshot::from_entries(&entries, at(12, 0));
        assert_eq!(snapshot.executions_today, 2);
        assert_eq!(snapshot.last_execution_at, Some(at(9, 0)));
        assert!(snapshot.cap_reached(2));
    }

    #[test]
    fn day_boundary_is_utc_midnight() {
        let entries = vec![entry(DecisionKind::Admitted, Some(at(23, 59)))];
        let next_morning = at(0, 1) + Duration::days(1);
        let snapshot = RateSnapshot::from_entries(&entries, next_morning);
        assert_eq!(snapshot.executions_today, 0);
        // The cooldown still spans midnight.
        assert_eq!(
            snapshot.cooldown_remaining(60),
            Some(Duration::minutes(58))
        );
    }

    #[test]
    fn cooldown_expires_exactly_at_boundary() {
        let entries = vec![entry(DecisionKind::Admitted, Some(at(9, 0)))];
        let snapshot = RateSnapshot::from_entries(&entries, at(9, 10));
        assert_eq!(snapshot.cooldown_remaining(60), Some(Duration::minutes(50)));

        let snapshot = RateSnapshot::from_entries(&entries, at(10, 0));
        assert!(snapshot.cooldown_remaining(60).is_none());
        assert!(snapshot.cooldown_remaining(0).is_none());
    }
}
