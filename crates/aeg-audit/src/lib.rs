//! # aeg-audit
//!
//! Append-only execution log for the auto-execution gate.
//!
//! Every evaluation (admitted or rejected) is recorded as an
//! [`ExecutionLogEntry`]. Execution start and finish are recorded as separate
//! follow-up records rather than by editing the decision, so nothing written
//! is ever mutated; [`history::project`] folds them back into the entry view.
//!
//! The JSONL backend chains each line to the previous one with a SHA-256
//! hash so tampering can be detected with [`JsonlExecutionLog::verify_chain`].
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use aeg_audit::{JsonlExecutionLog, LogStore};
//!
//! let log = JsonlExecutionLog::open("/tmp/execution.jsonl").unwrap();
//! let entries = log.entries_for("AcmeCorp").unwrap();
//! println!("{} decisions recorded", entries.len());
//! ```

pub mod clock;
pub mod entry;
pub mod error;
pub mod hasher;
pub mod history;
pub mod log;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{
    DecisionKind, ExecutionLogEntry, LogLine, LogRecord, OutcomeSummary, PredictionSnapshot,
    StrategySnapshot,
};
pub use error::AuditError;
pub use history::ExecutionSummary;
pub use log::JsonlExecutionLog;
pub use store::{LogStore, MemoryExecutionLog};
