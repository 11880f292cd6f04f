//! # aeg-executor
//!
//! Runs admitted strategies and ties the gate together.
//!
//! - [`AutoExecutionGate`] is the entry point for strategy generators. It
//!   serializes evaluate → execute per entity so the daily cap and cooldown
//!   hold under concurrent submissions, and moves an admitted candidate
//!   through `pending → executing → completed | cancelled`, delegating the
//!   actual work to an [`ActionPerformer`] and recording both ends in the log.
//! - [`GateSettings`] locates the on-disk stores (`.aeg/` by default).

pub mod error;
mod executor;
pub mod gate;
pub mod performer;
pub mod settings;

pub use error::{ExecutorError, PerformerError};
pub use executor::ExecutionOutcome;
pub use gate::{AutoExecutionGate, QueueReport, SubmitReport};
pub use performer::{ActionPerformer, ActionReport};
pub use settings::GateSettings;
