//! # aeg-policy
//!
//! Decides whether a strategy candidate may run without a human in the loop.
//!
//! - [`PolicyConfig`] holds per-entity thresholds, with an explicit
//!   fallback from the entity to the `"global"` record to a conservative
//!   built-in default that admits nothing.
//! - [`PolicyConfigRegistry`] resolves and records configs over a
//!   [`ConfigStore`]. Records are appended, never overwritten.
//! - [`RateSnapshot`] derives the daily cap and cooldown state from the
//!   execution log.
//! - [`Evaluator`] runs the ordered admission checks and writes exactly one
//!   log entry per evaluation.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod rate;
pub mod store;

pub use config::{PolicyConfig, Thresholds, GLOBAL_ENTITY};
pub use error::PolicyError;
pub use evaluator::{Decision, DecisionReason, EvaluationStep, EvaluationTrace, Evaluator};
pub use rate::RateSnapshot;
pub use store::{ConfigStore, JsonlConfigStore, MemoryConfigStore, PolicyConfigRegistry};
