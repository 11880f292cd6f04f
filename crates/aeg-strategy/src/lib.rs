//! # aeg-strategy
//!
//! Strategy candidate model and lifecycle for the auto-execution gate.
//!
//! A [`StrategyCandidate`] is a proposed response action bundle targeting one
//! monitored entity. Candidates are produced by an external generator and only
//! their lifecycle status is ever mutated afterwards.
//!
//! ## Key components
//!
//! - [`StrategyCandidate`] — the candidate record and its action list
//! - [`StrategyStatus`] — the lifecycle state machine (Pending → Executing
//!   → Completed | Cancelled, or Pending → Cancelled on withdrawal)
//! - [`Level`], [`Priority`] — closed enums with the ordinal table used for
//!   numeric threshold comparisons
//! - [`CandidateStore`] — JSON file-based persistence with atomic transitions

pub mod candidate;
pub mod error;
pub mod store;

pub use candidate::{
    ExecutionResult, Level, Priority, StrategyAction, StrategyCandidate, StrategyStatus,
    StrategyType,
};
pub use error::StrategyError;
pub use store::CandidateStore;
