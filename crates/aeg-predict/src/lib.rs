//! # aeg-predict
//!
//! Predictive scoring for strategy candidates, derived entirely from the
//! execution log.
//!
//! - [`PatternAnalyzer`] groups an entity's executed strategies into
//!   recurring [`ThreatPattern`]s.
//! - [`PredictiveScorer`] turns a candidate plus that history into a
//!   [`PredictionResult`] (success probability, confidence, expected
//!   duration and advice).
//!
//! Both are recomputed on every call; nothing is cached between calls. Each
//! call reads history on a worker thread and gives up after its timeout
//! ([`DEFAULT_TIMEOUT`] unless configured), even if the store never answers.

pub mod error;
pub mod pattern;
mod scan;
pub mod scorer;

pub use error::PredictError;
pub use pattern::{PatternAnalyzer, ThreatPattern};
pub use scan::DEFAULT_TIMEOUT;
pub use scorer::{PredictedOutcome, PredictionResult, PredictiveScorer, RankedCandidate};
