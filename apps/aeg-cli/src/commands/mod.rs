pub mod config;
pub mod log;
pub mod patterns;
pub mod performer;
pub mod queue;
pub mod strategy;

use std::sync::Arc;

use aeg_executor::{AutoExecutionGate, GateSettings};
use anyhow::Context;

/// Open the gate over the project's stores, delegating actions to the
/// logging performer.
pub fn open_gate(settings: &GateSettings) -> anyhow::Result<AutoExecutionGate> {
    AutoExecutionGate::open(settings, Arc::new(performer::LoggingPerformer))
        .with_context(|| format!("opening gate at {}", settings.project_root.display()))
}
