// performer.rs — The seam to whatever actually carries out strategy actions.

use aeg_strategy::StrategyAction;
use serde::{Deserialize, Serialize};

use crate::error::PerformerError;

/// What the performer reports back after running a strategy's actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub success: bool,
    pub executed_actions: usize,
    pub details: String,
}

/// Carries out the ordered actions of an admitted strategy for one entity
/// (content deployment, platform API calls, ...).
///
/// Called at most once per strategy; the executor never retries.
pub trait ActionPerformer: Send + Sync {
    fn perform(
        &self,
        entity_name: &str,
        actions: &[StrategyAction],
    ) -> Result<ActionReport, PerformerError>;
}
