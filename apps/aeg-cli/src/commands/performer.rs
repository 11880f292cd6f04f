// performer.rs — Action performer for the CLI: records the directive and
// reports success. Real platform integrations plug in behind the same trait.

use aeg_executor::{ActionPerformer, ActionReport, PerformerError};
use aeg_strategy::StrategyAction;

pub struct LoggingPerformer;

impl ActionPerformer for LoggingPerformer {
    fn perform(
        &self,
        entity_name: &str,
        actions: &[StrategyAction],
    ) -> Result<ActionReport, PerformerError> {
        for (i, action) in actions.iter().enumerate() {
            tracing::info!(
                "[{}] action {}/{}: {} on {} within {}",
                entity_name,
                i + 1,
                actions.len(),
                action.description,
                action.platform.as_deref().unwrap_or("any platform"),
                action.timeframe
            );
        }
        Ok(ActionReport {
            success: true,
            executed_actions: actions.len(),
            details: format!("{} action(s) dispatched", actions.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_action() {
        let actions = vec![
            StrategyAction::new("Publish statement", "1 hour").on_platform("twitter"),
            StrategyAction::new("Reply to press", "1 day"),
        ];
        let report = LoggingPerformer.perform("AcmeCorp", &actions).unwrap();
        assert!(report.success);
        assert_eq!(report.executed_actions, 2);
    }
}
