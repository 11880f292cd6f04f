// patterns.rs — Recurring threat patterns in an entity's execution history.

use aeg_executor::GateSettings;

use super::open_gate;

pub fn execute(settings: &GateSettings, entity: &str) -> anyhow::Result<()> {
    let gate = open_gate(settings)?;
    let patterns = gate.analyze_patterns(entity)?;

    if patterns.is_empty() {
        println!("No recurring patterns for {}.", entity);
        return Ok(());
    }

    println!(
        "{:<32} {:<8} {:<11} {:<6} {:<8} DESCRIPTION",
        "PATTERN", "IMPACT", "CONFIDENCE", "SEEN", "SUCCESS"
    );
    println!("{}", "-".repeat(100));
    for pattern in &patterns {
        println!(
            "{:<32} {:<8} {:<11} {:<6} {:<8} {}",
            pattern.id,
            pattern.impact.to_string(),
            format!("{:.2}", pattern.confidence),
            pattern.occurrences,
            format!("{:.0}%", pattern.success_rate * 100.0),
            pattern.description,
        );
    }

    Ok(())
}
