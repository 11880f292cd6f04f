// strategy.rs — predict / evaluate / submit for a candidate read from JSON.

use std::path::Path;

use aeg_executor::{GateSettings, SubmitReport};
use aeg_policy::{Decision, EvaluationTrace};
use aeg_predict::PredictionResult;
use aeg_strategy::StrategyCandidate;
use anyhow::Context;

use super::open_gate;

/// Read and validate a candidate file.
pub fn load_candidate(path: &Path) -> anyhow::Result<StrategyCandidate> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading candidate {}", path.display()))?;
    let candidate: StrategyCandidate = serde_json::from_str(&content)
        .with_context(|| format!("parsing candidate {}", path.display()))?;
    candidate.validate()?;
    Ok(candidate)
}

pub fn predict(settings: &GateSettings, path: &Path) -> anyhow::Result<()> {
    let candidate = load_candidate(path)?;
    let gate = open_gate(settings)?;
    let prediction = gate.predict(&candidate)?;
    print_prediction(&prediction);
    Ok(())
}

pub fn evaluate(settings: &GateSettings, path: &Path, trace: bool) -> anyhow::Result<()> {
    let candidate = load_candidate(path)?;
    let gate = open_gate(settings)?;
    let EvaluationTrace { decision, steps } = gate.evaluate_with_trace(&candidate)?;

    if trace {
        for step in &steps {
            println!(
                "  {:<22} {}{}",
                step.check,
                step.outcome,
                if step.terminal { "  <- decided" } else { "" }
            );
        }
        println!();
    }
    print_decision(&decision);
    Ok(())
}

pub fn submit(settings: &GateSettings, path: &Path) -> anyhow::Result<()> {
    let candidate = load_candidate(path)?;
    let gate = open_gate(settings)?;
    let report = gate.submit(&candidate)?;
    print_submit(&report);
    Ok(())
}

pub fn print_submit(report: &SubmitReport) {
    print_decision(&report.decision);
    if let Some(outcome) = &report.outcome {
        println!(
            "Execution:   {} ({} action(s), {})",
            outcome.status, outcome.executed_actions, outcome.details
        );
    }
}

fn print_decision(decision: &Decision) {
    println!("Strategy:    {}", decision.strategy_id);
    println!("Entity:      {}", decision.entity_name);
    println!(
        "Decision:    {} ({})",
        if decision.admitted { "ADMITTED" } else { "REJECTED" },
        decision.reason
    );
    if let Some(fault) = &decision.fault {
        println!("Fault:       {}", fault);
    }
    if let Some(prediction) = &decision.prediction {
        print_prediction(prediction);
    }
}

fn print_prediction(prediction: &PredictionResult) {
    println!(
        "Success:     {:.2}{}",
        prediction.success_probability,
        if prediction.cold_start { " (no history)" } else { "" }
    );
    println!(
        "Confidence:  {:.2} over {} outcome(s)",
        prediction.confidence_score, prediction.sample_size
    );
    println!("Outcome:     {}", prediction.predicted_outcome);
    println!("Duration:    ~{}h", prediction.time_to_complete_hours);
    if !prediction.contributing_patterns.is_empty() {
        println!("Patterns:    {}", prediction.contributing_patterns.join(", "));
    }
    for recommendation in &prediction.recommendations {
        println!("  - {}", recommendation);
    }
    if !prediction.alternatives.is_empty() {
        println!("Alternatives:");
        for alternative in &prediction.alternatives {
            println!("  - {}", alternative);
        }
    }
}
