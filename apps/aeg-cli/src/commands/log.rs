// log.rs — Execution log subcommands: tail, verify, summary.

use std::path::PathBuf;

use aeg_audit::{history, AuditError, ExecutionSummary, JsonlExecutionLog, LogLine, LogRecord};
use aeg_executor::GateSettings;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum LogCommands {
    /// Show the most recent log records.
    Tail {
        /// Path to the execution log (defaults to .aeg/execution.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Only show records for this entity.
        #[arg(long)]
        entity: Option<String>,
        /// Number of records to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
    /// Verify the execution log hash chain.
    Verify {
        /// Path to the execution log (defaults to .aeg/execution.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Decision and execution counts.
    Summary {
        /// Restrict to one entity.
        entity: Option<String>,
        /// Path to the execution log (defaults to .aeg/execution.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

pub fn execute(cmd: &LogCommands, settings: &GateSettings) -> anyhow::Result<()> {
    match cmd {
        LogCommands::Tail { log, entity, n } => {
            let path = log_path(log, settings);
            if !path.exists() {
                println!("No execution log found at {}", path.display());
                return Ok(());
            }

            let lines: Vec<LogLine> = JsonlExecutionLog::read_all(&path)?
                .into_iter()
                .filter(|l| entity.as_deref().map_or(true, |e| l.record.entity_name() == e))
                .collect();
            let start = lines.len().saturating_sub(*n);
            let recent = &lines[start..];

            if recent.is_empty() {
                println!("No log records.");
                return Ok(());
            }

            println!(
                "{:<6} {:<20} {:<18} {:<16} DETAIL",
                "SEQ", "TIMESTAMP", "KIND", "ENTITY"
            );
            println!("{}", "-".repeat(90));
            for line in recent {
                println!(
                    "{:<6} {:<20} {:<18} {:<16} {}",
                    line.sequence,
                    line.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                    line.record.kind(),
                    line.record.entity_name(),
                    detail(&line.record),
                );
            }
        }

        LogCommands::Verify { log } => {
            let path = log_path(log, settings);
            if !path.exists() {
                println!("No execution log found at {}", path.display());
                return Ok(());
            }

            match JsonlExecutionLog::verify_chain(&path) {
                Ok(count) => {
                    println!("Execution log verified: {} record(s), hash chain intact.", count);
                }
                Err(AuditError::IntegrityViolation {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION at line {}:", line);
                    println!("  Expected previous_hash: {}", expected);
                    println!("  Actual previous_hash:   {}", actual);
                    println!();
                    println!("The execution log may have been tampered with.");
                    anyhow::bail!("Execution log integrity check failed");
                }
                Err(AuditError::SequenceGap {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("SEQUENCE GAP at line {}: expected {}, found {}", line, expected, actual);
                    println!();
                    println!("Records are missing from the execution log.");
                    anyhow::bail!("Execution log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        LogCommands::Summary { entity, log } => {
            let path = log_path(log, settings);
            if !path.exists() {
                println!("No execution log found at {}", path.display());
                return Ok(());
            }

            let records = JsonlExecutionLog::read_all(&path)?
                .into_iter()
                .map(|l| l.record)
                .filter(|r| entity.as_deref().map_or(true, |e| r.entity_name() == e));
            let entries = history::project(records);
            print_summary(entity.as_deref(), &ExecutionSummary::from_entries(&entries));
        }
    }

    Ok(())
}

fn log_path(log: &Option<PathBuf>, settings: &GateSettings) -> PathBuf {
    log.clone().unwrap_or_else(|| settings.execution_log_path())
}

fn detail(record: &LogRecord) -> String {
    match record {
        LogRecord::Decision(entry) => format!(
            "{} {} ({})",
            if entry.is_admitted() { "admitted" } else { "rejected" },
            entry.strategy.strategy_type,
            entry.reason
        ),
        LogRecord::ExecutionStarted { strategy_id, .. } => format!("strategy {}", strategy_id),
        LogRecord::ExecutionFinished { outcome, .. } => format!(
            "{} after {} action(s): {}",
            if outcome.success { "succeeded" } else { "failed" },
            outcome.executed_actions,
            outcome.details
        ),
    }
}

fn print_summary(entity: Option<&str>, summary: &ExecutionSummary) {
    println!("Scope:       {}", entity.unwrap_or("all entities"));
    println!("Decisions:   {}", summary.total_decisions);
    println!("  admitted:  {}", summary.admitted);
    println!("  rejected:  {}", summary.rejected);
    println!("Executing:   {}", summary.executing);
    println!("Completed:   {}", summary.completed);
    println!("Cancelled:   {}", summary.cancelled);
    match summary.success_rate() {
        Some(rate) => println!("Success:     {:.1}%", rate * 100.0),
        None => println!("Success:     -"),
    }
}
