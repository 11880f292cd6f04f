// queue.rs — Queue subcommands: add, list, process, withdraw.

use std::path::PathBuf;

use aeg_executor::{GateSettings, QueueReport};
use clap::Subcommand;
use uuid::Uuid;

use super::open_gate;
use super::strategy::{load_candidate, print_submit};

#[derive(Subcommand)]
pub enum QueueCommands {
    /// Register a candidate as pending without evaluating it.
    Add {
        /// Path to a strategy candidate JSON file.
        candidate: PathBuf,
    },
    /// List pending candidates, oldest first.
    List {
        /// Only show candidates for this entity.
        #[arg(long)]
        entity: Option<String>,
    },
    /// Submit every pending candidate to the gate.
    Process,
    /// Withdraw a pending candidate so it is never evaluated.
    Withdraw {
        /// Strategy ID.
        id: Uuid,
        /// Why the candidate is withdrawn.
        #[arg(long, default_value = "withdrawn by operator")]
        reason: String,
    },
}

pub fn execute(cmd: &QueueCommands, settings: &GateSettings) -> anyhow::Result<()> {
    let gate = open_gate(settings)?;

    match cmd {
        QueueCommands::Add { candidate } => {
            let candidate = load_candidate(candidate)?;
            let stored = gate.candidates().register(&candidate)?;
            println!("Queued {} for {} ({}).", stored.id, stored.entity_name, stored.status);
        }

        QueueCommands::List { entity } => {
            let pending = gate.candidates().pending(entity.as_deref())?;
            if pending.is_empty() {
                println!("No pending strategies.");
                return Ok(());
            }
            println!(
                "{:<38} {:<16} {:<18} {:<9} TITLE",
                "ID", "ENTITY", "TYPE", "PRIORITY"
            );
            println!("{}", "-".repeat(100));
            for c in &pending {
                println!(
                    "{:<38} {:<16} {:<18} {:<9} {}",
                    c.id,
                    c.entity_name,
                    c.strategy_type.to_string(),
                    c.priority.to_string(),
                    c.title
                );
            }
        }

        QueueCommands::Process => {
            let reports = gate.process_queue()?;
            if reports.is_empty() {
                println!("No pending strategies.");
                return Ok(());
            }
            for report in &reports {
                match report {
                    QueueReport::Submitted(submitted) => print_submit(submitted),
                    QueueReport::Skipped {
                        strategy_id,
                        reason,
                    } => println!("Skipped {}: {}", strategy_id, reason),
                }
                println!();
            }
            let admitted = reports
                .iter()
                .filter(|r| matches!(r, QueueReport::Submitted(s) if s.decision.admitted))
                .count();
            println!("{} processed, {} admitted.", reports.len(), admitted);
        }

        QueueCommands::Withdraw { id, reason } => {
            let withdrawn = gate.withdraw(*id, reason)?;
            println!("Withdrew {} ({}).", withdrawn.id, withdrawn.entity_name);
        }
    }

    Ok(())
}
