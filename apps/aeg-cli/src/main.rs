//! # aeg-cli
//!
//! Command-line interface for the auto-execution gate.
//!
//! - `aeg config show/set-global/create/history` — manage automation policy
//! - `aeg predict/evaluate/submit` — run a strategy candidate through the gate
//! - `aeg queue process/withdraw` — drain or prune the pending queue
//! - `aeg log tail/verify/summary` — inspect the hash-chained execution log
//! - `aeg patterns` — show recurring patterns in an entity's history

mod commands;

use std::path::PathBuf;

use aeg_executor::GateSettings;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Auto-execution gate: decide which generated strategies run unattended.
#[derive(Parser)]
#[command(name = "aeg", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Emit logs as JSON lines instead of text.
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage per-entity and global automation policy.
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },
    /// Inspect the execution log.
    Log {
        #[command(subcommand)]
        command: commands::log::LogCommands,
    },
    /// Show recurring threat patterns for an entity.
    Patterns {
        /// Entity to analyze.
        entity: String,
    },
    /// Score a candidate without evaluating it.
    Predict {
        /// Path to a strategy candidate JSON file.
        candidate: PathBuf,
    },
    /// Evaluate a candidate against policy without executing it.
    Evaluate {
        /// Path to a strategy candidate JSON file.
        candidate: PathBuf,
        /// Print every check, not just the decision.
        #[arg(long)]
        trace: bool,
    },
    /// Evaluate a candidate and execute it if admitted.
    Submit {
        /// Path to a strategy candidate JSON file.
        candidate: PathBuf,
    },
    /// Work the queue of pending candidates.
    Queue {
        #[command(subcommand)]
        command: commands::queue::QueueCommands,
    },
}

fn init_logging(json: bool) -> anyhow::Result<()> {
    // Logs go to stderr so they don't mix with command output on stdout.
    let filter = EnvFilter::from_default_env()
        .add_directive("aeg_executor=info".parse()?)
        .add_directive("aeg_policy=info".parse()?)
        .add_directive("aeg=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json)?;

    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let settings = GateSettings::load_or_default(&project_root);

    match &cli.command {
        Commands::Config { command } => commands::config::execute(command, &settings),
        Commands::Log { command } => commands::log::execute(command, &settings),
        Commands::Patterns { entity } => commands::patterns::execute(&settings, entity),
        Commands::Predict { candidate } => commands::strategy::predict(&settings, candidate),
        Commands::Evaluate { candidate, trace } => {
            commands::strategy::evaluate(&settings, candidate, *trace)
        }
        Commands::Submit { candidate } => commands::strategy::submit(&settings, candidate),
        Commands::Queue { command } => commands::queue::execute(command, &settings),
    }
}
