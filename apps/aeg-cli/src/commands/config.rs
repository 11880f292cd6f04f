// config.rs — Config subcommands: show, set-global, create, set, history.

use std::sync::Arc;

use aeg_executor::GateSettings;
use aeg_policy::{JsonlConfigStore, PolicyConfig, PolicyConfigRegistry, GLOBAL_ENTITY};
use aeg_strategy::StrategyType;
use clap::{Args, Subcommand, ValueEnum};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective config for an entity, or the latest record of
    /// every configured entity.
    Show {
        /// Entity to resolve (falls back to "global", then to the
        /// conservative default).
        entity: Option<String>,
    },
    /// Turn automation on or off for entities without their own record.
    SetGlobal {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Start managing an entity with the recommended defaults.
    Create {
        entity: String,
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Record a new config for an entity, starting from its effective one.
    Set {
        entity: String,
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// List every recorded config for an entity, oldest first.
    History { entity: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Args, Default)]
pub struct ConfigOverrides {
    /// Enable or disable automation for this entity.
    #[arg(long, value_enum)]
    pub automation: Option<Toggle>,
    #[arg(long)]
    pub min_success_probability: Option<f64>,
    #[arg(long)]
    pub max_risk_level: Option<f64>,
    #[arg(long)]
    pub max_resource_requirement: Option<f64>,
    #[arg(long)]
    pub min_confidence_score: Option<f64>,
    /// Comma-separated strategy types (e.g. "defensive,engagement").
    #[arg(long, value_delimiter = ',')]
    pub allowed_types: Option<Vec<StrategyType>>,
    #[arg(long)]
    pub cooldown_minutes: Option<u32>,
    #[arg(long)]
    pub daily_cap: Option<u32>,
}

impl ConfigOverrides {
    fn is_empty(&self) -> bool {
        self.automation.is_none()
            && self.min_success_probability.is_none()
            && self.max_risk_level.is_none()
            && self.max_resource_requirement.is_none()
            && self.min_confidence_score.is_none()
            && self.allowed_types.is_none()
            && self.cooldown_minutes.is_none()
            && self.daily_cap.is_none()
    }

    fn apply(&self, mut config: PolicyConfig) -> PolicyConfig {
        if let Some(toggle) = self.automation {
            config.auto_execution_enabled = matches!(toggle, Toggle::On);
        }
        let t = &mut config.thresholds;
        if let Some(v) = self.min_success_probability {
            t.min_success_probability = v;
        }
        if let Some(v) = self.max_risk_level {
            t.max_risk_level = v;
        }
        if let Some(v) = self.max_resource_requirement {
            t.max_resource_requirement = v;
        }
        if let Some(v) = self.min_confidence_score {
            t.min_confidence_score = v;
        }
        if let Some(types) = &self.allowed_types {
            config.allowed_strategy_types = types.iter().copied().collect();
        }
        if let Some(minutes) = self.cooldown_minutes {
            config.cooldown_period_minutes = minutes;
        }
        if let Some(cap) = self.daily_cap {
            config.max_daily_executions = cap;
        }
        config
    }
}

pub fn registry(settings: &GateSettings) -> PolicyConfigRegistry {
    PolicyConfigRegistry::new(Arc::new(JsonlConfigStore::new(settings.policy_store_path())))
}

pub fn execute(cmd: &ConfigCommands, settings: &GateSettings) -> anyhow::Result<()> {
    let registry = registry(settings);

    match cmd {
        ConfigCommands::Show { entity: Some(entity) } => {
            let config = registry.get_config(entity);
            if config.entity_name != *entity {
                println!("(no record for {}, using {})", entity, config.entity_name);
            }
            print_config(&config);
        }

        ConfigCommands::Show { entity: None } => {
            let latest = registry.latest_configs()?;
            if latest.is_empty() {
                println!("No policy configs recorded. Every entity uses the conservative default.");
                return Ok(());
            }
            println!(
                "{:<20} {:<8} {:<6} {:<10} TYPES",
                "ENTITY", "ENABLED", "CAP", "COOLDOWN"
            );
            println!("{}", "-".repeat(72));
            for config in latest.values() {
                println!(
                    "{:<20} {:<8} {:<6} {:<10} {}",
                    config.entity_name,
                    if config.auto_execution_enabled { "yes" } else { "no" },
                    config.max_daily_executions,
                    format!("{}m", config.cooldown_period_minutes),
                    type_list(config),
                );
            }
        }

        ConfigCommands::SetGlobal { state } => {
            let config = registry.set_global_automation(matches!(state, Toggle::On))?;
            println!(
                "Global automation {}.",
                if config.auto_execution_enabled { "enabled" } else { "disabled" }
            );
        }

        ConfigCommands::Create { entity, overrides } => {
            if entity == GLOBAL_ENTITY {
                anyhow::bail!("\"{}\" is managed with `aeg config set-global`", GLOBAL_ENTITY);
            }
            let mut config = registry.create_entity_config(entity)?;
            if !overrides.is_empty() {
                config = registry.upsert_config(overrides.apply(config))?;
            }
            println!("Created policy config for {}.", entity);
            print_config(&config);
        }

        ConfigCommands::Set { entity, overrides } => {
            if overrides.is_empty() {
                anyhow::bail!("nothing to change; pass at least one option");
            }
            let current = registry.get_config(entity);
            let config = overrides.apply(PolicyConfig {
                entity_name: entity.clone(),
                created_at: chrono::Utc::now(),
                ..current
            });
            let config = registry.upsert_config(config)?;
            print_config(&config);
        }

        ConfigCommands::History { entity } => {
            let history = registry.config_history(entity)?;
            if history.is_empty() {
                println!("No configs recorded for {}.", entity);
                return Ok(());
            }
            for config in &history {
                println!(
                    "{}  enabled={} success>={} risk<={} resource<={} confidence>={} cap={} cooldown={}m types={}",
                    config.created_at.format("%Y-%m-%d %H:%M:%S"),
                    config.auto_execution_enabled,
                    config.thresholds.min_success_probability,
                    config.thresholds.max_risk_level,
                    config.thresholds.max_resource_requirement,
                    config.thresholds.min_confidence_score,
                    config.max_daily_executions,
                    config.cooldown_period_minutes,
                    type_list(config),
                );
            }
        }
    }

    Ok(())
}

fn type_list(config: &PolicyConfig) -> String {
    if config.allowed_strategy_types.is_empty() {
        return "-".to_string();
    }
    config
        .allowed_strategy_types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn print_config(config: &PolicyConfig) {
    println!("Entity:                  {}", config.entity_name);
    println!("Automation:              {}", config.auto_execution_enabled);
    println!("Min success probability: {}", config.thresholds.min_success_probability);
    println!("Max risk level:          {}", config.thresholds.max_risk_level);
    println!("Max resource:            {}", config.thresholds.max_resource_requirement);
    println!("Min confidence:          {}", config.thresholds.min_confidence_score);
    println!("Allowed types:           {}", type_list(config));
    println!("Cooldown:                {}m", config.cooldown_period_minutes);
    println!("Daily cap:               {}", config.max_daily_executions);
    println!("Recorded:                {}", config.created_at.format("%Y-%m-%d %H:%M:%S"));
}
