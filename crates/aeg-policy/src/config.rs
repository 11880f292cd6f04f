// config.rs — Per-entity automation policy.
//
// A PolicyConfig is a closed, versioned record. Risk and resource thresholds
// are compared against the Level ordinal table (low 0.2, medium 0.5,
// high 0.8); every threshold lives in [0, 1].

use std::collections::BTreeSet;

use aeg_strategy::StrategyType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Entity name of the fallback record used when an entity has none.
pub const GLOBAL_ENTITY: &str = "global";

pub const SCHEMA_VERSION: u32 = 1;

/// Numeric admission thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min_success_probability: f64,
    pub max_risk_level: f64,
    pub max_resource_requirement: f64,
    pub min_confidence_score: f64,
}

impl Thresholds {
    /// Thresholds nothing can satisfy.
    pub fn conservative() -> Self {
        Self {
            min_success_probability: 1.0,
            max_risk_level: 0.0,
            max_resource_requirement: 0.0,
            min_confidence_score: 1.0,
        }
    }

    /// Starting point offered to operators for new global and entity records.
    pub fn recommended() -> Self {
        Self {
            min_success_probability: 0.8,
            max_risk_level: 0.4,
            max_resource_requirement: 0.6,
            min_confidence_score: 0.7,
        }
    }

    fn out_of_range(&self) -> Option<(&'static str, f64)> {
        [
            ("min_success_probability", self.min_success_probability),
            ("max_risk_level", self.max_risk_level),
            ("max_resource_requirement", self.max_resource_requirement),
            ("min_confidence_score", self.min_confidence_score),
        ]
        .into_iter()
        .find(|(_, v)| !(0.0..=1.0).contains(v))
    }
}

/// Automation policy for one entity, or for all entities when
/// `entity_name` is [`GLOBAL_ENTITY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub entity_name: String,
    pub auto_execution_enabled: bool,
    pub thresholds: Thresholds,
    #[serde(default)]
    pub allowed_strategy_types: BTreeSet<StrategyType>,
    pub cooldown_period_minutes: u32,
    pub max_daily_executions: u32,
    pub created_at: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl PolicyConfig {
    /// The built-in default when neither the entity nor `"global"` has a
    /// record. Admits nothing.
    pub fn conservative(entity_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            entity_name: entity_name.into(),
            auto_execution_enabled: false,
            thresholds: Thresholds::conservative(),
            allowed_strategy_types: BTreeSet::new(),
            cooldown_period_minutes: 1440,
            max_daily_executions: 0,
            created_at: now,
        }
    }

    /// First `"global"` record, written when the global toggle is used
    /// before any global record exists. Disabled until toggled on.
    pub fn global_defaults(now: DateTime<Utc>) -> Self {
        Self {
            auto_execution_enabled: false,
            max_daily_executions: 10,
            ..Self::entity_defaults(GLOBAL_ENTITY, now)
        }
    }

    /// Record created when an operator adds automation for a new entity.
    pub fn entity_defaults(entity_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            entity_name: entity_name.into(),
            auto_execution_enabled: true,
            thresholds: Thresholds::recommended(),
            allowed_strategy_types: [StrategyType::Defensive, StrategyType::Engagement]
                .into_iter()
                .collect(),
            cooldown_period_minutes: 60,
            max_daily_executions: 5,
            created_at: now,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.auto_execution_enabled = enabled;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_allowed_types(mut self, types: impl IntoIterator<Item = StrategyType>) -> Self {
        self.allowed_strategy_types = types.into_iter().collect();
        self
    }

    pub fn with_cooldown_minutes(mut self, minutes: u32) -> Self {
        self.cooldown_period_minutes = minutes;
        self
    }

    pub fn with_daily_cap(mut self, cap: u32) -> Self {
        self.max_daily_executions = cap;
        self
    }

    pub fn is_global(&self) -> bool {
        self.entity_name == GLOBAL_ENTITY
    }

    pub fn allows(&self, strategy_type: StrategyType) -> bool {
        self.allowed_strategy_types.contains(&strategy_type)
    }

    /// Check record invariants before it is stored.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let invalid = |reason: String| PolicyError::InvalidConfig {
            entity_name: self.entity_name.clone(),
            reason,
        };
        if self.entity_name.trim().is_empty() {
            return Err(invalid("entity name is empty".to_string()));
        }
        if self.schema_version != SCHEMA_VERSION {
            return Err(invalid(format!(
                "unsupported schema version {} (expected {})",
                self.schema_version, SCHEMA_VERSION
            )));
        }
        if let Some((name, value)) = self.thresholds.out_of_range() {
            return Err(invalid(format!("{} = {} is outside [0, 1]", name, value)));
        }
        Ok(())
    }
}
