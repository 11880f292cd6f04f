// candidate.rs — StrategyCandidate: a proposed response action for one entity.
//
// Candidates are created by an external generator and handed to the gate.
// After creation only the lifecycle fields change:
//   Pending → Executing → Completed | Cancelled
//   Pending → Cancelled (withdrawn before evaluation)
//
// Categorical fields (risk, resource, priority) are closed enums with a fixed
// ordinal table so they can be compared against numeric thresholds.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StrategyError;

/// The family a strategy belongs to. Policy configs allow or forbid whole families.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    Defensive,
    Proactive,
    CounterNarrative,
    Legal,
    Engagement,
}

impl StrategyType {
    pub const ALL: [StrategyType; 5] = [
        StrategyType::Defensive,
        StrategyType::Proactive,
        StrategyType::CounterNarrative,
        StrategyType::Legal,
        StrategyType::Engagement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::Defensive => "defensive",
            StrategyType::Proactive => "proactive",
            StrategyType::CounterNarrative => "counter_narrative",
            StrategyType::Legal => "legal",
            StrategyType::Engagement => "engagement",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown strategy type '{}'", s))
    }
}

/// Three-step categorical level used for risk and resource requirement.
///
/// Mapped to `low = 0.2`, `medium = 0.5`, `high = 0.8` for threshold checks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    /// Numeric value of this level on the [0, 1] threshold scale.
    pub fn ordinal(&self) -> f64 {
        match self {
            Level::Low => 0.2,
            Level::Medium => 0.5,
            Level::High => 0.8,
        }
    }

    /// Bucket a [0, 1] score back into a level.
    pub fn from_score(score: f64) -> Self {
        if score < 0.35 {
            Level::Low
        } else if score < 0.65 {
            Level::Medium
        } else {
            Level::High
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "low"),
            Level::Medium => write!(f, "medium"),
            Level::High => write!(f, "high"),
        }
    }
}

/// How urgently a strategy (or one of its actions) should run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Severity on the [0, 1] scale, used when averaging over pattern groups.
    pub fn severity(&self) -> f64 {
        match self {
            Priority::Low => 0.2,
            Priority::Medium => 0.5,
            Priority::High => 0.8,
            Priority::Critical => 1.0,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

/// One step of a strategy's directive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyAction {
    /// What to do (e.g., "Deploy counter-narrative content").
    pub description: String,
    /// Platform the action targets, if any (e.g., "twitter").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Free-form timeframe (e.g., "2 hours").
    pub timeframe: String,
    pub priority: Priority,
}

impl StrategyAction {
    pub fn new(description: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            platform: None,
            timeframe: timeframe.into(),
            priority: Priority::Medium,
        }
    }

    pub fn on_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Summary written back onto the candidate once execution finishes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    pub success: bool,
    pub executed_actions: usize,
    pub details: String,
    pub finished_at: DateTime<Utc>,
}

/// The lifecycle status of a StrategyCandidate.
///
/// Serializes as `{"state": "pending"}` / `{"state": "cancelled", "reason": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StrategyStatus {
    /// Waiting for evaluation (or re-evaluation after a rejection).
    Pending,

    /// Admitted and handed to the action performer.
    Executing,

    /// All delegated actions finished successfully.
    Completed,

    /// Withdrawn before evaluation, or the delegated actions failed.
    Cancelled { reason: String },
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyStatus::Pending => write!(f, "pending"),
            StrategyStatus::Executing => write!(f, "executing"),
            StrategyStatus::Completed => write!(f, "completed"),
            StrategyStatus::Cancelled { .. } => write!(f, "cancelled"),
        }
    }
}

impl StrategyStatus {
    /// Check whether transitioning from this status to `next` is valid.
    ///
    ///   Pending → Executing → Completed
    ///   Pending → Cancelled, Executing → Cancelled
    ///
    /// Terminal states have no outgoing edges, so status never regresses.
    pub fn can_transition_to(&self, next: &StrategyStatus) -> bool {
        matches!(
            (self, next),
            (StrategyStatus::Pending, StrategyStatus::Executing)
                | (StrategyStatus::Pending, StrategyStatus::Cancelled { .. })
                | (StrategyStatus::Executing, StrategyStatus::Completed)
                | (StrategyStatus::Executing, StrategyStatus::Cancelled { .. })
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StrategyStatus::Completed | StrategyStatus::Cancelled { .. }
        )
    }
}

/// A proposed, not-yet-executed response action bundle for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyCandidate {
    pub id: Uuid,

    /// The monitored entity this strategy targets.
    pub entity_name: String,

    #[serde(default)]
    pub title: String,

    pub strategy_type: StrategyType,

    pub priority: Priority,

    /// Generator's own effectiveness estimate, 0–100.
    pub estimated_effectiveness: u8,

    pub risk_level: Level,

    pub resource_requirement: Level,

    /// Ordered action list handed to the action performer.
    #[serde(default)]
    pub actions: Vec<StrategyAction>,

    pub created_at: DateTime<Utc>,

    #[serde(default = "default_status")]
    pub status: StrategyStatus,

    /// When the executor started running this strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_result: Option<ExecutionResult>,
}

fn default_status() -> StrategyStatus {
    StrategyStatus::Pending
}

impl StrategyCandidate {
    /// Create a new Pending candidate with medium defaults.
    pub fn new(entity_name: impl Into<String>, strategy_type: StrategyType) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_name: entity_name.into(),
            title: String::new(),
            strategy_type,
            priority: Priority::Medium,
            estimated_effectiveness: 50,
            risk_level: Level::Medium,
            resource_requirement: Level::Medium,
            actions: Vec::new(),
            created_at: Utc::now(),
            status: StrategyStatus::Pending,
            executed_at: None,
            execution_result: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the effectiveness estimate; values above 100 are clamped.
    pub fn with_effectiveness(mut self, effectiveness: u8) -> Self {
        self.estimated_effectiveness = effectiveness.min(100);
        self
    }

    pub fn with_risk(mut self, risk: Level) -> Self {
        self.risk_level = risk;
        self
    }

    pub fn with_resource_requirement(mut self, requirement: Level) -> Self {
        self.resource_requirement = requirement;
        self
    }

    pub fn with_action(mut self, action: StrategyAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Effectiveness normalized to [0, 1].
    pub fn effectiveness_score(&self) -> f64 {
        f64::from(self.estimated_effectiveness.min(100)) / 100.0
    }

    /// Distinct platforms named by this strategy's actions, in action order.
    pub fn platforms(&self) -> Vec<String> {
        let mut platforms: Vec<String> = Vec::new();
        for platform in self.actions.iter().filter_map(|a| a.platform.as_ref()) {
            if !platforms.contains(platform) {
                platforms.push(platform.clone());
            }
        }
        platforms
    }

    /// Reject candidates a generator should never have produced.
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.entity_name.trim().is_empty() {
            return Err(StrategyError::InvalidCandidate {
                strategy_id: self.id,
                reason: "entity name is empty".to_string(),
            });
        }
        if self.estimated_effectiveness > 100 {
            return Err(StrategyError::InvalidCandidate {
                strategy_id: self.id,
                reason: format!(
                    "estimated effectiveness {} is outside 0-100",
                    self.estimated_effectiveness
                ),
            });
        }
        Ok(())
    }

    /// Transition to a new status. Returns an error if the transition is invalid.
    pub fn transition(&mut self, new_status: StrategyStatus) -> Result<(), StrategyError> {
        if !self.status.can_transition_to(&new_status) {
            return Err(StrategyError::InvalidTransition {
                strategy_id: self.id,
                from: self.status.to_string(),
                to: new_status.to_string(),
            });
        }
        self.status = new_status;
        Ok(())
    }
}
