// settings.rs — Where the gate keeps its state, from .aeg/gate.toml.
//
// Every field is optional in the file. Relative paths are resolved against
// the project root; absolute paths are used as-is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSettings {
    /// Set by `for_project` / `load`, never read from the file.
    #[serde(skip)]
    pub project_root: PathBuf,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub scorer: ScorerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Append-only policy config records (JSONL).
    #[serde(default = "default_policy_store")]
    pub policy_store: PathBuf,

    /// Hash-chained execution log (JSONL).
    #[serde(default = "default_execution_log")]
    pub execution_log: PathBuf,

    /// One JSON file per strategy candidate.
    #[serde(default = "default_candidates_dir")]
    pub candidates_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            policy_store: default_policy_store(),
            execution_log: default_execution_log(),
            candidates_dir: default_candidates_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerSettings {
    /// Upper bound on one prediction; slower scans fail closed.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_policy_store() -> PathBuf {
    PathBuf::from(".aeg/policy.jsonl")
}

fn default_execution_log() -> PathBuf {
    PathBuf::from(".aeg/execution.jsonl")
}

fn default_candidates_dir() -> PathBuf {
    PathBuf::from(".aeg/candidates")
}

fn default_timeout_ms() -> u64 {
    2_000
}

impl GateSettings {
    /// Standard `.aeg/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
            storage: StorageSettings::default(),
            scorer: ScorerSettings::default(),
        }
    }

    /// `<root>/.aeg/gate.toml`
    pub fn settings_path(project_root: impl AsRef<Path>) -> PathBuf {
        project_root.as_ref().join(".aeg").join("gate.toml")
    }

    /// Load settings from `<root>/.aeg/gate.toml`.
    pub fn load(project_root: impl AsRef<Path>) -> Result<Self, ExecutorError> {
        let path = Self::settings_path(&project_root);
        let content = std::fs::read_to_string(&path).map_err(|e| ExecutorError::Settings {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let mut settings: GateSettings =
            toml::from_str(&content).map_err(|e| ExecutorError::Settings {
                path,
                reason: e.to_string(),
            })?;
        settings.project_root = project_root.as_ref().to_path_buf();
        Ok(settings)
    }

    /// Load settings, falling back to the standard layout when the file is
    /// missing or unreadable.
    pub fn load_or_default(project_root: impl AsRef<Path>) -> Self {
        let path = Self::settings_path(&project_root);
        if !path.exists() {
            return Self::for_project(project_root);
        }
        Self::load(&project_root).unwrap_or_else(|e| {
            tracing::warn!("{}; using default gate settings", e);
            Self::for_project(project_root)
        })
    }

    pub fn policy_store_path(&self) -> PathBuf {
        self.project_root.join(&self.storage.policy_store)
    }

    pub fn execution_log_path(&self) -> PathBuf {
        self.project_root.join(&self.storage.execution_log)
    }

    pub fn candidates_dir(&self) -> PathBuf {
        self.project_root.join(&self.storage.candidates_dir)
    }

    pub fn scorer_timeout(&self) -> Duration {
        Duration::from_millis(self.scorer.timeout_ms)
    }
}
