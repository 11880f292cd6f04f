// store.rs — Append-only policy config storage and resolution.
//
// Config records are never updated in place. A change appends a new record;
// the latest record for an entity (by created_at, ties to the later insert)
// is the effective one.
//
// Resolution order for an entity:
//   1. latest record for the entity
//   2. latest "global" record
//   3. PolicyConfig::conservative

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use aeg_audit::{Clock, SystemClock};

use crate::config::{PolicyConfig, GLOBAL_ENTITY};
use crate::error::PolicyError;

/// Storage for policy config records, in insertion order.
pub trait ConfigStore: Send + Sync {
    fn append(&self, config: &PolicyConfig) -> Result<(), PolicyError>;

    fn load_all(&self) -> Result<Vec<PolicyConfig>, PolicyError>;
}

/// Config records as JSON lines in a single file.
pub struct JsonlConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlConfigStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PolicyError {
        PolicyError::StoreIo {
            path: self.path.clone(),
            source,
        }
    }
}

impl ConfigStore for JsonlConfigStore {
    fn append(&self, config: &PolicyConfig) -> Result<(), PolicyError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string(config)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        writeln!(file, "{}", json).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<PolicyConfig>, PolicyError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let mut configs = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| self.io_error(e))?;
            if line.trim().is_empty() {
                continue;
            }
            configs.push(serde_json::from_str(&line)?);
        }
        Ok(configs)
    }
}

/// Volatile config store.
#[derive(Default)]
pub struct MemoryConfigStore {
    records: Mutex<Vec<PolicyConfig>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn append(&self, config: &PolicyConfig) -> Result<(), PolicyError> {
        self.records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(config.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<PolicyConfig>, PolicyError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone())
    }
}

/// Most recent record among `records` (insertion order), ties to the later one.
fn latest<'a>(records: impl IntoIterator<Item = &'a PolicyConfig>) -> Option<&'a PolicyConfig> {
    records.into_iter().fold(None, |best, c| match best {
        Some(b) if b.created_at > c.created_at => Some(b),
        _ => Some(c),
    })
}

/// Resolves and records policy configs.
pub struct PolicyConfigRegistry {
    store: Arc<dyn ConfigStore>,
    clock: Arc<dyn Clock>,
}

impl PolicyConfigRegistry {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn ConfigStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The effective config for an entity. Never fails: an unreadable store
    /// resolves to the conservative default.
    pub fn get_config(&self, entity_name: &str) -> PolicyConfig {
        let records = match self.store.load_all() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    "config store unreadable, using conservative default for {}: {}",
                    entity_name,
                    e
                );
                return PolicyConfig::conservative(entity_name, self.clock.now());
            }
        };

        if let Some(config) = latest(records.iter().filter(|c| c.entity_name == entity_name)) {
            return config.clone();
        }
        if let Some(config) = latest(records.iter().filter(|c| c.is_global())) {
            tracing::debug!("no config for {}, falling back to global", entity_name);
            return config.clone();
        }
        tracing::debug!("no config for {}, using conservative default", entity_name);
        PolicyConfig::conservative(entity_name, self.clock.now())
    }

    /// Validate and append a config record.
    pub fn upsert_config(&self, config: PolicyConfig) -> Result<PolicyConfig, PolicyError> {
        config.validate()?;
        self.store.append(&config)?;
        tracing::info!(
            "policy config recorded for {} (enabled={}, cap={}, cooldown={}m)",
            config.entity_name,
            config.auto_execution_enabled,
            config.max_daily_executions,
            config.cooldown_period_minutes
        );
        Ok(config)
    }

    /// Every record for an entity, oldest first.
    pub fn config_history(&self, entity_name: &str) -> Result<Vec<PolicyConfig>, PolicyError> {
        let mut history: Vec<_> = self
            .store
            .load_all()?
            .into_iter()
            .filter(|c| c.entity_name == entity_name)
            .collect();
        history.sort_by_key(|c| c.created_at);
        Ok(history)
    }

    /// Append a new `"global"` record with the automation flag changed.
    pub fn set_global_automation(&self, enabled: bool) -> Result<PolicyConfig, PolicyError> {
        let now = self.clock.now();
        let records = self.store.load_all()?;
        let base = latest(records.iter().filter(|c| c.is_global()))
            .cloned()
            .unwrap_or_else(|| PolicyConfig::global_defaults(now));
        self.upsert_config(PolicyConfig {
            auto_execution_enabled: enabled,
            created_at: now,
            ..base
        })
    }

    /// Append the default record for a newly managed entity.
    pub fn create_entity_config(&self, entity_name: &str) -> Result<PolicyConfig, PolicyError> {
        if entity_name == GLOBAL_ENTITY {
            return Err(PolicyError::InvalidConfig {
                entity_name: entity_name.to_string(),
                reason: "use set_global_automation for the global record".to_string(),
            });
        }
        self.upsert_config(PolicyConfig::entity_defaults(entity_name, self.clock.now()))
    }

    /// Latest record per entity (including `"global"`), keyed by entity name.
    pub fn latest_configs(&self) -> Result<BTreeMap<String, PolicyConfig>, PolicyError> {
        let mut latest: BTreeMap<String, PolicyConfig> = BTreeMap::new();
        for config in self.store.load_all()? {
            match latest.get(&config.entity_name) {
                Some(existing) if existing.created_at > config.created_at => {}
                _ => {
                    latest.insert(config.entity_name.clone(), config);
                }
            }
        }
        Ok(latest)
    }

    /// Whether any entity (or the global record) currently has automation on.
    ///
    /// Unlocked read of the latest records; may lag a concurrent upsert.
    pub fn any_automation_enabled(&self) -> bool {
        match self.latest_configs() {
            Ok(latest) => latest.values().any(|c| c.auto_execution_enabled),
            Err(e) => {
                tracing::warn!("config store unreadable: {}", e);
                false
            }
        }
    }
}
