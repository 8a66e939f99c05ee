//! In-process configuration store.

use super::{ChangeFn, ConfigAdmin, ConfigError, ConfigResult, Properties};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// A [`ConfigAdmin`] holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryConfigAdmin {
    configurations: RwLock<BTreeMap<String, Properties>>,
}

impl MemoryConfigAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing configurations.
    pub fn with_configurations(configurations: BTreeMap<String, Properties>) -> Self {
        Self {
            configurations: RwLock::new(configurations),
        }
    }
}

fn poisoned<T>(_: PoisonError<T>) -> ConfigError {
    ConfigError::Storage("configuration lock poisoned".to_string())
}

impl ConfigAdmin for MemoryConfigAdmin {
    fn list(&self) -> ConfigResult<Vec<String>> {
        let configurations = self.configurations.read().map_err(poisoned)?;
        Ok(configurations.keys().cloned().collect())
    }

    fn get(&self, pid: &str) -> ConfigResult<Option<Properties>> {
        let configurations = self.configurations.read().map_err(poisoned)?;
        Ok(configurations.get(pid).cloned())
    }

    fn update(&self, pid: &str, properties: Properties) -> ConfigResult<()> {
        let mut configurations = self.configurations.write().map_err(poisoned)?;
        configurations.insert(pid.to_string(), properties);
        Ok(())
    }

    fn delete(&self, pid: &str) -> ConfigResult<bool> {
        let mut configurations = self.configurations.write().map_err(poisoned)?;
        Ok(configurations.remove(pid).is_some())
    }

    fn modify(&self, pid: &str, change: &mut ChangeFn<'_>) -> ConfigResult<()> {
        let mut configurations = self.configurations.write().map_err(poisoned)?;
        let current = configurations
            .get_mut(pid)
            .ok_or_else(|| ConfigError::NotFound(pid.to_string()))?;
        let mut changed = current.clone();
        change(&mut changed)?;
        *current = changed;
        Ok(())
    }

    fn insert_new(&self, pid: &str, properties: Properties) -> ConfigResult<bool> {
        let mut configurations = self.configurations.write().map_err(poisoned)?;
        if configurations.contains_key(pid) {
            return Ok(false);
        }
        configurations.insert(pid.to_string(), properties);
        Ok(true)
    }
}
