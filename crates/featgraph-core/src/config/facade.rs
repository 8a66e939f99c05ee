//! # Facade Operations
//!
//! Management operations over a [`ConfigAdmin`]. Every change to an existing
//! configuration goes through [`ConfigAdmin::modify`], so concurrent callers
//! sharing one facade never lose each other's writes.

use super::{ConfigAdmin, ConfigError, ConfigResult, ManagementFault, Properties, PropertyValue};

/// Property naming the factory a configuration was created from.
pub const FACTORY_PID_PROPERTY: &str = "service.factoryPid";
/// Property holding a configuration's own pid.
pub const SERVICE_PID_PROPERTY: &str = "service.pid";

type FacadeResult<T> = Result<T, ManagementFault>;

/// Management facade over an injected admin service.
#[derive(Debug)]
pub struct ConfigFacade<A: ConfigAdmin> {
    admin: A,
}

impl<A: ConfigAdmin> ConfigFacade<A> {
    pub fn new(admin: A) -> Self {
        Self { admin }
    }

    #[must_use]
    pub fn admin(&self) -> &A {
        &self.admin
    }

    /// Properties of an existing configuration.
    fn existing(&self, pid: &str) -> ConfigResult<Properties> {
        self.admin
            .get(pid)?
            .ok_or_else(|| ConfigError::NotFound(pid.to_string()))
    }

    fn modify(
        &self,
        pid: &str,
        change: impl FnOnce(&mut Properties) -> ConfigResult<()>,
    ) -> ConfigResult<()> {
        let mut change = Some(change);
        self.admin.modify(pid, &mut |properties: &mut Properties| {
            let change = change
                .take()
                .ok_or_else(|| ConfigError::InvalidState("change applied twice".to_string()))?;
            change(properties)
        })
    }

    /// All configuration pids.
    pub fn configs(&self) -> FacadeResult<Vec<String>> {
        self.admin.list().map_err(|e| ManagementFault::new("configs", e))
    }

    /// Create `pid` with no properties. An existing `pid` is reset.
    pub fn create(&self, pid: &str) -> FacadeResult<()> {
        self.admin
            .update(pid, Properties::new())
            .map_err(|e| ManagementFault::new("create", e))
    }

    /// Delete `pid`.
    pub fn delete(&self, pid: &str) -> FacadeResult<()> {
        let existed = self
            .admin
            .delete(pid)
            .map_err(|e| ManagementFault::new("delete", e))?;
        if !existed {
            return Err(ManagementFault::new(
                "delete",
                ConfigError::NotFound(pid.to_string()),
            ));
        }
        Ok(())
    }

    /// All properties of `pid`.
    pub fn list_properties(&self, pid: &str) -> FacadeResult<Properties> {
        self.existing(pid)
            .map_err(|e| ManagementFault::new("list_properties", e))
    }

    /// One property of `pid`; `None` if the key is absent.
    pub fn get_property(&self, pid: &str, key: &str) -> FacadeResult<Option<PropertyValue>> {
        self.existing(pid)
            .map(|mut properties| properties.remove(key))
            .map_err(|e| ManagementFault::new("get_property", e))
    }

    /// Set one property, replacing any previous value.
    pub fn set_property(&self, pid: &str, key: &str, value: PropertyValue) -> FacadeResult<()> {
        self.modify(pid, |properties| {
            properties.insert(key.to_string(), value);
            Ok(())
        })
        .map_err(|e| ManagementFault::new("set_property", e))
    }

    /// Remove one property. Removing an absent key is not an error.
    pub fn delete_property(&self, pid: &str, key: &str) -> FacadeResult<()> {
        self.modify(pid, |properties| {
            properties.remove(key);
            Ok(())
        })
        .map_err(|e| ManagementFault::new("delete_property", e))
    }

    /// Append `suffix` to a string property, creating it if absent.
    ///
    /// Fails with [`ConfigError::InvalidState`] if the current value is not
    /// a string; the configuration is left untouched.
    pub fn append_property(&self, pid: &str, key: &str, suffix: &str) -> FacadeResult<()> {
        self.modify(pid, |properties| {
            let current = properties
                .entry(key.to_string())
                .or_insert_with(|| PropertyValue::String(String::new()));
            match current {
                PropertyValue::String(value) => {
                    value.push_str(suffix);
                    Ok(())
                }
                other => Err(ConfigError::InvalidState(format!(
                    "property '{key}' of '{pid}' is a {}, not a string",
                    other.type_name()
                ))),
            }
        })
        .map_err(|e| ManagementFault::new("append_property", e))
    }

    /// Replace all properties of an existing `pid`.
    pub fn update(&self, pid: &str, properties: Properties) -> FacadeResult<()> {
        self.modify(pid, |current| {
            *current = properties;
            Ok(())
        })
        .map_err(|e| ManagementFault::new("update", e))
    }

    /// Create a new configuration from the factory `factory_pid`.
    ///
    /// The new pid is `<factory_pid>.<n>` for the smallest `n >= 1` not in
    /// use. Returns the new pid.
    pub fn create_factory_configuration(
        &self,
        factory_pid: &str,
        properties: Properties,
    ) -> FacadeResult<String> {
        let fault = |e| ManagementFault::new("create_factory_configuration", e);

        // Claim the first free pid; a pid taken by a concurrent caller
        // between listing and inserting is skipped.
        loop {
            let existing = self.admin.list().map_err(fault)?;
            let pid = (1u64..)
                .map(|n| format!("{factory_pid}.{n}"))
                .find(|candidate| existing.binary_search(candidate).is_err())
                .ok_or_else(|| {
                    fault(ConfigError::InvalidState("factory pids exhausted".to_string()))
                })?;

            let mut claimed = properties.clone();
            claimed.insert(FACTORY_PID_PROPERTY.to_string(), PropertyValue::from(factory_pid));
            claimed.insert(SERVICE_PID_PROPERTY.to_string(), PropertyValue::from(pid.as_str()));
            if self.admin.insert_new(&pid, claimed).map_err(fault)? {
                return Ok(pid);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
