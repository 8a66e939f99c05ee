//! # Configuration Facade
//!
//! Management operations over an injected configuration administration
//! service. Configurations are ordered property maps keyed by a process
//! identifier (pid).
//!
//! Backends:
//! - [`MemoryConfigAdmin`]: in-process, for tests and one-shot tools
//! - [`RedbConfigAdmin`]: persistent, on a redb database
//!
//! Every facade failure is a [`ManagementFault`] naming the operation and
//! keeping the underlying [`ConfigError`] as its source.

mod facade;
mod memory;
mod redb_admin;

pub use facade::{ConfigFacade, FACTORY_PID_PROPERTY, SERVICE_PID_PROPERTY};
pub use memory::MemoryConfigAdmin;
pub use redb_admin::RedbConfigAdmin;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// PROPERTIES
// =============================================================================

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyValue {
    String(String),
    Long(i64),
    Boolean(bool),
    List(Vec<String>),
}

impl PropertyValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Long(_) => "long",
            Self::Boolean(_) => "boolean",
            Self::List(_) => "list",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Long(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::List(values) => f.write_str(&values.join(",")),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// The properties of one configuration, ordered by key.
pub type Properties = BTreeMap<String, PropertyValue>;

// =============================================================================
// ERRORS
// =============================================================================

/// Failure of a configuration operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No configuration with this pid exists.
    #[error("configuration '{0}' does not exist")]
    NotFound(String),

    /// The operation does not apply to the current value.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Map any backend error into [`ConfigError::Storage`].
pub(crate) fn storage<E: fmt::Display>(err: E) -> ConfigError {
    ConfigError::Storage(err.to_string())
}

/// A failed management operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {cause}")]
pub struct ManagementFault {
    /// Name of the facade operation, e.g. `append_property`.
    pub operation: &'static str,
    #[source]
    pub cause: ConfigError,
}

impl ManagementFault {
    pub(crate) fn new(operation: &'static str, cause: ConfigError) -> Self {
        Self { operation, cause }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.cause, ConfigError::NotFound(_))
    }
}

/// Result type of configuration backends.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// ADMIN SERVICE
// =============================================================================

/// An in-place change to one configuration's properties.
pub type ChangeFn<'a> = dyn FnMut(&mut Properties) -> ConfigResult<()> + 'a;

/// The configuration administration service the facade drives.
///
/// Implementations must be safe to share between threads; every method
/// takes `&self`.
pub trait ConfigAdmin: Send + Sync {
    /// All pids, in ascending order.
    fn list(&self) -> ConfigResult<Vec<String>>;

    /// The properties of `pid`, or `None` if it does not exist.
    fn get(&self, pid: &str) -> ConfigResult<Option<Properties>>;

    /// Create `pid` or replace all of its properties.
    fn update(&self, pid: &str, properties: Properties) -> ConfigResult<()>;

    /// Remove `pid`. Returns whether it existed.
    fn delete(&self, pid: &str) -> ConfigResult<bool>;

    /// Apply `change` to the properties of an existing `pid` and store the
    /// result, with no other writer in between.
    ///
    /// A missing `pid` is [`ConfigError::NotFound`]. If `change` fails the
    /// stored properties are left untouched.
    fn modify(&self, pid: &str, change: &mut ChangeFn<'_>) -> ConfigResult<()>;

    /// Store `properties` under `pid` unless it already exists. Returns
    /// whether it was stored.
    fn insert_new(&self, pid: &str, properties: Properties) -> ConfigResult<bool>;
}

impl<A: ConfigAdmin + ?Sized> ConfigAdmin for Box<A> {
    fn list(&self) -> ConfigResult<Vec<String>> {
        (**self).list()
    }

    fn get(&self, pid: &str) -> ConfigResult<Option<Properties>> {
        (**self).get(pid)
    }

    fn update(&self, pid: &str, properties: Properties) -> ConfigResult<()> {
        (**self).update(pid, properties)
    }

    fn delete(&self, pid: &str) -> ConfigResult<bool> {
        (**self).delete(pid)
    }

    fn modify(&self, pid: &str, change: &mut ChangeFn<'_>) -> ConfigResult<()> {
        (**self).modify(pid, change)
    }

    fn insert_new(&self, pid: &str, properties: Properties) -> ConfigResult<bool> {
        (**self).insert_new(pid, properties)
    }
}

// =============================================================================
// TESTS
// =============================================================================
