//! # Descriptors
//!
//! Read-only inputs to the translator. Descriptors are plain data and are
//! usually deserialized from JSON by the application layer.

use crate::policy::{RangePolicy, UNCONSTRAINED_VERSION};
use serde::{Deserialize, Serialize};

fn unconstrained() -> String {
    UNCONSTRAINED_VERSION.to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Declarative description of an installable feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureDescriptor {
    pub name: String,
    /// Version string; `0.0.0` when absent.
    #[serde(default = "unconstrained")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    /// Raw capability expressions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    /// Raw requirement expressions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditionals: Vec<Conditional>,
}

impl FeatureDescriptor {
    /// Create an empty descriptor.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            modules: Vec::new(),
            dependencies: Vec::new(),
            capabilities: Vec::new(),
            requirements: Vec::new(),
            conditionals: Vec::new(),
        }
    }

    /// `name/version`, as used in logs and error messages.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}

/// A module reference inside a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleRef {
    pub location: String,
    /// Dependency-only references are resolved elsewhere and produce no
    /// requirement here.
    #[serde(default, skip_serializing_if = "is_false")]
    pub dependency: bool,
}

impl ModuleRef {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            dependency: false,
        }
    }
}

/// A nested feature dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dependency {
    pub name: String,
    /// Floor version or literal range.
    #[serde(default = "unconstrained")]
    pub version: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub dependency: bool,
    /// Overrides the build-wide policy for this dependency only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_policy: Option<RangePolicy>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dependency: false,
            range_policy: None,
        }
    }
}

/// A conditional variant of a feature.
///
/// `condition` holds the gating tokens: `req:<expression>` or
/// `name[/version]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Conditional {
    pub condition: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
}

/// What a module provides and requires, keyed by its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleManifest {
    pub location: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
}

// =============================================================================
// TESTS
// =============================================================================
