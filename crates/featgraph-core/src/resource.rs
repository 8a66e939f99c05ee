//! # Resource Model
//!
//! Resources are the nodes handed to the resolver. Each one has a frozen
//! identity (name, type, version) and append-only lists of capabilities and
//! requirements.
//!
//! There is no class hierarchy: a feature resource is a [`Resource`] plus the
//! descriptor it came from (see [`crate::translator::FeatureResource`]).

use crate::filter::Filter;
use crate::identity;
use crate::version::Version;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Directive marking a requirement as optional for the resolver.
pub const RESOLUTION_DIRECTIVE: &str = "resolution";
/// Value of [`RESOLUTION_DIRECTIVE`] for optional requirements.
pub const RESOLUTION_OPTIONAL: &str = "optional";
/// Value of [`RESOLUTION_DIRECTIVE`] for mandatory requirements.
pub const RESOLUTION_MANDATORY: &str = "mandatory";
/// Directive holding a requirement's filter expression.
pub const FILTER_DIRECTIVE: &str = "filter";
/// Directive marking a requirement as gating a conditional sub-graph.
pub const CONDITIONAL_DIRECTIVE: &str = "condition";
/// Value of [`CONDITIONAL_DIRECTIVE`] on gated requirements.
pub const CONDITIONAL_TRUE: &str = "true";

// =============================================================================
// RESOURCE TYPE
// =============================================================================

/// Type tag of a resource.
///
/// `Other` keeps unknown tags from module manifests intact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceType {
    Feature,
    Module,
    Other(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Feature => "feature",
            Self::Module => "module",
            Self::Other(value) => value.as_str(),
        }
    }

    pub fn from_tag(value: &str) -> Self {
        match value {
            "feature" => Self::Feature,
            "module" => Self::Module,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

// =============================================================================
// ATTRIBUTE VALUES
// =============================================================================

/// A typed attribute value.
///
/// The type decides how filters compare against it: versions as versions,
/// longs numerically, strings lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    String(String),
    Version(Version),
    Long(i64),
    StringList(Vec<String>),
    VersionList(Vec<Version>),
    LongList(Vec<i64>),
}

impl AttrValue {
    /// Type name as written in clause syntax (`attr:Version=1.0`).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Version(_) => "Version",
            Self::Long(_) => "Long",
            Self::StringList(_) => "List<String>",
            Self::VersionList(_) => "List<Version>",
            Self::LongList(_) => "List<Long>",
        }
    }

    /// The value as clause text, lists comma-joined.
    pub fn to_clause_text(&self) -> String {
        fn join<T: fmt::Display>(items: &[T]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        }
        match self {
            Self::String(value) => value.clone(),
            Self::Version(value) => value.to_string(),
            Self::Long(value) => value.to_string(),
            Self::StringList(values) => join(values),
            Self::VersionList(values) => join(values),
            Self::LongList(values) => join(values),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Version> for AttrValue {
    fn from(value: Version) -> Self {
        Self::Version(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

/// Quote a clause value, escaping `"` and `\`.
fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len().saturating_add(2));
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn write_clause(
    f: &mut fmt::Formatter<'_>,
    namespace: &str,
    directives: &BTreeMap<String, String>,
    attributes: &BTreeMap<String, AttrValue>,
) -> fmt::Result {
    f.write_str(namespace)?;
    for (key, value) in directives {
        write!(f, ";{}:={}", key, quoted(value))?;
    }
    for (key, value) in attributes {
        match value {
            AttrValue::String(text) => write!(f, ";{}={}", key, quoted(text))?,
            other => write!(
                f,
                ";{}:{}={}",
                key,
                other.type_name(),
                quoted(&other.to_clause_text())
            )?,
        }
    }
    Ok(())
}

// =============================================================================
// CAPABILITY
// =============================================================================

/// Something a resource provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capability {
    namespace: String,
    directives: BTreeMap<String, String>,
    attributes: BTreeMap<String, AttrValue>,
}

impl Capability {
    /// Create a capability. The namespace must be non-empty; the builder
    /// rejects empty namespaces before getting here.
    pub(crate) fn new(
        namespace: impl Into<String>,
        directives: BTreeMap<String, String>,
        attributes: BTreeMap<String, AttrValue>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            directives,
            attributes,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn directives(&self) -> &BTreeMap<String, String> {
        &self.directives
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttrValue> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_clause(f, &self.namespace, &self.directives, &self.attributes)
    }
}

// =============================================================================
// REQUIREMENT
// =============================================================================

/// Something a resource needs from another resource.
///
/// The filter is parsed before the requirement exists, so every requirement
/// carries a syntactically valid filter (or none, matching any capability in
/// its namespace). Its text is kept under the `filter` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    namespace: String,
    directives: BTreeMap<String, String>,
    attributes: BTreeMap<String, AttrValue>,
    #[serde(skip)]
    filter: Option<Filter>,
}

impl Requirement {
    pub(crate) fn new(
        namespace: impl Into<String>,
        mut directives: BTreeMap<String, String>,
        attributes: BTreeMap<String, AttrValue>,
        filter: Option<Filter>,
    ) -> Self {
        match &filter {
            Some(filter) => {
                directives.insert(FILTER_DIRECTIVE.to_string(), filter.to_string());
            }
            None => {
                directives.remove(FILTER_DIRECTIVE);
            }
        }
        Self {
            namespace: namespace.into(),
            directives,
            attributes,
            filter,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn directives(&self) -> &BTreeMap<String, String> {
        &self.directives
    }

    pub fn directive(&self, key: &str) -> Option<&str> {
        self.directives.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttrValue> {
        &self.attributes
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Set a directive. The filter directive is owned by the filter itself
    /// and cannot be overwritten here.
    pub(crate) fn set_directive(&mut self, key: &str, value: &str) {
        if key != FILTER_DIRECTIVE {
            self.directives.insert(key.to_string(), value.to_string());
        }
    }

    /// Check if the resolver may leave this requirement unsatisfied.
    pub fn is_optional(&self) -> bool {
        self.directive(RESOLUTION_DIRECTIVE) == Some(RESOLUTION_OPTIONAL)
    }

    /// Check if this requirement gates a conditional sub-graph.
    pub fn is_conditional(&self) -> bool {
        self.directive(CONDITIONAL_DIRECTIVE) == Some(CONDITIONAL_TRUE)
    }

    /// Check if `capability` satisfies this requirement.
    pub fn matches(&self, capability: &Capability) -> bool {
        self.namespace == capability.namespace
            && self
                .filter
                .as_ref()
                .is_none_or(|filter| filter.matches(&capability.attributes))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_clause(f, &self.namespace, &self.directives, &self.attributes)
    }
}

// =============================================================================
// RESOURCE
// =============================================================================

/// A node in the dependency graph: a feature or a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    name: String,
    #[serde(rename = "type")]
    resource_type: ResourceType,
    version: Version,
    capabilities: Vec<Capability>,
    requirements: Vec<Requirement>,
}

impl Resource {
    /// Create a resource exposing only its identity capability.
    pub fn new(name: impl Into<String>, resource_type: ResourceType, version: Version) -> Self {
        let name = name.into();
        let identity = identity::identity_capability(&name, &resource_type, &version);
        Self {
            name,
            resource_type,
            version,
            capabilities: vec![identity],
            requirements: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Capabilities in one namespace, in attachment order.
    pub fn capabilities_in<'a>(
        &'a self,
        namespace: &'a str,
    ) -> impl Iterator<Item = &'a Capability> + 'a {
        self.capabilities
            .iter()
            .filter(move |cap| cap.namespace == namespace)
    }

    /// The identity capability every resource is born with.
    pub fn identity(&self) -> Option<&Capability> {
        self.capabilities_in(identity::IDENTITY_NAMESPACE).next()
    }

    pub fn add_capability(&mut self, capability: Capability) {
        self.capabilities.push(capability);
    }

    pub fn add_capabilities(&mut self, capabilities: impl IntoIterator<Item = Capability>) {
        self.capabilities.extend(capabilities);
    }

    pub fn add_requirement(&mut self, requirement: Requirement) {
        self.requirements.push(requirement);
    }

    pub fn add_requirements(&mut self, requirements: impl IntoIterator<Item = Requirement>) {
        self.requirements.extend(requirements);
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

// =============================================================================
// TESTS
// =============================================================================
