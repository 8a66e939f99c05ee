//! # Identity Model
//!
//! Every resource provides one capability in the reserved identity namespace
//! describing what it literally is (name, type, version). Identity
//! requirements select resources through that capability.

use crate::filter::Filter;
use crate::policy::EffectiveRange;
use crate::resource::{
    AttrValue, Capability, RESOLUTION_DIRECTIVE, RESOLUTION_MANDATORY, Requirement, Resource,
    ResourceType,
};
use crate::version::{Version, VersionRange};
use std::collections::BTreeMap;

/// Reserved namespace for identity capabilities and requirements.
pub const IDENTITY_NAMESPACE: &str = "osgi.identity";
/// Attribute holding the resource type tag.
pub const TYPE_ATTRIBUTE: &str = "type";
/// Attribute holding the resource version.
pub const VERSION_ATTRIBUTE: &str = "version";

/// The identity capability of a resource.
///
/// Depends only on name, type and version, so equal identities always render
/// to the same text.
pub fn identity_capability(name: &str, resource_type: &ResourceType, version: &Version) -> Capability {
    let attributes = BTreeMap::from([
        (IDENTITY_NAMESPACE.to_string(), AttrValue::from(name)),
        (
            TYPE_ATTRIBUTE.to_string(),
            AttrValue::from(resource_type.as_str()),
        ),
        (
            VERSION_ATTRIBUTE.to_string(),
            AttrValue::Version(version.clone()),
        ),
    ]);
    Capability::new(IDENTITY_NAMESPACE, BTreeMap::new(), attributes)
}

fn identity_filter(name: &str, resource_type: &ResourceType, range: Option<&VersionRange>) -> Filter {
    let mut terms = vec![
        Filter::equal(IDENTITY_NAMESPACE, name),
        Filter::equal(TYPE_ATTRIBUTE, resource_type.as_str()),
    ];
    if let Some(range) = range {
        terms.extend(Filter::version_terms(VERSION_ATTRIBUTE, range));
    }
    Filter::and(terms)
}

/// A requirement on the resource named `name` of type `resource_type`.
///
/// An unconstrained range adds no version term to the filter.
pub fn identity_requirement(
    name: &str,
    resource_type: &ResourceType,
    range: &EffectiveRange,
) -> Requirement {
    Requirement::new(
        IDENTITY_NAMESPACE,
        BTreeMap::new(),
        BTreeMap::new(),
        Some(identity_filter(name, resource_type, range.range())),
    )
}

/// A mandatory requirement on exactly the given, already built resource.
pub fn module_identity_requirement(required: &Resource) -> Requirement {
    let exact = VersionRange::exact(required.version().clone());
    let directives = BTreeMap::from([(
        RESOLUTION_DIRECTIVE.to_string(),
        RESOLUTION_MANDATORY.to_string(),
    )]);
    Requirement::new(
        IDENTITY_NAMESPACE,
        directives,
        BTreeMap::new(),
        Some(identity_filter(
            required.name(),
            required.resource_type(),
            Some(&exact),
        )),
    )
}

// =============================================================================
// TESTS
// =============================================================================
