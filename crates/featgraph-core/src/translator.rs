//! # Dependency Translator
//!
//! Turns a [`FeatureDescriptor`] into a feature [`Resource`]:
//!
//! 1. identity of the feature itself
//! 2. exact, mandatory requirements on each referenced module
//! 3. identity requirements on nested feature dependencies
//! 4. explicitly declared capabilities and requirements
//!
//! Requirements are attached in source order. Any error aborts the build and
//! the half-built resource is dropped with it.

use crate::builder::{parse_capability, parse_requirement};
use crate::descriptor::{Conditional, Dependency, FeatureDescriptor, ModuleRef};
use crate::identity::{identity_requirement, module_identity_requirement};
use crate::policy::{RangePolicy, compute_effective_range};
use crate::resource::{CONDITIONAL_DIRECTIVE, CONDITIONAL_TRUE, Requirement, Resource, ResourceType};
use crate::version::Version;
use crate::{FeatureError, FeatureResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// Built module resources, keyed by module location.
pub type ModuleLocations = BTreeMap<String, Resource>;

// =============================================================================
// FEATURE RESOURCE
// =============================================================================

/// A feature resource together with the descriptor it was built from.
///
/// For a conditional variant, `feature` is the base feature and
/// `conditional` the variant that produced this resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureResource {
    resource: Resource,
    #[serde(skip)]
    feature: FeatureDescriptor,
    #[serde(skip)]
    conditional: Option<Conditional>,
}

impl FeatureResource {
    pub(crate) fn new(resource: Resource, feature: FeatureDescriptor, conditional: Option<Conditional>) -> Self {
        Self {
            resource,
            feature,
            conditional,
        }
    }

    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    #[must_use]
    pub fn feature(&self) -> &FeatureDescriptor {
        &self.feature
    }

    #[must_use]
    pub fn conditional(&self) -> Option<&Conditional> {
        self.conditional.as_ref()
    }

    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.conditional.is_some()
    }

    pub fn into_resource(self) -> Resource {
        self.resource
    }
}

// =============================================================================
// BUILD
// =============================================================================

/// The parts of a descriptor that produce requirements and capabilities.
///
/// Shared by plain features and conditional variants.
pub(crate) struct Content<'a> {
    pub modules: &'a [ModuleRef],
    pub dependencies: &'a [Dependency],
    pub capabilities: &'a [String],
    pub requirements: &'a [String],
}

impl<'a> From<&'a FeatureDescriptor> for Content<'a> {
    fn from(feature: &'a FeatureDescriptor) -> Self {
        Self {
            modules: &feature.modules,
            dependencies: &feature.dependencies,
            capabilities: &feature.capabilities,
            requirements: &feature.requirements,
        }
    }
}

impl<'a> From<&'a Conditional> for Content<'a> {
    fn from(conditional: &'a Conditional) -> Self {
        Self {
            modules: &conditional.modules,
            dependencies: &conditional.dependencies,
            capabilities: &conditional.capabilities,
            requirements: &conditional.requirements,
        }
    }
}

/// Build the resource for `feature`.
///
/// `policy` applies to every dependency without its own `range_policy`.
/// Every non dependency-only module reference must be present in
/// `locations`.
pub fn build(
    feature: &FeatureDescriptor,
    policy: &RangePolicy,
    locations: &ModuleLocations,
) -> FeatureResult<FeatureResource> {
    let version = Version::parse(&feature.version)?;
    let mut resource = Resource::new(feature.name.clone(), ResourceType::Feature, version);
    populate(&mut resource, Content::from(feature), policy, locations)?;
    Ok(FeatureResource::new(resource, feature.clone(), None))
}

/// Attach everything `content` declares to `resource`.
pub(crate) fn populate(
    resource: &mut Resource,
    content: Content<'_>,
    policy: &RangePolicy,
    locations: &ModuleLocations,
) -> FeatureResult<()> {
    for module in content.modules.iter().filter(|m| !m.dependency) {
        let Some(target) = locations.get(&module.location) else {
            return Err(FeatureError::UnresolvedModuleReference {
                feature: resource.to_string(),
                location: module.location.clone(),
            });
        };
        resource.add_requirement(module_identity_requirement(target));
    }

    for dependency in content.dependencies.iter().filter(|d| !d.dependency) {
        resource.add_requirement(dependency_requirement(dependency, policy, false)?);
    }

    for expression in content.capabilities {
        parse_capability(resource, expression)?;
    }
    for expression in content.requirements {
        parse_requirement(resource, expression)?;
    }
    Ok(())
}

/// The identity requirement a nested feature dependency imposes.
///
/// With `conditional` set, the requirement carries `condition:=true`.
pub fn dependency_requirement(
    dependency: &Dependency,
    policy: &RangePolicy,
    conditional: bool,
) -> FeatureResult<Requirement> {
    if dependency.name.trim().is_empty() {
        return Err(FeatureError::expression(
            &dependency.name,
            &dependency.name,
            "dependency names no feature",
        ));
    }
    let policy = dependency.range_policy.as_ref().unwrap_or(policy);
    let range = compute_effective_range(&dependency.version, policy)?;
    let mut requirement = identity_requirement(&dependency.name, &ResourceType::Feature, &range);
    if conditional {
        requirement.set_directive(CONDITIONAL_DIRECTIVE, CONDITIONAL_TRUE);
    }
    Ok(requirement)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IDENTITY_NAMESPACE;
    use crate::resource::{RESOLUTION_DIRECTIVE, RESOLUTION_MANDATORY};

    fn module(name: &str, version: Version) -> Resource {
        Resource::new(name, ResourceType::Module, version)
    }

    fn filters(resource: &FeatureResource) -> Vec<String> {
        resource
            .resource()
            .requirements()
            .iter()
            .map(|r| r.filter().map(ToString::to_string).unwrap_or_default())
            .collect()
    }

    #[test]
    fn same_major_dependency_yields_half_open_range() {
        let mut webapp = FeatureDescriptor::new("webapp", "1.2.0");
        webapp.dependencies.push(Dependency::new("http", "2.0.0"));

        let built = build(&webapp, &RangePolicy::SameMajor, &ModuleLocations::new()).unwrap();
        assert_eq!(
            filters(&built),
            vec!["(&(osgi.identity=http)(type=feature)(version>=2.0.0)(!(version>=3.0.0)))"]
        );

        let req = &built.resource().requirements()[0];
        let http = |v| crate::identity::identity_capability("http", &ResourceType::Feature, &v);
        assert!(req.matches(&http(Version::new(2, 0, 0))));
        assert!(req.matches(&http(Version::new(2, 9, 9))));
        assert!(!req.matches(&http(Version::new(3, 0, 0))));
        assert!(!req.matches(&http(Version::new(1, 9, 0))));
    }

    #[test]
    fn missing_module_location_fails_the_build() {
        let mut feature = FeatureDescriptor::new("webapp", "1.0.0");
        feature.modules.push(ModuleRef::new("mvn:org.web/missing/1.0"));

        let err = build(&feature, &RangePolicy::Exact, &ModuleLocations::new()).unwrap_err();
        assert_eq!(
            err,
            FeatureError::UnresolvedModuleReference {
                feature: "webapp/1.0.0".to_string(),
                location: "mvn:org.web/missing/1.0".to_string(),
            }
        );
    }

    #[test]
    fn module_reference_is_exact_and_mandatory() {
        let locations = ModuleLocations::from([(
            "mvn:org.web/core/1.0.3".to_string(),
            module("web-core", Version::new(1, 0, 3)),
        )]);
        let mut feature = FeatureDescriptor::new("webapp", "1.0.0");
        feature.modules.push(ModuleRef::new("mvn:org.web/core/1.0.3"));

        let built = build(&feature, &RangePolicy::SameMajor, &locations).unwrap();
        let req = &built.resource().requirements()[0];
        assert_eq!(req.namespace(), IDENTITY_NAMESPACE);
        assert_eq!(req.directive(RESOLUTION_DIRECTIVE), Some(RESOLUTION_MANDATORY));
        assert_eq!(
            filters(&built),
            vec!["(&(osgi.identity=web-core)(type=module)(version=1.0.3))"]
        );
    }

    #[test]
    fn dependency_only_entries_are_skipped() {
        let mut feature = FeatureDescriptor::new("webapp", "1.0.0");
        let mut module_ref = ModuleRef::new("not-built");
        module_ref.dependency = true;
        feature.modules.push(module_ref);
        let mut dep = Dependency::new("http", "2.0.0");
        dep.dependency = true;
        feature.dependencies.push(dep);

        let built = build(&feature, &RangePolicy::Exact, &ModuleLocations::new()).unwrap();
        assert!(built.resource().requirements().is_empty());
    }

    #[test]
    fn zero_floor_and_literal_ranges() {
        let mut feature = FeatureDescriptor::new("webapp", "1.0.0");
        feature.dependencies.push(Dependency::new("any", "0.0.0"));
        feature.dependencies.push(Dependency::new("pinned", "[1.0,1.5)"));

        let built = build(&feature, &RangePolicy::SameMajor, &ModuleLocations::new()).unwrap();
        assert_eq!(
            filters(&built),
            vec![
                "(&(osgi.identity=any)(type=feature))",
                "(&(osgi.identity=pinned)(type=feature)(version>=1.0.0)(!(version>=1.5.0)))",
            ]
        );
    }

    #[test]
    fn per_dependency_policy_overrides_default() {
        let mut feature = FeatureDescriptor::new("webapp", "1.0.0");
        let mut dep = Dependency::new("http", "2.3.0");
        dep.range_policy = Some(RangePolicy::AtLeast);
        feature.dependencies.push(dep);

        let built = build(&feature, &RangePolicy::Exact, &ModuleLocations::new()).unwrap();
        assert_eq!(
            filters(&built),
            vec!["(&(osgi.identity=http)(type=feature)(version>=2.3.0))"]
        );
    }

    #[test]
    fn source_order_is_preserved() {
        let locations = ModuleLocations::from([("loc".to_string(), module("m", Version::new(1, 0, 0)))]);
        let mut feature = FeatureDescriptor::new("webapp", "1.0.0");
        feature.requirements.push("osgi.ee;filter:=\"(osgi.ee=JavaSE)\"".to_string());
        feature.dependencies.push(Dependency::new("b", "0.0.0"));
        feature.dependencies.push(Dependency::new("a", "0.0.0"));
        feature.modules.push(ModuleRef::new("loc"));
        feature.capabilities.push("web.context;path=/app".to_string());

        let built = build(&feature, &RangePolicy::Exact, &locations).unwrap();
        let namespaces: Vec<_> = built
            .resource()
            .requirements()
            .iter()
            .map(|r| r.filter().map(ToString::to_string).unwrap_or_default())
            .collect();
        assert_eq!(
            namespaces,
            vec![
                "(&(osgi.identity=m)(type=module)(version=1.0.0))",
                "(&(osgi.identity=b)(type=feature))",
                "(&(osgi.identity=a)(type=feature))",
                "(osgi.ee=JavaSE)",
            ]
        );
        assert_eq!(built.resource().capabilities().len(), 2);
    }

    #[test]
    fn malformed_declarations_propagate() {
        let mut bad_version = FeatureDescriptor::new("webapp", "1.0.0");
        bad_version.dependencies.push(Dependency::new("http", "two"));
        assert!(matches!(
            build(&bad_version, &RangePolicy::Exact, &ModuleLocations::new()),
            Err(FeatureError::MalformedVersion { .. })
        ));

        let mut bad_expr = FeatureDescriptor::new("webapp", "1.0.0");
        bad_expr.requirements.push("ns;filter:=\"(broken\"".to_string());
        assert!(matches!(
            build(&bad_expr, &RangePolicy::Exact, &ModuleLocations::new()),
            Err(FeatureError::MalformedExpression { .. })
        ));
    }

    #[test]
    fn blank_dependency_name_is_rejected() {
        for name in ["", "  "] {
            let mut feature = FeatureDescriptor::new("webapp", "1.0.0");
            feature.dependencies.push(Dependency::new(name, "1.0.0"));
            assert!(matches!(
                build(&feature, &RangePolicy::Exact, &ModuleLocations::new()),
                Err(FeatureError::MalformedExpression { .. })
            ));
        }
    }

    #[test]
    fn conditional_flag_adds_condition_directive() {
        let req = dependency_requirement(&Dependency::new("ssl", "0.0.0"), &RangePolicy::Exact, true).unwrap();
        assert!(req.is_conditional());
        let plain = dependency_requirement(&Dependency::new("ssl", "0.0.0"), &RangePolicy::Exact, false).unwrap();
        assert!(!plain.is_conditional());
    }
}
