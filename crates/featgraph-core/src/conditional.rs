//! # Conditional Expander
//!
//! A conditional variant becomes its own feature resource, named
//! `<base>-condition-<tokens joined by _>` and versioned like the base.
//! Characters outside `[A-Za-z0-9._-]` in a token are folded to `_` so the
//! name stays a plain identity token. Gating tokens become requirements:
//!
//! - `req:<expression>`: parsed like any declared requirement
//! - `name[/version]`: a feature dependency marked `condition:=true`
//!
//! The variant always ends with an unconditional requirement on its base
//! feature, so it can never be selected without it.

use crate::builder::parse_requirement;
use crate::descriptor::{Conditional, Dependency, FeatureDescriptor};
use crate::policy::{RangePolicy, UNCONSTRAINED_VERSION};
use crate::resource::{Resource, ResourceType};
use crate::translator::{
    Content, FeatureResource, ModuleLocations, build, dependency_requirement, populate,
};
use crate::version::Version;
use crate::{FeatureError, FeatureResult};

/// Prefix of a raw requirement token.
pub const REQUIREMENT_TOKEN_PREFIX: &str = "req:";

/// Name of the resource a conditional of `base` is built as.
pub fn conditional_name(base: &str, conditional: &Conditional) -> String {
    let tokens: Vec<String> = conditional.condition.iter().map(|t| name_token(t)).collect();
    format!("{base}-condition-{}", tokens.join("_"))
}

/// Fold each run of characters outside `[A-Za-z0-9._-]` into one `_`,
/// dropping it at the edges.
fn name_token(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut pending = false;
    for c in token.trim().chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            if pending && !out.is_empty() {
                out.push('_');
            }
            pending = false;
            out.push(c);
        } else {
            pending = true;
        }
    }
    out
}

/// Build the resource for one conditional variant of `base`.
pub fn build_conditional(
    base: &FeatureDescriptor,
    conditional: &Conditional,
    policy: &RangePolicy,
    locations: &ModuleLocations,
) -> FeatureResult<FeatureResource> {
    if conditional.condition.is_empty() {
        return Err(FeatureError::expression(
            &base.id(),
            "",
            "conditional has no condition tokens",
        ));
    }
    let version = Version::parse(&base.version)?;
    let mut resource = Resource::new(
        conditional_name(&base.name, conditional),
        ResourceType::Feature,
        version,
    );
    populate(&mut resource, Content::from(conditional), policy, locations)?;

    for token in &conditional.condition {
        if let Some(expression) = token.strip_prefix(REQUIREMENT_TOKEN_PREFIX) {
            parse_requirement(&mut resource, expression)?;
        } else {
            let requirement = dependency_requirement(&condition_dependency(token)?, policy, true)?;
            resource.add_requirement(requirement);
        }
    }

    let base_dependency = Dependency::new(base.name.clone(), base.version.clone());
    resource.add_requirement(dependency_requirement(&base_dependency, policy, false)?);

    Ok(FeatureResource::new(
        resource,
        base.clone(),
        Some(conditional.clone()),
    ))
}

/// `name[/version]`; a missing version is unconstrained.
fn condition_dependency(token: &str) -> FeatureResult<Dependency> {
    let dependency = match token.split_once('/') {
        Some((name, version)) => Dependency::new(name.trim(), version.trim()),
        None => Dependency::new(token.trim(), UNCONSTRAINED_VERSION),
    };
    if dependency.name.is_empty() {
        return Err(FeatureError::expression(token, token, "condition token names no feature"));
    }
    Ok(dependency)
}

/// Build every feature followed by its conditionals, in source order.
///
/// The first failure aborts the whole batch.
pub fn build_repository(
    features: &[FeatureDescriptor],
    policy: &RangePolicy,
    locations: &ModuleLocations,
) -> FeatureResult<Vec<FeatureResource>> {
    let mut built = Vec::with_capacity(features.len());
    for feature in features {
        built.push(build(feature, policy, locations)?);
        for conditional in &feature.conditionals {
            built.push(build_conditional(feature, conditional, policy, locations)?);
        }
    }
    Ok(built)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ModuleRef;
    use crate::identity::{IDENTITY_NAMESPACE, identity_capability};
    use crate::FeatureError;

    fn webapp() -> FeatureDescriptor {
        let mut feature = FeatureDescriptor::new("webapp", "1.2.0");
        feature.conditionals.push(Conditional {
            condition: vec!["ssl/2.0.0".to_string(), "req:osgi.ee;filter:=\"(osgi.ee=JavaSE)\"".to_string()],
            capabilities: vec!["web.tls".to_string()],
            ..Conditional::default()
        });
        feature
    }

    fn filters(resource: &Resource) -> Vec<String> {
        resource
            .requirements()
            .iter()
            .map(|r| r.filter().map(ToString::to_string).unwrap_or_default())
            .collect()
    }

    #[test]
    fn name_joins_tokens() {
        let cond = Conditional {
            condition: vec!["ssl".to_string(), "jmx/1.0".to_string()],
            ..Conditional::default()
        };
        assert_eq!(conditional_name("webapp", &cond), "webapp-condition-ssl_jmx_1.0");
    }

    #[test]
    fn empty_tokens_are_rejected() {
        let base = FeatureDescriptor::new("webapp", "1.2.0");
        for token in ["", "   ", "/1.0.0"] {
            let cond = Conditional {
                condition: vec![token.to_string()],
                ..Conditional::default()
            };
            let err = build_conditional(&base, &cond, &RangePolicy::Exact, &ModuleLocations::new())
                .unwrap_err();
            assert!(
                matches!(&err, FeatureError::MalformedExpression { expression, .. } if expression == token),
                "{token:?}: {err}"
            );
        }

        let none = Conditional::default();
        assert!(matches!(
            build_conditional(&base, &none, &RangePolicy::Exact, &ModuleLocations::new()),
            Err(FeatureError::MalformedExpression { .. })
        ));
    }

    #[test]
    fn variant_is_versioned_like_base() {
        let base = webapp();
        let built = build_conditional(&base, &base.conditionals[0], &RangePolicy::Exact, &ModuleLocations::new())
            .unwrap();
        let resource = built.resource();
        assert_eq!(
            resource.name(),
            "webapp-condition-ssl_2.0.0_req_osgi.ee_filter_osgi.ee_JavaSE"
        );
        assert_eq!(resource.version(), &Version::new(1, 2, 0));
        assert!(built.is_conditional());
        assert_eq!(built.feature().name, "webapp");
        assert_eq!(resource.capabilities_in("web.tls").count(), 1);
    }

    #[test]
    fn tokens_and_base_requirement_in_order() {
        let base = webapp();
        let built = build_conditional(&base, &base.conditionals[0], &RangePolicy::Exact, &ModuleLocations::new())
            .unwrap();
        let requirements = built.resource().requirements();

        assert_eq!(
            filters(built.resource()),
            vec![
                "(&(osgi.identity=ssl)(type=feature)(version=2.0.0))",
                "(osgi.ee=JavaSE)",
                "(&(osgi.identity=webapp)(type=feature)(version=1.2.0))",
            ]
        );
        assert!(requirements[0].is_conditional());
        assert!(!requirements[1].is_conditional());
        assert!(!requirements[2].is_conditional());
    }

    #[test]
    fn every_variant_requires_its_base_unconditionally() {
        let mut base = FeatureDescriptor::new("core", "3.1.0");
        base.conditionals.push(Conditional {
            condition: vec!["a".to_string()],
            ..Conditional::default()
        });
        base.conditionals.push(Conditional {
            condition: vec!["req:svc".to_string()],
            ..Conditional::default()
        });
        base.conditionals.push(Conditional::default());

        let base_identity = identity_capability("core", &ResourceType::Feature, &Version::new(3, 1, 0));
        for policy in [RangePolicy::Exact, RangePolicy::SameMajor, RangePolicy::AtLeast] {
            let all = build_repository(std::slice::from_ref(&base), &policy, &ModuleLocations::new()).unwrap();
            assert_eq!(all.len(), 4);
            for variant in all.iter().filter(|r| r.is_conditional()) {
                let last = variant.resource().requirements().last().unwrap();
                assert_eq!(last.namespace(), IDENTITY_NAMESPACE);
                assert!(!last.is_conditional());
                assert!(last.matches(&base_identity));
            }
        }
    }

    #[test]
    fn bare_token_is_unconstrained() {
        let mut base = FeatureDescriptor::new("webapp", "1.0.0");
        base.conditionals.push(Conditional {
            condition: vec!["jmx".to_string()],
            ..Conditional::default()
        });
        let built = build_conditional(&base, &base.conditionals[0], &RangePolicy::SameMajor, &ModuleLocations::new())
            .unwrap();
        assert_eq!(
            filters(built.resource())[0],
            "(&(osgi.identity=jmx)(type=feature))"
        );
    }

    #[test]
    fn repository_keeps_source_order_and_aborts_on_error() {
        let mut first = FeatureDescriptor::new("a", "1.0.0");
        first.conditionals.push(Conditional {
            condition: vec!["x".to_string()],
            ..Conditional::default()
        });
        let second = FeatureDescriptor::new("b", "1.0.0");

        let built = build_repository(&[first.clone(), second], &RangePolicy::Exact, &ModuleLocations::new())
            .unwrap();
        let names: Vec<_> = built.iter().map(|r| r.resource().name().to_string()).collect();
        assert_eq!(names, vec!["a", "a-condition-x", "b"]);

        let mut broken = FeatureDescriptor::new("c", "1.0.0");
        broken.conditionals.push(Conditional {
            condition: vec!["y".to_string()],
            modules: vec![ModuleRef::new("missing")],
            ..Conditional::default()
        });
        let result = build_repository(&[first, broken], &RangePolicy::Exact, &ModuleLocations::new());
        assert!(matches!(result, Err(FeatureError::UnresolvedModuleReference { .. })));
    }
}
