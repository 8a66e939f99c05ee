//! # featgraph-core
//!
//! The deterministic feature dependency model.
//!
//! A feature descriptor (a named, versioned bundle of modules, nested feature
//! dependencies, conditional variants and explicit capability/requirement
//! declarations) is translated into a [`Resource`] carrying capabilities and
//! requirements. The resulting resources are handed to an external resolver,
//! which is not part of this crate.
//!
//! ## Layout
//!
//! ```text
//! version ──► policy ──┐
//!                      ├──► translator ──► conditional ──► Vec<FeatureResource>
//! filter ──► clause ───┤
//!          (builder)   │
//! resource ◄─ identity ┘
//! ```
//!
//! The [`config`] module is a separate facade over an injected configuration
//! administration service.
//!
//! ## Determinism
//!
//! All maps are `BTreeMap`. Requirements and capabilities are attached in
//! source order, so building the same descriptor twice yields identical output.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]

pub mod builder;
pub mod clause;
pub mod conditional;
pub mod config;
pub mod descriptor;
pub mod filter;
pub mod identity;
pub mod index;
pub mod module;
pub mod policy;
pub mod resource;
pub mod translator;
pub mod version;

pub use builder::{parse_capability, parse_requirement};
pub use conditional::{build_conditional, build_repository, conditional_name};
pub use descriptor::{Conditional, Dependency, FeatureDescriptor, ModuleManifest, ModuleRef};
pub use filter::Filter;
pub use identity::{identity_capability, identity_requirement, module_identity_requirement};
pub use index::ResourceIndex;
pub use module::{build_module, build_modules};
pub use policy::{EffectiveRange, RangePolicy, compute_effective_range};
pub use resource::{AttrValue, Capability, Requirement, Resource, ResourceType};
pub use translator::{FeatureResource, ModuleLocations, build};
pub use version::{Version, VersionRange};

use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised while building resources from descriptors.
///
/// None of these are recoverable inside a single feature build: the translator
/// and the conditional expander propagate them immediately and the partially
/// built resource is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// A version or version range string could not be parsed.
    #[error("malformed version '{input}': {reason}")]
    MalformedVersion { input: String, reason: String },

    /// A capability, requirement or filter expression could not be parsed.
    ///
    /// `offending` is the substring the parser stopped at.
    #[error("malformed expression '{expression}' at '{offending}': {reason}")]
    MalformedExpression {
        expression: String,
        offending: String,
        reason: String,
    },

    /// A range policy name or macro is not recognised.
    #[error("unknown range policy '{0}'")]
    UnknownRangePolicy(String),

    /// A mandatory module reference has no built module resource.
    #[error("feature {feature}: no resource found for module location '{location}'")]
    UnresolvedModuleReference { feature: String, location: String },
}

impl FeatureError {
    pub(crate) fn version(input: &str, reason: impl Into<String>) -> Self {
        Self::MalformedVersion {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn expression(
        expression: &str,
        offending: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedExpression {
            expression: expression.to_string(),
            offending: offending.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for model construction.
pub type FeatureResult<T> = Result<T, FeatureError>;
