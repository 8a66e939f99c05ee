//! # Resource Index
//!
//! Direct capability matching over a fixed set of resources. This answers
//! "which resources could satisfy this requirement" and nothing more: there
//! is no search, no backtracking and no conflict handling.

use crate::resource::{Requirement, Resource};
use crate::translator::FeatureResource;

/// An immutable set of resources that can be queried for providers.
#[derive(Debug, Clone, Default)]
pub struct ResourceIndex {
    resources: Vec<Resource>,
}

impl ResourceIndex {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.name() == name)
    }

    /// Resources with at least one capability matching `requirement`, in
    /// insertion order. Empty when nothing matches.
    #[must_use]
    pub fn find_providers(&self, requirement: &Requirement) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|resource| {
                resource
                    .capabilities()
                    .iter()
                    .any(|capability| requirement.matches(capability))
            })
            .collect()
    }
}

impl FromIterator<Resource> for ResourceIndex {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl FromIterator<FeatureResource> for ResourceIndex {
    fn from_iter<I: IntoIterator<Item = FeatureResource>>(iter: I) -> Self {
        iter.into_iter().map(FeatureResource::into_resource).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
