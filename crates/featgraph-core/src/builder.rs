//! # Requirement / Capability Builder
//!
//! Turns clause expressions into requirements and capabilities and appends
//! them to their owner. Parsing is all-or-nothing: if any clause of an
//! expression is malformed, nothing is appended.

use crate::clause::{Clause, parse_clauses};
use crate::filter::Filter;
use crate::resource::{AttrValue, Capability, FILTER_DIRECTIVE, Requirement, Resource};
use crate::FeatureResult;

/// Parse `expression` into requirements owned by `owner`.
///
/// A `filter` directive becomes the requirement's filter. Without one, the
/// clause attributes are turned into an equality conjunction, and a clause
/// with neither matches every capability in its namespace.
pub fn parse_requirement(owner: &mut Resource, expression: &str) -> FeatureResult<Vec<Requirement>> {
    let requirements = requirements_from(expression)?;
    owner.add_requirements(requirements.iter().cloned());
    Ok(requirements)
}

/// Parse `expression` into capabilities owned by `owner`.
pub fn parse_capability(owner: &mut Resource, expression: &str) -> FeatureResult<Vec<Capability>> {
    let capabilities = capabilities_from(expression)?;
    owner.add_capabilities(capabilities.iter().cloned());
    Ok(capabilities)
}

/// Parse requirements without attaching them anywhere.
pub fn requirements_from(expression: &str) -> FeatureResult<Vec<Requirement>> {
    let mut requirements = Vec::new();
    for clause in parse_clauses(expression)? {
        let filter = clause_filter(&clause)?;
        for namespace in &clause.paths {
            requirements.push(Requirement::new(
                namespace.clone(),
                clause.directives.clone(),
                clause.attributes.clone(),
                filter.clone(),
            ));
        }
    }
    Ok(requirements)
}

/// Parse capabilities without attaching them anywhere.
pub fn capabilities_from(expression: &str) -> FeatureResult<Vec<Capability>> {
    let mut capabilities = Vec::new();
    for clause in parse_clauses(expression)? {
        for namespace in &clause.paths {
            capabilities.push(Capability::new(
                namespace.clone(),
                clause.directives.clone(),
                clause.attributes.clone(),
            ));
        }
    }
    Ok(capabilities)
}

fn clause_filter(clause: &Clause) -> FeatureResult<Option<Filter>> {
    if let Some(text) = clause.directives.get(FILTER_DIRECTIVE) {
        return Filter::parse(text).map(Some);
    }
    if clause.attributes.is_empty() {
        return Ok(None);
    }

    let mut terms = Vec::new();
    for (key, value) in &clause.attributes {
        match value {
            AttrValue::StringList(items) => {
                terms.extend(items.iter().map(|item| Filter::equal(key, item)));
            }
            AttrValue::VersionList(items) => {
                terms.extend(items.iter().map(|item| Filter::equal(key, item.to_string())));
            }
            AttrValue::LongList(items) => {
                terms.extend(items.iter().map(|item| Filter::equal(key, item.to_string())));
            }
            single => terms.push(Filter::equal(key, single.to_clause_text())),
        }
    }
    if terms.is_empty() {
        return Ok(None);
    }
    Ok(Some(Filter::and(terms)))
}

// =============================================================================
// TESTS
// =============================================================================
