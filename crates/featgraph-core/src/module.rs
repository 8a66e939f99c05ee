//! # Module Builder
//!
//! Builds module resources from their manifests. The resulting table, keyed
//! by location, is what the translator looks module references up in.

use crate::builder::{parse_capability, parse_requirement};
use crate::descriptor::ModuleManifest;
use crate::resource::{Resource, ResourceType};
use crate::translator::ModuleLocations;
use crate::version::Version;
use crate::FeatureResult;

/// Build one module resource.
pub fn build_module(manifest: &ModuleManifest) -> FeatureResult<Resource> {
    let version = Version::parse(&manifest.version)?;
    let mut resource = Resource::new(manifest.name.clone(), ResourceType::Module, version);
    for expression in &manifest.capabilities {
        parse_capability(&mut resource, expression)?;
    }
    for expression in &manifest.requirements {
        parse_requirement(&mut resource, expression)?;
    }
    Ok(resource)
}

/// Build every manifest into a location table.
///
/// A later manifest with the same location replaces an earlier one.
pub fn build_modules(manifests: &[ModuleManifest]) -> FeatureResult<ModuleLocations> {
    let mut locations = ModuleLocations::new();
    for manifest in manifests {
        locations.insert(manifest.location.clone(), build_module(manifest)?);
    }
    Ok(locations)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeatureError;

    fn manifest(location: &str, name: &str, version: &str) -> ModuleManifest {
        ModuleManifest {
            location: location.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            capabilities: Vec::new(),
            requirements: Vec::new(),
        }
    }

    #[test]
    fn module_carries_identity_and_declarations() {
        let mut m = manifest("mvn:org.web/http-core/2.1.0", "http-core", "2.1.0");
        m.capabilities.push("osgi.service;objectClass=HttpService".to_string());
        m.requirements.push("osgi.ee;filter:=\"(osgi.ee=JavaSE)\"".to_string());

        let module = build_module(&m).unwrap();
        assert_eq!(module.resource_type(), &ResourceType::Module);
        assert_eq!(module.version(), &Version::new(2, 1, 0));
        assert_eq!(module.capabilities().len(), 2);
        assert_eq!(module.requirements().len(), 1);
        assert!(module.identity().is_some());
    }

    #[test]
    fn locations_are_keyed_by_location() {
        let table = build_modules(&[
            manifest("loc-a", "a", "1.0"),
            manifest("loc-b", "b", "2.0"),
        ])
        .unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["loc-a", "loc-b"]);
        assert_eq!(table["loc-b"].name(), "b");
    }

    #[test]
    fn bad_version_fails_the_table() {
        let result = build_modules(&[manifest("loc-a", "a", "1.0"), manifest("loc-b", "b", "x")]);
        assert!(matches!(result, Err(FeatureError::MalformedVersion { .. })));
    }
}
