//! # CLI Commands
//!
//! Each `cmd_*` function runs one command and returns the text to print, so
//! the binary only has to write it to stdout. With `json` set the output is
//! pretty-printed JSON, otherwise a human-readable listing.

use crate::json::{JsonError, properties_from_json, properties_to_json, property_to_json};
use featgraph_core::config::{
    ConfigAdmin, ConfigError, ConfigFacade, ManagementFault, MemoryConfigAdmin, PropertyValue,
    RedbConfigAdmin,
};
use featgraph_core::{
    FeatureError, FeatureDescriptor, FeatureResource, ModuleManifest, RangePolicy, Resource,
    ResourceIndex, build_modules, build_repository, compute_effective_range,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Store path that selects the in-memory backend.
pub const MEMORY_STORE: &str = ":memory:";

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Management(#[from] ManagementFault),

    #[error("cannot open configuration store: {0}")]
    Store(#[from] ConfigError),

    #[error(transparent)]
    Properties(#[from] JsonError),

    #[error("{0}")]
    Invalid(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type CliResult<T> = Result<T, CliError>;

fn to_json<T: Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::Invalid(e.to_string()))
}

// =============================================================================
// REPOSITORY FILES
// =============================================================================

/// A repository file: module manifests plus feature descriptors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryFile {
    #[serde(default)]
    pub modules: Vec<ModuleManifest>,
    #[serde(default)]
    pub features: Vec<FeatureDescriptor>,
}

/// Everything built from one repository file.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltRepository {
    pub modules: Vec<Resource>,
    pub features: Vec<FeatureResource>,
}

pub fn load_repository(path: &Path) -> CliResult<RepositoryFile> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Build modules, then features and their conditionals.
pub fn build_repository_file(
    repository: &RepositoryFile,
    policy: &RangePolicy,
) -> CliResult<BuiltRepository> {
    let locations = build_modules(&repository.modules)?;
    let features = build_repository(&repository.features, policy, &locations)?;
    tracing::debug!(
        modules = locations.len(),
        features = features.len(),
        "repository built"
    );
    Ok(BuiltRepository {
        modules: locations.into_values().collect(),
        features,
    })
}

fn describe(resource: &Resource, out: &mut String) {
    out.push_str(&format!("{} [{}]\n", resource, resource.resource_type()));
    for capability in resource.capabilities() {
        out.push_str(&format!("  provide  {capability}\n"));
    }
    for requirement in resource.requirements() {
        out.push_str(&format!("  require  {requirement}\n"));
    }
}

// =============================================================================
// MODEL COMMANDS
// =============================================================================

/// Print the effective range of a floor version under `policy`.
pub fn cmd_range(floor: &str, policy: &RangePolicy, json: bool) -> CliResult<String> {
    let range = compute_effective_range(floor, policy)?;
    if json {
        return to_json(&json!({
            "floor": floor,
            "policy": policy.to_string(),
            "unconstrained": range.is_unconstrained(),
            "range": range.text(),
        }));
    }
    Ok(range.to_string())
}

/// Build a repository file and print every resource.
pub fn cmd_build(path: &Path, policy: &RangePolicy, json: bool) -> CliResult<String> {
    let repository = load_repository(path)?;
    let built = build_repository_file(&repository, policy)?;
    tracing::info!(
        path = %path.display(),
        policy = %policy,
        features = built.features.len(),
        "built repository"
    );

    if json {
        return to_json(&built);
    }
    let mut out = String::new();
    for module in &built.modules {
        describe(module, &mut out);
    }
    for feature in &built.features {
        describe(feature.resource(), &mut out);
    }
    Ok(out)
}

/// List which built resources satisfy each requirement of `feature`.
pub fn cmd_providers(
    path: &Path,
    feature: &str,
    policy: &RangePolicy,
    json: bool,
) -> CliResult<String> {
    let repository = load_repository(path)?;
    let built = build_repository_file(&repository, policy)?;
    let index: ResourceIndex = built
        .modules
        .into_iter()
        .chain(built.features.into_iter().map(FeatureResource::into_resource))
        .collect();

    let target = index
        .get(feature)
        .next()
        .ok_or_else(|| CliError::NotFound(format!("feature '{feature}'")))?;

    let rows: Vec<(String, bool, Vec<String>)> = target
        .requirements()
        .iter()
        .map(|requirement| {
            let providers = index
                .find_providers(requirement)
                .iter()
                .map(|resource| resource.to_string())
                .collect();
            (requirement.to_string(), requirement.is_optional(), providers)
        })
        .collect();

    let unsatisfied = rows
        .iter()
        .filter(|(_, optional, providers)| !optional && providers.is_empty())
        .count();
    if unsatisfied > 0 {
        tracing::warn!(feature, unsatisfied, "feature has unsatisfied requirements");
    }

    if json {
        let entries: Vec<_> = rows
            .iter()
            .map(|(requirement, optional, providers)| {
                json!({
                    "requirement": requirement,
                    "optional": optional,
                    "providers": providers,
                })
            })
            .collect();
        return to_json(&json!({ "feature": target.to_string(), "requirements": entries }));
    }

    let mut out = format!("{target}\n");
    for (requirement, _, providers) in &rows {
        out.push_str(&format!("  {requirement}\n"));
        if providers.is_empty() {
            out.push_str("    (no provider)\n");
        }
        for provider in providers {
            out.push_str(&format!("    -> {provider}\n"));
        }
    }
    Ok(out)
}

// =============================================================================
// CONFIGURATION COMMANDS
// =============================================================================

/// Value kinds accepted by `config set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ValueKind {
    #[default]
    String,
    Long,
    Boolean,
    List,
}

/// Parse command-line text as a property value of the given kind.
pub fn parse_property_value(text: &str, kind: ValueKind) -> CliResult<PropertyValue> {
    match kind {
        ValueKind::String => Ok(PropertyValue::from(text)),
        ValueKind::Long => text
            .trim()
            .parse()
            .map(PropertyValue::Long)
            .map_err(|_| CliError::Invalid(format!("'{text}' is not a Long"))),
        ValueKind::Boolean => text
            .trim()
            .parse()
            .map(PropertyValue::Boolean)
            .map_err(|_| CliError::Invalid(format!("'{text}' is not a Boolean"))),
        ValueKind::List => Ok(PropertyValue::List(
            text.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToString::to_string)
                .collect(),
        )),
    }
}

/// Configuration management actions.
#[derive(Debug, Clone, clap::Subcommand)]
pub enum ConfigAction {
    /// List all configuration pids
    List,
    /// Create an empty configuration (resets an existing one)
    Create { pid: String },
    /// Delete a configuration
    Delete { pid: String },
    /// List the properties of a configuration
    Props { pid: String },
    /// Print one property
    Get { pid: String, key: String },
    /// Set one property
    Set {
        pid: String,
        key: String,
        value: String,
        /// Value type
        #[arg(long = "type", value_enum, default_value_t = ValueKind::String)]
        kind: ValueKind,
    },
    /// Remove one property
    Unset { pid: String, key: String },
    /// Append text to a string property
    Append {
        pid: String,
        key: String,
        value: String,
    },
    /// Replace all properties from a JSON object file
    Update { pid: String, file: PathBuf },
    /// Create a configuration from a factory pid, properties from a JSON file
    Factory {
        factory_pid: String,
        file: Option<PathBuf>,
    },
}

/// Open the admin service for `store`; `:memory:` selects the in-memory
/// backend.
pub fn open_admin(store: &Path) -> CliResult<Box<dyn ConfigAdmin>> {
    if store.as_os_str() == MEMORY_STORE {
        return Ok(Box::new(MemoryConfigAdmin::new()));
    }
    tracing::debug!(store = %store.display(), "opening configuration store");
    Ok(Box::new(RedbConfigAdmin::open(store)?))
}

fn read_properties(path: &Path) -> CliResult<featgraph_core::config::Properties> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value = serde_json::from_str(&content).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(properties_from_json(value)?)
}

/// Run one configuration action against `facade`.
pub fn cmd_config<A: ConfigAdmin>(
    facade: &ConfigFacade<A>,
    action: ConfigAction,
    json: bool,
) -> CliResult<String> {
    let done = |message: String| -> CliResult<String> {
        if json {
            to_json(&json!({ "status": "ok", "message": message }))
        } else {
            Ok(message)
        }
    };

    match action {
        ConfigAction::List => {
            let pids = facade.configs()?;
            if json {
                return to_json(&pids);
            }
            Ok(pids.join("\n"))
        }
        ConfigAction::Create { pid } => {
            facade.create(&pid)?;
            tracing::info!(%pid, "configuration created");
            done(format!("created {pid}"))
        }
        ConfigAction::Delete { pid } => {
            facade.delete(&pid)?;
            tracing::info!(%pid, "configuration deleted");
            done(format!("deleted {pid}"))
        }
        ConfigAction::Props { pid } => {
            let properties = facade.list_properties(&pid)?;
            if json {
                return to_json(&properties_to_json(&properties));
            }
            Ok(properties
                .iter()
                .map(|(key, value)| format!("{key} = {value}"))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        ConfigAction::Get { pid, key } => {
            let value = facade
                .get_property(&pid, &key)?
                .ok_or_else(|| CliError::NotFound(format!("property '{key}' of '{pid}'")))?;
            if json {
                return to_json(&property_to_json(&value));
            }
            Ok(value.to_string())
        }
        ConfigAction::Set {
            pid,
            key,
            value,
            kind,
        } => {
            facade.set_property(&pid, &key, parse_property_value(&value, kind)?)?;
            done(format!("set {pid} {key}"))
        }
        ConfigAction::Unset { pid, key } => {
            facade.delete_property(&pid, &key)?;
            done(format!("unset {pid} {key}"))
        }
        ConfigAction::Append { pid, key, value } => {
            facade.append_property(&pid, &key, &value)?;
            done(format!("appended to {pid} {key}"))
        }
        ConfigAction::Update { pid, file } => {
            facade.update(&pid, read_properties(&file)?)?;
            tracing::info!(%pid, "configuration replaced");
            done(format!("updated {pid}"))
        }
        ConfigAction::Factory { factory_pid, file } => {
            let properties = match file {
                Some(file) => read_properties(&file)?,
                None => featgraph_core::config::Properties::new(),
            };
            let pid = facade.create_factory_configuration(&factory_pid, properties)?;
            tracing::info!(%factory_pid, %pid, "factory configuration created");
            if json {
                return to_json(&json!({ "pid": pid }));
            }
            Ok(pid)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
