//! Integration tests for featgraph CLI commands.
//!
//! Uses tempfile for repository files and redb configuration stores.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use featgraph::cli::{
    CliError, ConfigAction, ValueKind, cmd_build, cmd_config, cmd_providers, cmd_range,
    load_repository, open_admin,
};
use featgraph::json::JsonError;
use featgraph_core::RangePolicy;
use featgraph_core::config::{ConfigAdmin, ConfigError, ConfigFacade};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write a repository with one module, a web feature depending on http, and a
/// conditional on ssl.
fn create_repository(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("repository.json");
    let content = r#"{
        "modules": [
            {
                "location": "mvn:org.web/web-core/1.2.0",
                "name": "web-core",
                "version": "1.2.0",
                "capabilities": ["web.context;path=/app"]
            }
        ],
        "features": [
            { "name": "http", "version": "2.4.0" },
            { "name": "http", "version": "3.0.0" },
            { "name": "ssl", "version": "1.0.0" },
            {
                "name": "webapp",
                "version": "1.2.0",
                "modules": [{ "location": "mvn:org.web/web-core/1.2.0" }],
                "dependencies": [{ "name": "http", "version": "2.0.0" }],
                "requirements": ["web.context;filter:=\"(path=/app)\""],
                "conditionals": [{ "condition": ["ssl"], "capabilities": ["web.tls"] }]
            }
        ]
    }"#;
    std::fs::write(&path, content).unwrap();
    path
}

fn write_json(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn redb_facade(dir: &TempDir) -> ConfigFacade<Box<dyn ConfigAdmin>> {
    ConfigFacade::new(open_admin(&dir.path().join("config.redb")).unwrap())
}

fn run(facade: &ConfigFacade<Box<dyn ConfigAdmin>>, action: ConfigAction) -> Result<String, CliError> {
    cmd_config(facade, action, false)
}

// =============================================================================
// RANGE COMMAND TESTS
// =============================================================================

#[test]
fn test_range_policies() {
    assert_eq!(
        cmd_range("1.2.3", &RangePolicy::SameMinor, false).unwrap(),
        "[1.2.3,1.3.0)"
    );
    let masked = RangePolicy::parse("${range;[==,=+)}").unwrap();
    assert_eq!(cmd_range("1.2.3", &masked, false).unwrap(), "[1.2,1.3)");
    assert_eq!(
        cmd_range("[1.0,2.0)", &RangePolicy::Exact, false).unwrap(),
        "[1.0,2.0)"
    );
}

#[test]
fn test_range_json_mode() {
    let output = cmd_range("0.0.0", &RangePolicy::SameMajor, true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["unconstrained"], true);
    assert!(value["range"].is_null());
}

#[test]
fn test_range_malformed_version() {
    let result = cmd_range("one.two", &RangePolicy::Exact, false);
    assert!(matches!(result, Err(CliError::Feature(_))));
}

// =============================================================================
// BUILD COMMAND TESTS
// =============================================================================

#[test]
fn test_load_repository() {
    let temp = create_temp_dir();
    let repository = load_repository(&create_repository(&temp)).unwrap();
    assert_eq!(repository.modules.len(), 1);
    assert_eq!(repository.features.len(), 4);
}

#[test]
fn test_load_missing_repository() {
    let result = load_repository(Path::new("/nonexistent/repository.json"));
    assert!(matches!(result, Err(CliError::Io { .. })));
}

#[test]
fn test_load_invalid_json() {
    let temp = create_temp_dir();
    let path = write_json(&temp, "bad.json", "{ not json");
    assert!(matches!(load_repository(&path), Err(CliError::Json { .. })));
}

#[test]
fn test_build_text_output() {
    let temp = create_temp_dir();
    let output = cmd_build(&create_repository(&temp), &RangePolicy::SameMajor, false).unwrap();

    assert!(output.contains("web-core/1.2.0 [module]"));
    assert!(output.contains("webapp/1.2.0 [feature]"));
    assert!(output.contains("webapp-condition-ssl/1.2.0 [feature]"));
    assert!(output.contains("(!(version>=3.0.0))"));
}

#[test]
fn test_build_json_output() {
    let temp = create_temp_dir();
    let output = cmd_build(&create_repository(&temp), &RangePolicy::SameMajor, true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();

    assert_eq!(value["modules"].as_array().unwrap().len(), 1);
    let features = value["features"].as_array().unwrap();
    assert_eq!(features.len(), 5);
    assert_eq!(features[4]["name"], "webapp-condition-ssl");
    assert_eq!(features[4]["type"], "feature");
}

#[test]
fn test_build_unresolved_module() {
    let temp = create_temp_dir();
    let path = write_json(
        &temp,
        "broken.json",
        r#"{ "features": [{ "name": "webapp", "modules": [{ "location": "nowhere" }] }] }"#,
    );
    let result = cmd_build(&path, &RangePolicy::Exact, false);
    assert!(matches!(
        result,
        Err(CliError::Feature(
            featgraph_core::FeatureError::UnresolvedModuleReference { .. }
        ))
    ));
}

// =============================================================================
// PROVIDERS COMMAND TESTS
// =============================================================================

#[test]
fn test_providers_lists_matches() {
    let temp = create_temp_dir();
    let output = cmd_providers(
        &create_repository(&temp),
        "webapp",
        &RangePolicy::SameMajor,
        true,
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    let requirements = value["requirements"].as_array().unwrap();

    assert_eq!(requirements.len(), 3);
    assert_eq!(requirements[0]["providers"][0], "web-core/1.2.0");
    assert_eq!(requirements[1]["providers"][0], "http/2.4.0");
    assert_eq!(requirements[1]["providers"].as_array().unwrap().len(), 1);
    assert_eq!(requirements[2]["providers"][0], "web-core/1.2.0");
}

#[test]
fn test_providers_unknown_feature() {
    let temp = create_temp_dir();
    let result = cmd_providers(&create_repository(&temp), "nope", &RangePolicy::Exact, false);
    assert!(matches!(result, Err(CliError::NotFound(_))));
}

// =============================================================================
// CONFIG COMMAND TESTS
// =============================================================================

#[test]
fn test_config_create_list_delete() {
    let temp = create_temp_dir();
    let facade = redb_facade(&temp);

    run(&facade, ConfigAction::Create { pid: "org.web".into() }).unwrap();
    run(&facade, ConfigAction::Create { pid: "org.db".into() }).unwrap();
    assert_eq!(run(&facade, ConfigAction::List).unwrap(), "org.db\norg.web");

    run(&facade, ConfigAction::Delete { pid: "org.db".into() }).unwrap();
    assert_eq!(run(&facade, ConfigAction::List).unwrap(), "org.web");
}

#[test]
fn test_config_delete_missing_is_not_found() {
    let temp = create_temp_dir();
    let facade = redb_facade(&temp);
    run(&facade, ConfigAction::Create { pid: "org.web".into() }).unwrap();

    let result = run(&facade, ConfigAction::Delete { pid: "missing".into() });
    match result {
        Err(CliError::Management(fault)) => {
            assert_eq!(fault.cause, ConfigError::NotFound("missing".into()));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(run(&facade, ConfigAction::List).unwrap(), "org.web");
}

#[test]
fn test_config_set_append_get() {
    let temp = create_temp_dir();
    let facade = redb_facade(&temp);
    run(&facade, ConfigAction::Create { pid: "org.web".into() }).unwrap();

    run(
        &facade,
        ConfigAction::Set {
            pid: "org.web".into(),
            key: "a".into(),
            value: "foo".into(),
            kind: ValueKind::String,
        },
    )
    .unwrap();
    run(
        &facade,
        ConfigAction::Append {
            pid: "org.web".into(),
            key: "a".into(),
            value: "b".into(),
        },
    )
    .unwrap();

    let value = run(
        &facade,
        ConfigAction::Get {
            pid: "org.web".into(),
            key: "a".into(),
        },
    )
    .unwrap();
    assert_eq!(value, "foob");
}

#[test]
fn test_config_append_to_long_fails() {
    let temp = create_temp_dir();
    let facade = redb_facade(&temp);
    run(&facade, ConfigAction::Create { pid: "org.web".into() }).unwrap();
    run(
        &facade,
        ConfigAction::Set {
            pid: "org.web".into(),
            key: "port".into(),
            value: "8080".into(),
            kind: ValueKind::Long,
        },
    )
    .unwrap();

    let result = run(
        &facade,
        ConfigAction::Append {
            pid: "org.web".into(),
            key: "port".into(),
            value: "1".into(),
        },
    );
    assert!(matches!(
        result,
        Err(CliError::Management(fault)) if matches!(fault.cause, ConfigError::InvalidState(_))
    ));
}

#[test]
fn test_config_update_and_props() {
    let temp = create_temp_dir();
    let facade = redb_facade(&temp);
    run(&facade, ConfigAction::Create { pid: "org.web".into() }).unwrap();

    let file = write_json(&temp, "props.json", r#"{ "port": 9090, "name": "web", "tags": ["a", "b"] }"#);
    run(
        &facade,
        ConfigAction::Update {
            pid: "org.web".into(),
            file,
        },
    )
    .unwrap();

    let props = run(&facade, ConfigAction::Props { pid: "org.web".into() }).unwrap();
    assert_eq!(props, "name = web\nport = 9090\ntags = a,b");
}

#[test]
fn test_config_update_rejects_float() {
    let temp = create_temp_dir();
    let facade = redb_facade(&temp);
    run(&facade, ConfigAction::Create { pid: "org.web".into() }).unwrap();

    let file = write_json(&temp, "props.json", r#"{ "ratio": 0.5 }"#);
    let result = run(
        &facade,
        ConfigAction::Update {
            pid: "org.web".into(),
            file,
        },
    );
    assert!(matches!(
        result,
        Err(CliError::Properties(JsonError::NotAnInteger(ref key))) if key == "ratio"
    ));
    assert_eq!(run(&facade, ConfigAction::Props { pid: "org.web".into() }).unwrap(), "");
}

#[test]
fn test_config_factory() {
    let temp = create_temp_dir();
    let facade = redb_facade(&temp);

    let first = run(
        &facade,
        ConfigAction::Factory {
            factory_pid: "org.web.ctx".into(),
            file: None,
        },
    )
    .unwrap();
    assert_eq!(first, "org.web.ctx.1");

    let pid = cmd_config(
        &facade,
        ConfigAction::Factory {
            factory_pid: "org.web.ctx".into(),
            file: None,
        },
        true,
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&pid).unwrap();
    assert_eq!(value["pid"], "org.web.ctx.2");
}

#[test]
fn test_config_persists_across_opens() {
    let temp = create_temp_dir();
    {
        let facade = redb_facade(&temp);
        run(&facade, ConfigAction::Create { pid: "org.web".into() }).unwrap();
    }
    let facade = redb_facade(&temp);
    assert_eq!(run(&facade, ConfigAction::List).unwrap(), "org.web");
}

#[test]
fn test_memory_store() {
    let facade = ConfigFacade::new(open_admin(Path::new(":memory:")).unwrap());
    run(&facade, ConfigAction::Create { pid: "org.web".into() }).unwrap();
    assert_eq!(run(&facade, ConfigAction::List).unwrap(), "org.web");
}
