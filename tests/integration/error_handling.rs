// tests/integration/error_handling.rs

use std::io::Write;

use buildplan::config::{load_and_validate, load_from_path};
use buildplan::errors::BuildPlanError;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_dag_cycle_returns_structured_error() {
    let file = config_file(
        r#"
[task.A]
after = ["B"]

[task.B]
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(BuildPlanError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("A") || msg.contains("B"));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_dependency_returns_config_error() {
    let file = config_file(
        r#"
[task.A]
after = ["NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(BuildPlanError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_self_dependency_returns_config_error() {
    let file = config_file(
        r#"
[task.A]
after = ["A"]
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, BuildPlanError::ConfigError(msg) if msg.contains("itself")));
}

#[test]
fn test_unknown_artifact_reference_returns_config_error() {
    let file = config_file(
        r#"
[task.compile.properties.deps]
classes = { output_of = "ghost" }
"#,
    );

    match load_and_validate(file.path()) {
        Err(BuildPlanError::ConfigError(msg)) => {
            assert!(msg.contains("ghost"));
            assert!(msg.contains("output_of"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_empty_config_is_rejected() {
    let file = config_file("[config]\ndispatch_order = \"last\"\n");

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, BuildPlanError::ConfigError(msg) if msg.contains("at least one")));
}

#[test]
fn test_invalid_toml_returns_toml_error() {
    let file = config_file("[task.A\nafter = ");

    let err = load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, BuildPlanError::TomlError(_)));
}

#[test]
fn test_unknown_dispatch_order_returns_toml_error() {
    let file = config_file(
        r#"
[config]
dispatch_order = "random"

[task.A]
"#,
    );

    let err = load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, BuildPlanError::TomlError(_)));
}

#[test]
fn test_missing_file_returns_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("Buildplan.toml")).unwrap_err();
    assert!(matches!(err, BuildPlanError::IoError(_)));
}

#[test]
fn test_valid_config_loads_with_defaults() {
    let file = config_file(
        r#"
[task.generate.properties]
out = { output = "build/gen" }

[task.compile]
description = "compile sources"
[task.compile.properties]
sources = { output_of = "generate" }
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.task_names().collect::<Vec<_>>(), vec!["compile", "generate"]);
    assert!(!cfg.config.fail_on_diagnostics);
    assert_eq!(
        cfg.task["compile"].description.as_deref(),
        Some("compile sources")
    );
}
