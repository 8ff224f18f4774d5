// tests/integration/config_bean.rs

use std::sync::Arc;

use buildplan::config::TableBean;
use buildplan::errors::AccessorError;
use buildplan::property::{Bean, Buildable, DeclaredType, Value};
use buildplan::walk::kinds;

fn bean(toml_src: &str) -> Arc<TableBean> {
    let table: toml::Table = toml::from_str(toml_src).unwrap();
    TableBean::for_task("compile", &table)
}

fn kind_of(bean: &TableBean, name: &str) -> Option<(String, DeclaredType)> {
    bean.type_metadata()
        .properties()
        .iter()
        .find(|p| p.name == name)
        .map(|p| (p.kind.clone(), p.declared))
}

fn assert_kind(bean: &TableBean, name: &str, kind: &str, declared: DeclaredType) {
    assert_eq!(kind_of(bean, name), Some((kind.to_string(), declared)), "property {name}");
}

#[test]
fn keys_are_classified_by_value_shape() {
    let bean = bean(
        r#"
flags = "-O2"
jobs = 4
srcs = ["a.c", "b.c"]
out = { output = "build/out" }
classes = { output_of = "generate" }
version = { value_of = "generate" }
_scratch = "ignored"

[inputs]
files = ["x"]

[[plugins]]
name = "strip"
"#,
    );

    let plain = DeclaredType::PLAIN;
    assert_kind(&bean, "flags", kinds::INPUT, plain);
    assert_kind(&bean, "jobs", kinds::INPUT, plain);
    assert_kind(&bean, "srcs", kinds::INPUT_FILES, plain);
    assert_kind(&bean, "out", kinds::OUTPUT_FILES, plain);
    assert_kind(&bean, "classes", kinds::INPUT_FILES, DeclaredType::BUILDABLE.configurable());
    assert_kind(&bean, "version", kinds::INPUT, DeclaredType::DEFERRED.configurable());
    assert_kind(&bean, "_scratch", kinds::INTERNAL, plain);
    assert_kind(&bean, "inputs", kinds::NESTED, plain);
    assert_kind(&bean, "plugins", kinds::NESTED, plain);
    assert!(bean.type_metadata().problems().is_empty());
}

#[test]
fn malformed_values_become_type_problems() {
    let bean = bean(
        r#"
mixed = ["a", { b = 1 }]
when = 1979-05-27T07:32:00Z
empty = { output_of = "" }
number = { value_of = 3 }
extra = { output_of = "generate", mode = "fast" }
"#,
    );
    let metadata = bean.type_metadata();
    let problems: Vec<(&str, &str)> = metadata
        .problems()
        .iter()
        .map(|p| (p.property.as_str(), p.message.as_str()))
        .collect();

    assert_eq!(problems.len(), 5);
    assert!(problems.iter().any(|(p, m)| *p == "mixed" && m.contains("mixes")));
    assert!(problems.iter().any(|(p, m)| *p == "when" && m.contains("datetime")));
    assert!(problems.iter().any(|(p, m)| *p == "empty" && m.contains("empty")));
    assert!(problems.iter().any(|(p, m)| *p == "number" && m.contains("string")));
    assert!(problems.iter().any(|(p, m)| *p == "extra" && m.contains("mode")));

    // Only the reference with extra keys is still declared.
    let declared: Vec<&str> = metadata.properties().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(declared, vec!["extra"]);
}

#[test]
fn repeated_reads_share_artifacts() {
    let bean = bean(r#"classes = { output_of = "generate" }"#);

    let first = bean.read_property("classes").unwrap();
    let second = bean.read_property("classes").unwrap();

    match (first, second) {
        (Some(Value::Artifact(a)), Some(Value::Artifact(b))) => {
            assert!(Arc::ptr_eq(&a, &b));
            assert_eq!(a.producers(), vec!["generate".to_string()]);
        }
        other => panic!("expected artifacts, got {other:?}"),
    }
}

#[test]
fn unknown_accessor_is_an_invocation_error() {
    let bean = bean(r#"flags = "-g""#);

    let err = bean.read_property("nope").unwrap_err();

    assert!(matches!(err, AccessorError::Invocation(msg) if msg.contains("nope")));
}

#[test]
fn nested_tables_know_their_path() {
    let bean = bean(
        r#"
[inputs.extra]
files = ["x"]
"#,
    );

    assert_eq!(bean.display_name(), "task 'compile'");

    let Some(Value::Object(inputs)) = bean.read_property("inputs").unwrap() else {
        panic!("inputs should be a nested bean");
    };
    let Some(Value::Object(extra)) = inputs.read_property("extra").unwrap() else {
        panic!("extra should be a nested bean");
    };
    assert_eq!(extra.display_name(), "task 'compile' table 'inputs.extra'");
}

#[test]
fn deprecated_reference_key_still_works() {
    let bean = bean(r#"classes = { from = "generate" }"#);

    assert_kind(&bean, "classes", kinds::INPUT_FILES, DeclaredType::BUILDABLE.configurable());
    assert!(matches!(
        bean.read_property("classes").unwrap(),
        Some(Value::Artifact(_))
    ));
}

#[test]
fn reference_arrays_become_one_value_per_family() {
    let bean = bean(
        r#"
srcs = [{ output_of = "gen" }, { from = "tools" }]
versions = [{ value_of = "gen" }]
outs = [{ output = "a" }, { output = "b" }]
both = [{ output_of = "gen" }, { value_of = "gen" }]
half = [{ output_of = "gen" }, { name = "plain" }]
"#,
    );

    assert_kind(&bean, "srcs", kinds::INPUT_FILES, DeclaredType::BUILDABLE.configurable());
    assert_kind(&bean, "versions", kinds::INPUT, DeclaredType::DEFERRED.configurable());
    assert_kind(&bean, "outs", kinds::OUTPUT_FILES, DeclaredType::PLAIN);
    assert_eq!(kind_of(&bean, "both"), None);
    assert_eq!(kind_of(&bean, "half"), None);

    let Some(Value::Artifact(srcs)) = bean.read_property("srcs").unwrap() else {
        panic!("srcs should be one artifact");
    };
    assert_eq!(srcs.producers(), vec!["gen".to_string(), "tools".to_string()]);

    let metadata = bean.type_metadata();
    let problem = |name: &str| {
        metadata
            .problems()
            .iter()
            .find(|p| p.property == name)
            .map(|p| p.message.clone())
            .unwrap_or_default()
    };
    assert!(problem("both").contains("mixes `output_of` and `value_of`"));
    assert!(problem("half").contains("mixes artifact references and nested tables"));
}

#[test]
fn deeply_nested_tables_are_all_reachable() {
    const DEPTH: usize = 500;
    let mut table = toml::Table::new();
    table.insert("leaf".to_string(), toml::Value::from(true));
    for _ in 0..DEPTH {
        let mut parent = toml::Table::new();
        parent.insert("n".to_string(), toml::Value::Table(table));
        table = parent;
    }

    let mut current: Arc<dyn Bean> = TableBean::for_task("deep", &table);
    let mut levels = 0;
    while let Some(Value::Object(next)) = current.read_property("n").unwrap_or(None) {
        current = next;
        levels += 1;
    }

    assert_eq!(levels, DEPTH);
    assert!(matches!(current.read_property("leaf").unwrap(), Some(Value::Flag(true))));
    assert!(current.display_name().ends_with(".n'"));
}
