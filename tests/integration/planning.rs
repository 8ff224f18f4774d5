// tests/integration/planning.rs

use std::sync::Arc;

use buildplan::config::ConfigFile;
use buildplan::engine::{
    DeclaredOutput, PlanOptions, TaskDiscovery, discover_all, plan, plan_build, plan_build_with,
};
use buildplan::errors::{AccessorError, BuildPlanError, PropertyAccessError};
use buildplan::types::DispatchOrder;
use buildplan::walk::{HandlerRegistry, PropertyFailure};
use buildplan_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use buildplan_test_utils::{init_tracing, with_timeout};

/// generate -> compile -> package, linked only through properties, plus an
/// unrelated `lint`.
fn pipeline() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task(
            "generate",
            TaskConfigBuilder::new()
                .description("generate sources")
                .output("out", "build/gen")
                .build(),
        )
        .with_task(
            "compile",
            TaskConfigBuilder::new()
                .output_of("classes", "generate")
                .property("flags", "-O2")
                .build(),
        )
        .with_task(
            "package",
            TaskConfigBuilder::new().value_of("version", "compile").build(),
        )
        .with_task("lint", TaskConfigBuilder::new().build())
        .build()
}

fn mixed_array() -> toml::Value {
    let mut table = toml::Table::new();
    table.insert("b".to_string(), toml::Value::Integer(1));
    toml::Value::Array(vec![toml::Value::from("a"), toml::Value::Table(table)])
}

#[tokio::test]
async fn property_references_order_producers_first() {
    init_tracing();
    let cfg = pipeline();

    let plan = with_timeout(plan_build(&cfg, &PlanOptions::default()))
        .await
        .unwrap();

    assert_eq!(plan.steps.len(), 4);
    let generate = plan.position_of("generate").unwrap();
    let compile = plan.position_of("compile").unwrap();
    let package = plan.position_of("package").unwrap();
    assert!(generate < compile);
    assert!(compile < package);

    let compile_step = &plan.steps[compile];
    assert_eq!(compile_step.deps, vec!["generate".to_string()]);
    assert_eq!(plan.steps[package].deps, vec!["compile".to_string()]);

    let generate_step = &plan.steps[generate];
    assert_eq!(generate_step.description.as_deref(), Some("generate sources"));
    assert_eq!(
        generate_step.outputs,
        vec![DeclaredOutput {
            property: "out".to_string(),
            path: "build/gen".to_string(),
        }]
    );

    let sequences: Vec<u64> = plan.steps.iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);
    assert!(plan.cancelled.is_empty());
    assert!(plan.diagnostics.is_empty());
}

#[tokio::test]
async fn references_inside_nested_tables_are_discovered() {
    let mut plugin = toml::Table::new();
    plugin.insert("name".to_string(), toml::Value::from("strip"));
    let mut source = toml::Table::new();
    source.insert("output_of".to_string(), toml::Value::from("tools"));
    plugin.insert("binary".to_string(), toml::Value::Table(source));

    let mut inputs = toml::Table::new();
    let mut reference = toml::Table::new();
    reference.insert("value_of".to_string(), toml::Value::from("schema"));
    inputs.insert("schema".to_string(), toml::Value::Table(reference));

    let cfg = ConfigFileBuilder::new()
        .with_task("tools", TaskConfigBuilder::new().build())
        .with_task("schema", TaskConfigBuilder::new().build())
        .with_task(
            "build",
            TaskConfigBuilder::new()
                .property(
                    "plugins",
                    toml::Value::Array(vec![toml::Value::Table(plugin)]),
                )
                .nested("inputs", inputs)
                .build(),
        )
        .build();

    let plan = plan_build(&cfg, &PlanOptions::default()).await.unwrap();

    assert_eq!(plan.order().last(), Some(&"build"));
    let build = &plan.steps[plan.position_of("build").unwrap()];
    assert_eq!(build.deps.len(), 2);
    assert!(build.deps.contains(&"tools".to_string()));
    assert!(build.deps.contains(&"schema".to_string()));
}

fn reference(key: &str, target: &str) -> toml::Value {
    let mut table = toml::Table::new();
    table.insert(key.to_string(), toml::Value::from(target));
    toml::Value::Table(table)
}

#[tokio::test]
async fn references_listed_in_arrays_keep_their_edges() {
    let cfg = ConfigFileBuilder::new()
        .with_task("gen", TaskConfigBuilder::new().output("out", "build/gen").build())
        .with_task("tools", TaskConfigBuilder::new().build())
        .with_task(
            "compile",
            TaskConfigBuilder::new()
                .property(
                    "srcs",
                    toml::Value::Array(vec![
                        reference("output_of", "gen"),
                        reference("output_of", "tools"),
                    ]),
                )
                .build(),
        )
        .with_task(
            "package",
            TaskConfigBuilder::new()
                .property(
                    "versions",
                    toml::Value::Array(vec![reference("value_of", "compile")]),
                )
                .build(),
        )
        .build();
    let options = PlanOptions {
        order_override: Some(DispatchOrder::Last),
        ..PlanOptions::default()
    };

    let plan = plan_build(&cfg, &options).await.unwrap();

    assert!(plan.diagnostics.is_empty(), "{:?}", plan.diagnostics);
    let compile = plan.position_of("compile").unwrap();
    assert!(plan.position_of("gen").unwrap() < compile);
    assert!(plan.position_of("tools").unwrap() < compile);
    assert!(compile < plan.position_of("package").unwrap());
    assert_eq!(
        plan.steps[compile].deps,
        vec!["gen".to_string(), "tools".to_string()]
    );
    assert_eq!(
        plan.steps[plan.position_of("package").unwrap()].deps,
        vec!["compile".to_string()]
    );
}

#[tokio::test]
async fn output_arrays_declare_every_path() {
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "gen",
            TaskConfigBuilder::new()
                .property(
                    "outs",
                    toml::Value::Array(vec![
                        reference("output", "build/a"),
                        reference("output", "build/b"),
                    ]),
                )
                .build(),
        )
        .build();

    let plan = plan_build(&cfg, &PlanOptions::default()).await.unwrap();

    let paths: Vec<&str> = plan.steps[0]
        .outputs
        .iter()
        .map(|o| o.path.as_str())
        .collect();
    assert_eq!(paths, vec!["build/a", "build/b"]);
}

#[tokio::test]
async fn references_nested_in_inner_arrays_are_reported() {
    let cfg = ConfigFileBuilder::new()
        .with_task("gen", TaskConfigBuilder::new().build())
        .with_task(
            "compile",
            TaskConfigBuilder::new()
                .property(
                    "srcs",
                    toml::Value::Array(vec![toml::Value::Array(vec![reference(
                        "output_of", "gen",
                    )])]),
                )
                .build(),
        )
        .build();

    let plan = plan_build(&cfg, &PlanOptions::default()).await.unwrap();

    let (task, diagnostic) = &plan.diagnostics[0];
    assert_eq!(task, "compile");
    assert_eq!(diagnostic.property, "srcs");
    assert!(diagnostic.message.contains("`output_of` references are only supported"));
}

#[tokio::test]
async fn skipped_task_blocks_its_consumers() {
    let cfg = pipeline();
    let options = PlanOptions {
        skip: vec!["generate".to_string()],
        ..PlanOptions::default()
    };

    let plan = plan_build(&cfg, &options).await.unwrap();

    assert_eq!(plan.order(), vec!["lint"]);
    assert_eq!(plan.cancelled, vec!["generate".to_string()]);
    assert_eq!(
        plan.blocked,
        vec!["compile".to_string(), "package".to_string()]
    );
}

#[tokio::test]
async fn unknown_skip_is_rejected() {
    let options = PlanOptions {
        skip: vec!["nope".to_string()],
        ..PlanOptions::default()
    };

    let err = plan_build(&pipeline(), &options).await.unwrap_err();

    assert!(matches!(err, BuildPlanError::TaskNotFound(name) if name == "nope"));
}

#[tokio::test]
async fn targets_pull_in_discovered_producers() {
    let options = PlanOptions {
        targets: vec!["compile".to_string()],
        ..PlanOptions::default()
    };

    let plan = plan_build(&pipeline(), &options).await.unwrap();

    assert_eq!(plan.order(), vec!["generate", "compile"]);
}

#[tokio::test]
async fn order_override_wins_over_config() {
    let cfg = ConfigFileBuilder::new()
        .dispatch_order(DispatchOrder::First)
        .with_task("a", TaskConfigBuilder::new().build())
        .with_task("b", TaskConfigBuilder::new().build())
        .with_task("c", TaskConfigBuilder::new().build())
        .build();

    let default_plan = plan_build(&cfg, &PlanOptions::default()).await.unwrap();
    assert_eq!(default_plan.order(), vec!["a", "b", "c"]);

    let options = PlanOptions {
        order_override: Some(DispatchOrder::Last),
        ..PlanOptions::default()
    };
    let plan = plan_build(&cfg, &options).await.unwrap();
    assert_eq!(plan.order(), vec!["c", "b", "a"]);
}

#[tokio::test]
async fn diagnostics_are_collected_without_failing_the_plan() {
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "compile",
            TaskConfigBuilder::new().property("mixed", mixed_array()).build(),
        )
        .build();

    let plan = plan_build(&cfg, &PlanOptions::default()).await.unwrap();

    assert_eq!(plan.order(), vec!["compile"]);
    assert_eq!(plan.diagnostics.len(), 1);
    let (task, diagnostic) = &plan.diagnostics[0];
    assert_eq!(task, "compile");
    assert_eq!(diagnostic.property, "mixed");
    assert!(diagnostic.message.contains("mixes"));
}

#[tokio::test]
async fn fail_on_diagnostics_turns_them_into_errors() {
    let cfg = ConfigFileBuilder::new()
        .fail_on_diagnostics(true)
        .with_task(
            "compile",
            TaskConfigBuilder::new().property("mixed", mixed_array()).build(),
        )
        .build();

    let err = plan_build(&cfg, &PlanOptions::default()).await.unwrap_err();

    assert!(matches!(
        err,
        BuildPlanError::Validation { ref task, count: 1 } if task == "compile"
    ));
}

#[tokio::test]
async fn self_reference_is_reported_and_ignored() {
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "loop",
            TaskConfigBuilder::new().output_of("again", "loop").build(),
        )
        .build();

    let plan = plan_build(&cfg, &PlanOptions::default()).await.unwrap();

    assert_eq!(plan.order(), vec!["loop"]);
    assert!(plan.steps[0].deps.is_empty());
    let (_, diagnostic) = &plan.diagnostics[0];
    assert_eq!(diagnostic.property, "<root>");
    assert!(diagnostic.message.contains("consumes its own output"));
}

#[tokio::test]
async fn discovered_edges_closing_a_cycle_fail() {
    let cfg = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::new().output_of("input", "b").build())
        .with_task("b", TaskConfigBuilder::new().value_of("input", "a").build())
        .build();

    let err = plan_build(&cfg, &PlanOptions::default()).await.unwrap_err();

    assert!(matches!(err, BuildPlanError::DagCycle(_)));
}

#[tokio::test]
async fn empty_registry_reports_every_property() {
    let cfg = pipeline();

    let plan = plan_build_with(&cfg, &PlanOptions::default(), Arc::new(HandlerRegistry::new()))
        .await
        .unwrap();

    // Nothing is walked, so no edges are discovered.
    assert!(plan.steps.iter().all(|step| step.deps.is_empty()));
    assert_eq!(plan.diagnostics.len(), 4);
    assert!(
        plan.diagnostics
            .iter()
            .all(|(_, d)| d.message.contains("no handler registered"))
    );
}

#[tokio::test]
async fn discovery_results_are_sorted_by_task() {
    let cfg = pipeline();

    let discoveries = discover_all(&cfg, Arc::new(HandlerRegistry::with_defaults()))
        .await
        .unwrap();

    let names: Vec<&str> = discoveries.iter().map(|d| d.task.as_str()).collect();
    assert_eq!(names, vec!["compile", "generate", "lint", "package"]);
    assert_eq!(discoveries[0].properties_visited, 2);
    assert!(discoveries[0].inferred.contains("generate"));
    assert_eq!(discoveries[2].properties_visited, 0);
}

#[test]
fn access_failure_aborts_planning() {
    let cfg = pipeline();
    let discoveries = vec![TaskDiscovery {
        task: "compile".to_string(),
        failures: vec![PropertyFailure {
            property: "classes".to_string(),
            error: PropertyAccessError::Call {
                declaring_type: "TaskProperties".to_string(),
                accessor: "classes".to_string(),
                receiver: "task 'compile'".to_string(),
                reason: Arc::new(AccessorError::Invocation("gone".to_string())),
            },
        }],
        ..TaskDiscovery::default()
    }];

    let err = plan(&cfg, &discoveries, &PlanOptions::default()).unwrap_err();

    assert!(matches!(err, BuildPlanError::PropertyAccess(PropertyAccessError::Call { .. })));
}

#[test]
fn plan_renders_steps_outputs_and_withdrawals() {
    let cfg = pipeline();
    let discoveries = vec![
        TaskDiscovery {
            task: "generate".to_string(),
            outputs: vec![DeclaredOutput {
                property: "out".to_string(),
                path: "build/gen".to_string(),
            }],
            ..TaskDiscovery::default()
        },
        TaskDiscovery {
            task: "compile".to_string(),
            inferred: ["generate".to_string()].into_iter().collect(),
            ..TaskDiscovery::default()
        },
    ];
    let options = PlanOptions {
        skip: vec!["lint".to_string()],
        ..PlanOptions::default()
    };

    let rendered = plan(&cfg, &discoveries, &options).unwrap().to_string();

    assert!(rendered.starts_with("plan (3 step(s)):\n"));
    assert!(rendered.contains("    1. generate\n"));
    assert!(rendered.contains("       generate sources\n"));
    assert!(rendered.contains("       -> out = build/gen\n"));
    assert!(rendered.contains("compile  (after: generate)\n"));
    assert!(rendered.contains("cancelled: lint\n"));
    assert!(!rendered.contains("blocked:"));
}
