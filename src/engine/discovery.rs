// src/engine/discovery.rs

//! Dependency discovery: walk each task's properties and collect the tasks
//! that produce what it consumes.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, info, trace};

use crate::config::TableBean;
use crate::config::model::ConfigFile;
use crate::engine::{DeclaredOutput, TaskName};
use crate::errors::{BuildPlanError, Result};
use crate::property::{Bean, Dependency, LazyPropertyValue, PropertyMetadata, Value};
use crate::walk::{
    Diagnostic, HandlerRegistry, PropertyFailure, PropertyVisitor, PropertyWalker,
};

/// What walking one task's properties found.
#[derive(Debug, Clone, Default)]
pub struct TaskDiscovery {
    pub task: TaskName,
    /// Tasks that produce values or artifacts this task consumes.
    pub inferred: BTreeSet<TaskName>,
    pub outputs: Vec<DeclaredOutput>,
    pub diagnostics: Vec<Diagnostic>,
    /// Properties whose values could not be realized.
    pub failures: Vec<PropertyFailure>,
    pub properties_visited: usize,
}

/// Collects dependencies and outputs, and finalizes every configurable
/// property it sees.
#[derive(Debug, Default)]
pub struct DiscoveryVisitor {
    producers: BTreeSet<TaskName>,
    outputs: Vec<DeclaredOutput>,
    failures: Vec<PropertyFailure>,
}

impl DiscoveryVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn consume(&mut self, name: &str, value: &LazyPropertyValue) {
        let mut dependencies: Vec<Dependency> = Vec::new();
        let collected = value
            .dependencies()
            .and_then(|container| container.visit_dependencies(&mut dependencies));
        if let Err(error) = collected.and_then(|()| value.maybe_finalize()) {
            self.failures.push(PropertyFailure {
                property: name.to_string(),
                error,
            });
            return;
        }

        for dependency in dependencies.iter() {
            for producer in dependency.producers() {
                trace!(property = %name, producer = %producer, "discovered producer");
                self.producers.insert(producer);
            }
        }
    }
}

impl PropertyVisitor for DiscoveryVisitor {
    fn visit_input_property(
        &mut self,
        name: &str,
        value: &LazyPropertyValue,
        _metadata: &PropertyMetadata,
    ) {
        self.consume(name, value);
    }

    fn visit_input_file_property(
        &mut self,
        name: &str,
        value: &LazyPropertyValue,
        _metadata: &PropertyMetadata,
    ) {
        self.consume(name, value);
    }

    fn visit_output_file_property(
        &mut self,
        name: &str,
        value: &LazyPropertyValue,
        _metadata: &PropertyMetadata,
    ) {
        match value.call() {
            Ok(Some(Value::Text(path))) => self.outputs.push(DeclaredOutput {
                property: name.to_string(),
                path,
            }),
            Ok(Some(Value::List(items))) => {
                for item in items {
                    match item {
                        Value::Text(path) => self.outputs.push(DeclaredOutput {
                            property: name.to_string(),
                            path,
                        }),
                        other => {
                            debug!(property = %name, kind = other.kind_label(), "output entry is not a path; ignoring");
                        }
                    }
                }
            }
            Ok(Some(other)) => {
                debug!(property = %name, kind = other.kind_label(), "output property is not a path; ignoring");
            }
            Ok(None) => {}
            Err(error) => self.failures.push(PropertyFailure {
                property: name.to_string(),
                error,
            }),
        }
    }
}

/// Walk the properties of one task.
pub fn discover_task(walker: &PropertyWalker, task: &str, properties: &toml::Table) -> TaskDiscovery {
    let root: Arc<dyn Bean> = TableBean::for_task(task, properties);
    let mut visitor = DiscoveryVisitor::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    let outcome = walker.walk(root, &mut visitor, &mut diagnostics);

    let DiscoveryVisitor {
        mut producers,
        outputs,
        mut failures,
    } = visitor;

    if producers.remove(task) {
        diagnostics.push(Diagnostic::new(
            "<root>",
            format!("task '{task}' consumes its own output; ignoring the self-reference"),
        ));
    }

    failures.extend(outcome.access_failures);

    debug!(
        task = %task,
        producers = ?producers,
        outputs = outputs.len(),
        diagnostics = diagnostics.len(),
        failures = failures.len(),
        "discovered task dependencies"
    );

    TaskDiscovery {
        task: task.to_string(),
        inferred: producers,
        outputs,
        diagnostics,
        failures,
        properties_visited: outcome.properties_visited,
    }
}

/// Walk every task of `cfg` concurrently, one blocking job per task.
///
/// Results are sorted by task name.
pub async fn discover_all(
    cfg: &ConfigFile,
    registry: Arc<HandlerRegistry>,
) -> Result<Vec<TaskDiscovery>> {
    let walker = PropertyWalker::new(registry);
    let mut jobs = JoinSet::new();

    for (name, task) in cfg.task.iter() {
        let walker = walker.clone();
        let name = name.clone();
        let properties = task.properties.clone();
        jobs.spawn_blocking(move || discover_task(&walker, &name, &properties));
    }

    let mut discoveries = Vec::with_capacity(cfg.task.len());
    while let Some(joined) = jobs.join_next().await {
        let discovery = joined
            .map_err(|err| BuildPlanError::Other(anyhow!("discovery job failed: {err}")))?;
        discoveries.push(discovery);
    }

    discoveries.sort_by(|a, b| a.task.cmp(&b.task));
    info!(tasks = discoveries.len(), "dependency discovery finished");
    Ok(discoveries)
}
