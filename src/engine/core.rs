// src/engine/core.rs

//! Pure planning core.
//!
//! Turns a validated config plus discovery results into a [`Plan`] by driving
//! the scheduler until it is idle. No Tokio, no filesystem, no processes:
//! every dispatched task is reported back as successful straight away.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::anyhow;
use tracing::{error, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::{DagGraph, Scheduler, TaskRunState};
use crate::engine::discovery::TaskDiscovery;
use crate::engine::{Plan, PlanOptions, PlanStep, TaskName, TaskOutcome};
use crate::errors::{BuildPlanError, Result};

/// Build the dispatch plan.
///
/// Fails on the first property that could not be realized, on validation
/// problems when `[config].fail_on_diagnostics` is set, on unknown target or
/// skip names, and on cycles among explicit and discovered edges.
pub fn plan(cfg: &ConfigFile, discoveries: &[TaskDiscovery], options: &PlanOptions) -> Result<Plan> {
    if let Some((task, failure)) = discoveries
        .iter()
        .find_map(|d| d.failures.first().map(|f| (&d.task, f)))
    {
        error!(task = %task, property = %failure.property, error = %failure.error, "property access failed during discovery");
        return Err(BuildPlanError::PropertyAccess(failure.error.clone()));
    }

    let mut diagnostics = Vec::new();
    for discovery in discoveries.iter() {
        for diagnostic in discovery.diagnostics.iter() {
            warn!(task = %discovery.task, property = %diagnostic.property, "{}", diagnostic.message);
            diagnostics.push((discovery.task.clone(), diagnostic.clone()));
        }
        if cfg.config.fail_on_diagnostics && !discovery.diagnostics.is_empty() {
            return Err(BuildPlanError::Validation {
                task: discovery.task.clone(),
                count: discovery.diagnostics.len(),
            });
        }
    }

    let inferred: BTreeMap<TaskName, BTreeSet<TaskName>> = discoveries
        .iter()
        .map(|d| (d.task.clone(), d.inferred.clone()))
        .collect();
    let graph = DagGraph::from_config(cfg).with_inferred(&inferred);
    graph.ensure_acyclic()?;

    let order = options.order_override.unwrap_or(cfg.config.dispatch_order);
    let mut scheduler = Scheduler::new(graph, order);

    let targets = (!options.targets.is_empty()).then_some(options.targets.as_slice());
    scheduler.start_run(targets)?;

    let mut cancelled = Vec::new();
    let mut blocked = Vec::new();
    for task in options.skip.iter() {
        if !scheduler.graph().contains(task) {
            return Err(BuildPlanError::TaskNotFound(task.clone()));
        }
        let step = scheduler.cancel(task);
        if scheduler.run_state_of(task) == Some(TaskRunState::Cancelled) {
            cancelled.push(task.clone());
        }
        blocked.extend(step.newly_failed);
    }

    let outputs: BTreeMap<&str, &TaskDiscovery> =
        discoveries.iter().map(|d| (d.task.as_str(), d)).collect();

    let mut steps = Vec::new();
    while let Some(scheduled) = scheduler.next_ready() {
        steps.push(PlanStep {
            description: cfg
                .task
                .get(&scheduled.name)
                .and_then(|t| t.description.clone()),
            outputs: outputs
                .get(scheduled.name.as_str())
                .map(|d| d.outputs.clone())
                .unwrap_or_default(),
            task: scheduled.name.clone(),
            deps: scheduled.deps,
            sequence: scheduled.sequence,
        });
        scheduler.complete(&scheduled.name, TaskOutcome::Success);
    }

    if !scheduler.is_idle() {
        return Err(BuildPlanError::Other(anyhow!(
            "scheduler stalled with tasks still pending: {:?}",
            scheduler.tasks_in_current_run()
        )));
    }

    blocked.sort();
    blocked.dedup();
    info!(
        steps = steps.len(),
        cancelled = cancelled.len(),
        blocked = blocked.len(),
        diagnostics = diagnostics.len(),
        "plan complete"
    );

    Ok(Plan {
        steps,
        cancelled,
        blocked,
        diagnostics,
    })
}
