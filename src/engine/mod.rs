// src/engine/mod.rs

//! Planning engine for buildplan.
//!
//! This module ties together:
//! - dependency discovery: one property walk per task, run concurrently
//! - the DAG scheduler and its ready queue
//! - the plan: the order in which the scheduler hands tasks out
//!
//! The pure, synchronous planning core lives in [`core`]; discovery lives in
//! [`discovery`]; the async shell is implemented in [`runtime`].

use std::fmt;

use crate::types::DispatchOrder;
use crate::walk::Diagnostic;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a dispatched task, as reported back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(i32),
}

/// Caller-supplied planning options (usually from the CLI).
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Plan only these tasks and what they depend on. Empty means all tasks.
    pub targets: Vec<TaskName>,
    /// Tasks withdrawn before dispatch; their dependents are blocked.
    pub skip: Vec<TaskName>,
    /// Overrides `[config].dispatch_order`.
    pub order_override: Option<DispatchOrder>,
}

/// An output location declared by a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredOutput {
    /// Qualified property name.
    pub property: String,
    pub path: String,
}

/// One dispatch in a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub task: TaskName,
    /// Direct dependencies, explicit and discovered.
    pub deps: Vec<TaskName>,
    /// Position in the plan, starting at 1.
    pub sequence: u64,
    pub description: Option<String>,
    pub outputs: Vec<DeclaredOutput>,
}

/// The result of planning a build.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
    /// Tasks withdrawn with `skip`.
    pub cancelled: Vec<TaskName>,
    /// Tasks not dispatched because something they depend on was withdrawn.
    pub blocked: Vec<TaskName>,
    /// Validation problems reported while walking, per task.
    pub diagnostics: Vec<(TaskName, Diagnostic)>,
}

impl Plan {
    /// Task names in dispatch order.
    pub fn order(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.task.as_str()).collect()
    }

    pub fn position_of(&self, task: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.task == task)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "plan ({} step(s)):", self.steps.len())?;
        for step in self.steps.iter() {
            write!(f, "  {:>3}. {}", step.sequence, step.task)?;
            if !step.deps.is_empty() {
                write!(f, "  (after: {})", step.deps.join(", "))?;
            }
            writeln!(f)?;
            if let Some(ref description) = step.description {
                writeln!(f, "       {description}")?;
            }
            for output in step.outputs.iter() {
                writeln!(f, "       -> {} = {}", output.property, output.path)?;
            }
        }

        if !self.cancelled.is_empty() {
            writeln!(f, "cancelled: {}", self.cancelled.join(", "))?;
        }
        if !self.blocked.is_empty() {
            writeln!(f, "blocked: {}", self.blocked.join(", "))?;
        }
        if !self.diagnostics.is_empty() {
            writeln!(f, "diagnostics ({}):", self.diagnostics.len())?;
            for (task, diagnostic) in self.diagnostics.iter() {
                writeln!(f, "  [{task}] {diagnostic}")?;
            }
        }
        Ok(())
    }
}

pub mod core;
pub mod discovery;
pub mod runtime;

pub use core::plan;
pub use discovery::{DiscoveryVisitor, TaskDiscovery, discover_all, discover_task};
pub use runtime::{plan_build, plan_build_with};
