// src/dag/scheduler_step.rs

//! Step-by-step result type for the scheduler.

use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Tasks that entered the ready queue as a result of this step, in queue order.
    pub newly_ready: Vec<TaskName>,
    /// Tasks newly marked as failed in this step (the failed task itself and
    /// any dependents it blocks).
    pub newly_failed: Vec<TaskName>,
    /// Whether this step finished the current run (scheduler is now idle).
    pub run_just_finished: bool,
}
