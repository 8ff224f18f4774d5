// src/dag/task_info.rs

//! Task metadata and per-run state.

use crate::engine::TaskName;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Task takes part in this run but is waiting on dependencies.
    Pending,
    /// Dependencies are satisfied; the task sits in the ready queue.
    Ready,
    /// Task has been handed out by the scheduler.
    Running,
    /// Task completed successfully in this run.
    DoneSuccess,
    /// Task failed in this run (or was blocked by a failed/cancelled dependency).
    DoneFailed,
    /// Task was withdrawn before it was dispatched.
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::DoneSuccess | RunState::DoneFailed | RunState::Cancelled
        )
    }
}

/// Public, read-only view of a task's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not participating in this run.
    NotInRun,
    Pending,
    Ready,
    Running,
    DoneSuccess,
    DoneFailed,
    Cancelled,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Ready) => TaskRunState::Ready,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
            Some(RunState::Cancelled) => TaskRunState::Cancelled,
        }
    }
}

/// Static task information plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    /// Direct dependencies, explicit and discovered.
    pub deps: Vec<TaskName>,
    /// Per-run state (None if not participating in the current run).
    pub run_state: Option<RunState>,
}

impl TaskInfo {
    pub fn new(name: TaskName, deps: Vec<TaskName>) -> Self {
        Self {
            name,
            deps,
            run_state: None,
        }
    }
}

/// A task the scheduler hands out for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub deps: Vec<TaskName>,
    /// Position of this dispatch within the run, starting at 1.
    pub sequence: u64,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, sequence: u64) -> Self {
        Self {
            name: info.name.clone(),
            deps: info.deps.clone(),
            sequence,
        }
    }
}
