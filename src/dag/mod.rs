// src/dag/mod.rs

//! Task graph, ready queue and scheduling.
//!
//! - [`work_set`] holds the insertion-ordered navigable set used as the
//!   ready queue.
//! - [`graph`] holds the task graph (explicit and discovered edges).
//! - [`scheduler`] contains the per-run state machine that decides which
//!   tasks are ready, and hands them out one by one.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;
pub mod work_set;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
pub use work_set::{OrderedEntry, OrderedWorkSet};
