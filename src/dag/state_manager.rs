// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunState, TaskInfo};
use crate::dag::work_set::OrderedWorkSet;
use crate::engine::TaskName;

/// Applies state transitions to the task table and keeps the ready queue in step.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut BTreeMap<TaskName, TaskInfo>,
    ready: &'a mut OrderedWorkSet<TaskName>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut BTreeMap<TaskName, TaskInfo>,
        ready: &'a mut OrderedWorkSet<TaskName>,
    ) -> Self {
        Self { graph, tasks, ready }
    }

    /// Mark every participant `Pending`; everything else leaves the run.
    pub fn reset_for_run(&mut self, participants: &BTreeSet<TaskName>) {
        self.ready.clear();
        for info in self.tasks.values_mut() {
            info.run_state = if participants.contains(&info.name) {
                Some(RunState::Pending)
            } else {
                None
            };
        }
        debug!(participants = participants.len(), "reset task states for new run");
    }

    /// Move `Pending` tasks whose dependencies are satisfied into the ready
    /// queue and return their names in the order they were queued.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<TaskName> {
        let tasks: &BTreeMap<TaskName, TaskInfo> = self.tasks;
        let candidates: Vec<TaskName> = tasks
            .values()
            .filter(|info| {
                matches!(info.run_state, Some(RunState::Pending)) && deps_satisfied(tasks, info)
            })
            .map(|info| info.name.clone())
            .collect();

        let mut ready = Vec::new();
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                info.run_state = Some(RunState::Ready);
                if self.ready.add(name.clone()) {
                    debug!(task = %name, "dependencies satisfied; queued as ready");
                    ready.push(name);
                }
            }
        }
        ready
    }

    /// Mark all participating dependents (transitively) of `root` as
    /// `DoneFailed`, withdrawing any that already sit in the ready queue.
    ///
    /// Returns the newly failed tasks, excluding `root`.
    pub fn mark_dependents_failed(&mut self, root: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(root).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            let Some(info) = self.tasks.get_mut(&name) else {
                warn!(task = %name, "node in graph not present in task table");
                continue;
            };

            match info.run_state {
                Some(RunState::Pending) | Some(RunState::Ready) | Some(RunState::Running) => {
                    if info.run_state == Some(RunState::Ready) {
                        self.ready.remove(&name);
                    }
                    info.run_state = Some(RunState::DoneFailed);
                    debug!(task = %name, upstream = %root, "blocked by upstream failure");
                    newly_failed.push(name.clone());
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
                Some(RunState::DoneSuccess)
                | Some(RunState::DoneFailed)
                | Some(RunState::Cancelled)
                | None => {}
            }
        }

        newly_failed
    }

    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks
            .values()
            .all(|info| info.run_state.is_none_or(RunState::is_terminal))
    }
}

/// Whether every dependency of `info` has finished successfully in this run.
///
/// A dependency that does not take part in the run counts as satisfied.
pub fn deps_satisfied(tasks: &BTreeMap<TaskName, TaskInfo>, info: &TaskInfo) -> bool {
    info.deps.iter().all(|dep_name| match tasks.get(dep_name) {
        Some(dep) => matches!(dep.run_state, None | Some(RunState::DoneSuccess)),
        None => {
            warn!(task = %info.name, dep = %dep_name, "dependency missing from task table");
            false
        }
    })
}
