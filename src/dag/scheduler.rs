use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{StateManager, deps_satisfied};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::dag::work_set::OrderedWorkSet;
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::{BuildPlanError, Result};
use crate::types::DispatchOrder;

/// Scheduler holds the immutable task graph plus mutable per-run state.
///
/// It is responsible for:
/// - deciding which tasks take part in a run
/// - moving tasks into the ready queue once their dependencies succeeded
/// - handing out ready tasks in [`DispatchOrder`]
/// - failing dependents when a task fails or is cancelled
///
/// The ready queue is an [`OrderedWorkSet`]; the scheduler is its only owner
/// and every access goes through `&mut self`.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: BTreeMap<TaskName, TaskInfo>,
    ready: OrderedWorkSet<TaskName>,
    order: DispatchOrder,
    /// Dispatches handed out in the current run.
    dispatched: u64,
    active: bool,
}

impl Scheduler {
    pub fn new(graph: DagGraph, order: DispatchOrder) -> Self {
        let tasks = graph
            .tasks()
            .map(|name| {
                let deps = graph.dependencies_of(name).to_vec();
                (name.to_string(), TaskInfo::new(name.to_string(), deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            ready: OrderedWorkSet::new(),
            order,
            dispatched: 0,
            active: false,
        }
    }

    /// Scheduler over the explicit `after` graph of a validated config.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(DagGraph::from_config(cfg), cfg.config.dispatch_order)
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        !self.active
    }

    pub fn dispatch_order(&self) -> DispatchOrder {
        self.order
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Ready tasks in queue order.
    pub fn ready_tasks(&self) -> Vec<TaskName> {
        self.ready.to_vec()
    }

    /// The task [`next_ready`](Self::next_ready) would hand out.
    pub fn peek_next(&self) -> Option<&TaskName> {
        match self.order {
            DispatchOrder::First => self.ready.first().ok(),
            DispatchOrder::Last => self.ready.last().ok(),
        }
    }

    /// Names of tasks participating in the active run.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if !self.active {
            return Vec::new();
        }
        self.tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect()
    }

    /// Whether the dependencies of `task` are satisfied in the current run.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(deps_satisfied(&self.tasks, info))
    }

    /// Start a new run.
    ///
    /// With `targets`, only those tasks and their transitive dependencies take
    /// part; otherwise every task does.
    pub fn start_run(&mut self, targets: Option<&[TaskName]>) -> Result<SchedulerStep> {
        let participants: BTreeSet<TaskName> = match targets {
            None => self.tasks.keys().cloned().collect(),
            Some(targets) => {
                if let Some(unknown) = targets.iter().find(|t| !self.tasks.contains_key(*t)) {
                    return Err(BuildPlanError::TaskNotFound(unknown.clone()));
                }
                self.graph
                    .dependency_closure(targets.iter().map(String::as_str))
            }
        };

        self.dispatched = 0;
        self.active = true;

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, &mut self.ready);
        manager.reset_for_run(&participants);
        let newly_ready = manager.collect_new_ready_tasks();

        info!(
            participants = participants.len(),
            ready = newly_ready.len(),
            "scheduler: starting run"
        );

        let run_just_finished = self.maybe_finish_run();
        Ok(SchedulerStep {
            newly_ready,
            newly_failed: Vec::new(),
            run_just_finished,
        })
    }

    /// Take the next ready task out of the queue and mark it running.
    pub fn next_ready(&mut self) -> Option<ScheduledTask> {
        if self.ready.is_empty() {
            return None;
        }

        let polled = match self.order {
            DispatchOrder::First => self.ready.poll_first(),
            DispatchOrder::Last => self.ready.poll_last(),
        };
        let name = polled.ok()?;
        let info = self.tasks.get_mut(&name)?;

        self.dispatched += 1;
        info.run_state = Some(RunState::Running);
        debug!(task = %name, sequence = self.dispatched, "dispatching task");

        Some(ScheduledTask::from_task_info(info, self.dispatched))
    }

    /// Record the outcome of a dispatched task.
    pub fn complete(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state == Some(RunState::Running) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    debug!(task = %task, "task completed successfully");
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, &mut self.ready);
                    step.newly_ready = manager.collect_new_ready_tasks();
                }
                TaskOutcome::Failed(code) => {
                    info.run_state = Some(RunState::DoneFailed);
                    warn!(task = %task, exit_code = code, "task failed; failing dependents");
                    step.newly_failed.push(task.to_string());
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, &mut self.ready);
                    step.newly_failed.extend(manager.mark_dependents_failed(task));
                }
            },
            Some(info) => {
                warn!(task = %task, state = ?info.run_state, "completion for task that is not running; ignoring");
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// Withdraw a task that has not been dispatched yet.
    ///
    /// A ready task is removed from the queue. Dependents are blocked and
    /// reported in `newly_failed`. Running or finished tasks are left alone.
    pub fn cancel(&mut self, task: &str) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        match self.tasks.get_mut(task) {
            Some(info) if matches!(info.run_state, Some(RunState::Pending) | Some(RunState::Ready)) => {
                if info.run_state == Some(RunState::Ready) {
                    self.ready.remove(&info.name);
                }
                info.run_state = Some(RunState::Cancelled);
                info!(task = %task, "task cancelled before dispatch");
                let mut manager = StateManager::new(&self.graph, &mut self.tasks, &mut self.ready);
                step.newly_failed = manager.mark_dependents_failed(task);
            }
            Some(info) => {
                debug!(task = %task, state = ?info.run_state, "cancel ignored for task in this state");
            }
            None => {
                warn!(task = %task, "cancel for unknown task; ignoring");
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// Clear the active flag once every participant is terminal.
    ///
    /// Returns `true` if this call transitioned the scheduler to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if !self.active {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, &mut self.ready);
        if manager.all_tasks_terminal() {
            info!(dispatched = self.dispatched, "scheduler: all tasks terminal; run finished");
            self.active = false;
            true
        } else {
            false
        }
    }
}
