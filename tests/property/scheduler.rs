use std::collections::{BTreeSet, HashSet};

use buildplan::config::ConfigFile;
use buildplan::dag::{DagGraph, Scheduler, TaskRunState};
use buildplan::engine::TaskOutcome;
use buildplan::types::DispatchOrder;
use buildplan_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use proptest::prelude::*;

// Task N may only depend on tasks 0..N-1, so every config is acyclic.
fn dag_config_strategy(max_tasks: usize) -> impl Strategy<Value = ConfigFile> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(move |raw_deps| {
            let mut builder = ConfigFileBuilder::new();
            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                let mut task = TaskConfigBuilder::new();
                if i > 0 {
                    let deps: BTreeSet<usize> = potential_deps.into_iter().map(|d| d % i).collect();
                    for dep in deps {
                        task = task.after(&format!("task_{dep}"));
                    }
                }
                builder = builder.with_task(&format!("task_{i}"), task.build());
            }
            builder.build()
        })
    })
}

fn is_terminal(state: Option<TaskRunState>) -> bool {
    matches!(
        state,
        Some(TaskRunState::DoneSuccess)
            | Some(TaskRunState::DoneFailed)
            | Some(TaskRunState::Cancelled)
            | Some(TaskRunState::NotInRun)
    )
}

proptest! {
    #[test]
    fn every_run_terminates_and_respects_dependencies(
        cfg in dag_config_strategy(10),
        last_first in any::<bool>(),
        target_indices in proptest::collection::vec(0..10usize, 0..3),
        failing_indices in proptest::collection::vec(0..10usize, 0..4),
        skip_indices in proptest::collection::vec(0..10usize, 0..3),
        // Each entry either dispatches (true) or completes the oldest running task.
        moves in proptest::collection::vec(any::<bool>(), 0..40),
    ) {
        let order = if last_first { DispatchOrder::Last } else { DispatchOrder::First };
        let mut scheduler = Scheduler::new(DagGraph::from_config(&cfg), order);
        let names: Vec<String> = scheduler.task_names().map(str::to_string).collect();
        let pick = |indices: &[usize]| -> Vec<String> {
            indices
                .iter()
                .filter(|&&i| i < names.len())
                .map(|&i| names[i].clone())
                .collect()
        };

        let targets = pick(&target_indices);
        let failing: HashSet<String> = pick(&failing_indices).into_iter().collect();

        let targets_arg = (!targets.is_empty()).then_some(targets.as_slice());
        scheduler.start_run(targets_arg).unwrap();
        for skipped in pick(&skip_indices) {
            scheduler.cancel(&skipped);
        }

        let mut running: Vec<String> = Vec::new();
        let mut dispatched: HashSet<String> = HashSet::new();
        let mut moves = moves.into_iter();
        let mut steps = 0;

        while !scheduler.is_idle() {
            steps += 1;
            prop_assert!(steps < 1000, "scheduler did not settle");

            let dispatch = moves.next().unwrap_or(running.is_empty());
            if dispatch || running.is_empty() {
                let Some(task) = scheduler.next_ready() else {
                    prop_assert!(!running.is_empty(), "run is active but nothing is ready or running");
                    continue;
                };
                for dep in task.deps.iter() {
                    let state = scheduler.run_state_of(dep);
                    prop_assert!(
                        matches!(state, Some(TaskRunState::DoneSuccess) | Some(TaskRunState::NotInRun)),
                        "{} dispatched while {} is {:?}", task.name, dep, state
                    );
                }
                prop_assert!(dispatched.insert(task.name.clone()), "{} dispatched twice", task.name);
                running.push(task.name);
            } else {
                let task = running.remove(0);
                let outcome = if failing.contains(&task) {
                    TaskOutcome::Failed(1)
                } else {
                    TaskOutcome::Success
                };
                scheduler.complete(&task, outcome);
            }
        }

        prop_assert!(running.is_empty());
        for name in names.iter() {
            let state = scheduler.run_state_of(name);
            prop_assert!(is_terminal(state), "{} left in {:?}", name, state);
            if state == Some(TaskRunState::DoneSuccess) {
                for dep in scheduler.graph().dependencies_of(name) {
                    prop_assert_eq!(scheduler.run_state_of(dep), Some(TaskRunState::DoneSuccess));
                }
            }
        }
    }
}
