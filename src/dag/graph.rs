// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ConfigFile;
use crate::engine::TaskName;
use crate::errors::{BuildPlanError, Result};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must finish before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// In-memory task graph keyed by task name.
///
/// Nodes are kept name-sorted so that every traversal (and therefore every
/// plan) is reproducible. Edges come from explicit `after = [...]` lists and
/// from dependencies discovered by walking task properties.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: BTreeMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build a graph from the explicit `after` lists of a config.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut graph = DagGraph::default();
        for name in cfg.task.keys() {
            graph.add_task(name);
        }
        for (name, task) in cfg.task.iter() {
            for dep in task.after.iter() {
                graph.add_edge(dep, name);
            }
        }
        graph
    }

    /// Add discovered dependencies: `inferred[task]` lists producers of `task`.
    pub fn with_inferred(mut self, inferred: &BTreeMap<TaskName, BTreeSet<TaskName>>) -> Self {
        for (task, producers) in inferred.iter() {
            for producer in producers.iter() {
                self.add_edge(producer, task);
            }
        }
        self
    }

    pub fn add_task(&mut self, name: &str) {
        self.nodes.entry(name.to_string()).or_default();
    }

    /// Add edge `dep -> task`. Duplicate edges are ignored.
    pub fn add_edge(&mut self, dep: &str, task: &str) {
        self.add_task(dep);
        self.add_task(task);

        if let Some(node) = self.nodes.get_mut(task) {
            if node.deps.iter().any(|d| d == dep) {
                return;
            }
            node.deps.push(dep.to_string());
        }
        if let Some(dep_node) = self.nodes.get_mut(dep) {
            dep_node.dependents.push(task.to_string());
        }
    }

    /// Return all task names, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// `roots` plus everything they transitively depend on.
    pub fn dependency_closure<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a str>,
    ) -> BTreeSet<TaskName> {
        let mut stack: Vec<TaskName> = roots.into_iter().map(str::to_string).collect();
        let mut visited = BTreeSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            stack.extend(self.dependencies_of(&name).iter().cloned());
        }

        visited
    }

    /// Fail with [`BuildPlanError::DagCycle`] if the graph has a cycle.
    pub fn ensure_acyclic(&self) -> Result<()> {
        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.nodes.keys() {
            graph.add_node(name.as_str());
        }
        for (name, node) in self.nodes.iter() {
            for dep in node.deps.iter() {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(BuildPlanError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }
}
