// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::{PipelineError, Result};
use crate::types::TaskKind;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: tasks that must complete before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// In-memory task graph keyed by task name.
///
/// The pipeline always uses [`DagGraph::standard`]; [`DagGraph::from_specs`]
/// exists so the scheduler can be exercised against arbitrary graphs.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    /// The pipeline's task graph, derived from [`TaskKind::dependencies`].
    pub fn standard() -> Self {
        let specs = TaskKind::ALL.iter().map(|kind| {
            (
                kind.as_str().to_string(),
                kind.dependencies()
                    .iter()
                    .map(|d| d.as_str().to_string())
                    .collect::<Vec<_>>(),
            )
        });
        Self::build(specs)
    }

    /// Build a graph from `(task, dependencies)` pairs.
    ///
    /// Fails on unknown dependencies and on cycles.
    pub fn from_specs<I>(specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TaskName, Vec<TaskName>)>,
    {
        let graph = Self::build(specs);

        for (name, node) in graph.nodes.iter() {
            for dep in node.deps.iter() {
                if !graph.nodes.contains_key(dep) {
                    return Err(PipelineError::TaskNotFound(format!(
                        "{} (dependency of '{}')",
                        dep, name
                    )));
                }
            }
        }

        graph.topological_order(graph.tasks().map(|s| s.to_string()).collect())?;
        Ok(graph)
    }

    fn build<I>(specs: I) -> Self
    where
        I: IntoIterator<Item = (TaskName, Vec<TaskName>)>,
    {
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::new();

        // First pass: create nodes with their dependency lists.
        for (name, deps) in specs {
            nodes.insert(
                name,
                DagNode {
                    deps,
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: populate dependents based on deps.
        let task_names: Vec<TaskName> = nodes.keys().cloned().collect();
        for task_name in task_names {
            let deps = nodes
                .get(&task_name)
                .map(|n| n.deps.clone())
                .unwrap_or_default();

            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(task_name.clone());
                }
            }
        }

        Self { nodes }
    }

    /// Return all task names.
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

    /// The task itself plus all of its transitive dependencies.
    pub fn closure_of(&self, name: &str) -> BTreeSet<TaskName> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![name.to_string()];

        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(&current) || !seen.insert(current.clone()) {
                continue;
            }
            stack.extend(self.dependencies_of(&current).iter().cloned());
        }

        seen
    }

    /// Order in which the closure of `target` would run if executed
    /// serially: every task appears after all of its dependencies.
    pub fn execution_plan(&self, target: &str) -> Result<Vec<TaskName>> {
        if !self.contains(target) {
            return Err(PipelineError::TaskNotFound(target.to_string()));
        }
        self.topological_order(self.closure_of(target))
    }

    fn topological_order(&self, members: BTreeSet<TaskName>) -> Result<Vec<TaskName>> {
        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in members.iter() {
            graph.add_node(name.as_str());
        }

        for name in members.iter() {
            for dep in self.dependencies_of(name) {
                if members.contains(dep) {
                    graph.add_edge(dep.as_str(), name.as_str(), ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|s| s.to_string()).collect()),
            Err(cycle) => Err(PipelineError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }
}
