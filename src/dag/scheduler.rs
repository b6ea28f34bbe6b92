// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::run::{RunSlot, ScheduledTask, SchedulerStep, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};

/// Decides which tasks of the pipeline graph run, and in what order.
///
/// A trigger pulls the task and its whole upstream closure into the active
/// run (starting one if the scheduler is idle). A pending task is dispatched
/// once every dependency succeeded *in this run*; success in an earlier run
/// never counts. A failure marks every pending or running dependent as
/// failed. The run ends when nothing is pending or running.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    slots: HashMap<TaskName, RunSlot>,
    runs_started: u64,
    active_run: Option<u64>,
}

impl Scheduler {
    /// Scheduler over the pipeline's task graph.
    pub fn standard() -> Self {
        Self::new(DagGraph::standard())
    }

    pub fn new(graph: DagGraph) -> Self {
        let slots = graph
            .tasks()
            .map(|name| (name.to_string(), RunSlot::default()))
            .collect();

        Self {
            graph,
            slots,
            runs_started: 0,
            active_run: None,
        }
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn is_idle(&self) -> bool {
        self.active_run.is_none()
    }

    /// `None` for tasks outside the graph.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.slots.get(task).map(|slot| slot.state)
    }

    /// Tasks pulled into the active run, sorted; empty when idle.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.active_run.is_none() {
            return Vec::new();
        }
        let mut names: Vec<TaskName> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.state != TaskRunState::NotInRun)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Open a new run. Every task starts out of the run.
    pub fn start_new_run(&mut self) {
        self.runs_started += 1;
        self.active_run = Some(self.runs_started);
        for slot in self.slots.values_mut() {
            slot.state = TaskRunState::NotInRun;
        }
        debug!(run_id = self.runs_started, "run started");
    }

    /// Pull `task` and its upstream closure into the run; returns the tasks
    /// that became ready.
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        if self.active_run.is_none() {
            self.start_new_run();
        }

        if self.slots.contains_key(task) {
            for name in self.graph.closure_of(task) {
                if let Some(slot) = self.slots.get_mut(&name) {
                    if slot.state == TaskRunState::NotInRun {
                        slot.state = TaskRunState::Pending;
                    }
                }
            }
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }

        let ready = self.dispatch_ready();
        self.finish_run_if_settled();
        ready
    }

    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.step_completion(task, outcome).newly_scheduled
    }

    /// Record a task's outcome and report everything it changed.
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.active_run else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let mut step = SchedulerStep::default();

        match self.slots.get_mut(task) {
            None => warn!(task = %task, "completion for unknown task; ignoring"),
            Some(slot) if slot.state != TaskRunState::Running => {
                warn!(task = %task, run_id, state = ?slot.state, "completion for task that is not running; ignoring");
            }
            Some(slot) => {
                slot.finished_runs += 1;
                match outcome {
                    TaskOutcome::Success => {
                        slot.state = TaskRunState::Succeeded;
                        debug!(task = %task, run_id, "task succeeded");
                        step.newly_scheduled = self.dispatch_ready();
                    }
                    TaskOutcome::Failed(reason) => {
                        slot.state = TaskRunState::Failed;
                        warn!(task = %task, run_id, reason = %reason, "task failed; skipping its dependents");
                        step.newly_failed.push(task.to_string());
                        step.newly_failed.extend(self.fail_dependents(task));
                    }
                }
            }
        }

        step.run_just_finished = self.finish_run_if_settled();
        step
    }

    fn deps_succeeded(&self, task: &str) -> bool {
        self.graph.dependencies_of(task).iter().all(|dep| {
            self.slots
                .get(dep)
                .is_some_and(|slot| slot.state == TaskRunState::Succeeded)
        })
    }

    /// Move every pending task whose dependencies succeeded to `Running`,
    /// in name order.
    fn dispatch_ready(&mut self) -> Vec<ScheduledTask> {
        let run_id = self.active_run.unwrap_or(0);

        let mut ready: Vec<TaskName> = self
            .slots
            .iter()
            .filter(|(name, slot)| slot.state == TaskRunState::Pending && self.deps_succeeded(name))
            .map(|(name, _)| name.clone())
            .collect();
        ready.sort();

        ready
            .into_iter()
            .filter_map(|name| {
                let slot = self.slots.get_mut(&name)?;
                slot.state = TaskRunState::Running;
                info!(task = %name, run_id, rerun = slot.finished_runs > 0, "starting task");
                Some(ScheduledTask { name, run_id })
            })
            .collect()
    }

    /// Transitively fail active dependents of `failed`.
    fn fail_dependents(&mut self, failed: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed).to_vec();
        let mut skipped = Vec::new();

        while let Some(name) = stack.pop() {
            let Some(slot) = self.slots.get_mut(&name) else {
                continue;
            };
            if !slot.state.is_active() {
                continue;
            }
            slot.state = TaskRunState::Failed;
            debug!(task = %name, upstream = %failed, "dependent skipped after upstream failure");
            stack.extend(self.graph.dependents_of(&name).iter().cloned());
            skipped.push(name);
        }

        skipped
    }

    fn finish_run_if_settled(&mut self) -> bool {
        if self.active_run.is_none() || self.slots.values().any(|slot| slot.state.is_active()) {
            return false;
        }
        info!(run_id = self.active_run, "run finished");
        self.active_run = None;
        true
    }
}
