// src/dag/run.rs

use crate::engine::TaskName;

/// Where a task stands in the active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// Not pulled into the active run (or no run is active).
    NotInRun,
    /// In the run, waiting for its dependencies.
    Pending,
    /// Handed to the executor.
    Running,
    Succeeded,
    /// Failed itself, or skipped because a dependency failed.
    Failed,
}

impl TaskRunState {
    pub fn is_active(self) -> bool {
        matches!(self, TaskRunState::Pending | TaskRunState::Running)
    }
}

/// A task the scheduler wants started now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    /// Shared by every task dispatched within one run.
    pub run_id: u64,
}

/// What a single trigger or completion changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    pub newly_scheduled: Vec<ScheduledTask>,
    /// The failed task followed by every dependent skipped because of it.
    pub newly_failed: Vec<TaskName>,
    /// This step left no task pending or running.
    pub run_just_finished: bool,
}

/// Per-task bookkeeping kept by the scheduler across runs.
#[derive(Debug, Clone)]
pub(crate) struct RunSlot {
    pub(crate) state: TaskRunState,
    /// Number of runs in which the task reached a terminal state.
    pub(crate) finished_runs: u32,
}

impl Default for RunSlot {
    fn default() -> Self {
        Self {
            state: TaskRunState::NotInRun,
            finished_runs: 0,
        }
    }
}
