// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use super::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Queue of triggers that arrive for tasks already part of the active run.
///
/// Semantics:
/// - Each queued entry is a *batch* of task names that should be treated as
///   triggers for one future run.
/// - `max_runs` defines how many such batches to keep (default 1, meaning
///   "at most one future run is queued").
/// - When the runtime becomes idle it calls `drain_pending()`, which merges
///   all queued batches into a single set of task names for the next run.
///
/// So saving two stylesheets while `styles` is compiling yields exactly one
/// follow-up `styles` run.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    /// Returns true if there are no queued triggers.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Record that a task was triggered while it is part of the active run.
    ///
    /// - `Queue`: merge into the last batch (or open the first one); drop the
    ///   oldest batches beyond `max_runs`.
    /// - `Cancel`: replace everything queued with a batch holding only this
    ///   task.
    pub fn record_trigger(&mut self, task: &str) {
        let name = task.to_string();

        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if let Some(last_batch) = self.runs.back_mut() {
                    let inserted = last_batch.insert(name.clone());
                    debug!(
                        task = %name,
                        inserted,
                        "merged trigger into last queued batch (queue mode)",
                    );
                } else {
                    self.runs.push_back(BTreeSet::from([name.clone()]));
                    debug!(task = %name, "created first queued batch (queue mode)");
                }

                if self.runs.len() > self.max_runs {
                    warn!(
                        current_batches = self.runs.len(),
                        max_runs = self.max_runs,
                        "exceeded queue_length; dropping oldest queued batches"
                    );
                    while self.runs.len() > self.max_runs {
                        self.runs.pop_front();
                    }
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(
                    task = %name,
                    "resetting queued batches to this task only (cancel mode)"
                );
                self.runs.clear();
                self.runs.push_back(BTreeSet::from([name]));
            }
        }
    }

    /// Drain all queued batches, merged into one sorted list of task names.
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let mut merged: BTreeSet<TaskName> = BTreeSet::new();

        while let Some(batch) = self.runs.pop_front() {
            merged.extend(batch);
        }

        debug!(drained = merged.len(), "drained queued triggers into new run");
        merged.into_iter().collect()
    }
}
