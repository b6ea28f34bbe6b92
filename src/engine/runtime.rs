// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::ScheduledTask;
use crate::errors::{PipelineError, Result};
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s and delegates task
/// execution to an `ExecutorBackend`.
///
/// All ordering semantics live in `CoreRuntime`; this shell only moves
/// events and dispatches tasks.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// Returns `Err(PipelineError::TasksFailed)` when the core stops because
    /// tasks failed; `Ok(())` on a clean finish or shutdown request.
    pub async fn run(mut self) -> Result<()> {
        info!("assetpipe runtime started");
        let mut exit_failures: Vec<String> = Vec::new();

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                match command {
                    CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
                    CoreCommand::RequestExit { failed } => {
                        info!(failed = failed.len(), "core requested exit");
                        exit_failures = failed;
                    }
                }
            }

            if !step.keep_running {
                info!("stopping runtime");
                break;
            }
        }

        if exit_failures.is_empty() {
            info!("runtime exiting");
            Ok(())
        } else {
            error!(failed = ?exit_failures, "runtime exiting with failed tasks");
            Err(PipelineError::TasksFailed(exit_failures))
        }
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, run_id = tasks[0].run_id, "dispatching ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
