// src/exec/backend.rs

//! Where scheduled tasks go once the core dispatches them.
//!
//! The runtime only sees [`ExecutorBackend`]. Production uses
//! [`RealExecutorBackend`], which feeds the executor loop running the real
//! task actions; tests plug in a backend that answers with completions
//! straight away.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::errors::{Error, Result};
use crate::exec::environment::TaskEnvironment;

use super::executor_loop::spawn_executor;

pub trait ExecutorBackend: Send {
    /// Start the given tasks. Completion is reported asynchronously as
    /// `RuntimeEvent::TaskCompleted`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs task actions from `TaskEnvironment` on the executor loop.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
}

impl RealExecutorBackend {
    /// Starts the executor loop right away.
    pub fn new(env: Arc<TaskEnvironment>) -> Self {
        Self {
            tx: spawn_executor(env),
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task)
                    .await
                    .map_err(|err| Error::msg(format!("executor loop stopped: {err}")))?;
            }
            Ok(())
        })
    }
}
