// src/exec/executor_loop.rs

//! Main executor loop that runs task actions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::exec::environment::TaskEnvironment;
use crate::exec::task_runner::run_task;

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledTask>` is what `RealExecutorBackend`
/// forwards scheduled tasks into. Each task runs in its own Tokio task, and
/// **per task name there is never more than one instance running**: a newly
/// scheduled instance waits for the previous one to finish before it starts.
pub fn spawn_executor(env: Arc<TaskEnvironment>) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        // Latest instance per task name.
        let mut active: HashMap<String, JoinHandle<()>> = HashMap::new();

        while let Some(task) = rx.recv().await {
            handle_scheduled_task(task, &mut active, &env);
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

fn handle_scheduled_task(
    task: ScheduledTask,
    active: &mut HashMap<String, JoinHandle<()>>,
    env: &Arc<TaskEnvironment>,
) {
    let name = task.name.clone();

    let previous = active.remove(&name).filter(|h| !h.is_finished());
    if previous.is_some() {
        debug!(
            task = %name,
            run_id = task.run_id,
            "previous instance still running; new instance will wait for it"
        );
    }

    let env = Arc::clone(env);
    let handle = tokio::spawn(async move {
        if let Some(previous) = previous {
            let _ = previous.await;
        }
        run_task(task, env).await;
    });

    active.insert(name, handle);
}
