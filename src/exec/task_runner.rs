// src/exec/task_runner.rs

//! Runs the action behind each task name and reports the outcome.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use tracing::{error, info, warn};

use crate::bundle::{pretty_duration, BundleTask};
use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::exec::environment::{Resident, TaskEnvironment};
use crate::livereload;
use crate::pipeline::{run_images, run_markup, run_styles};
use crate::types::TaskKind;
use crate::watch::{build_pipeline_profiles, spawn_watcher};

/// Run a single task and send exactly one `TaskCompleted` for it.
///
/// Compile errors inside the task were already reported to the notifier and
/// do not make it fail; any error returned here does.
pub async fn run_task(task: ScheduledTask, env: Arc<TaskEnvironment>) {
    let started = Instant::now();
    info!(task = %task.name, run_id = task.run_id, "task started");

    let outcome = match execute(&task.name, Arc::clone(&env)).await {
        Ok(()) => {
            info!(
                task = %task.name,
                run_id = task.run_id,
                elapsed = %pretty_duration(started.elapsed()),
                "task finished"
            );
            TaskOutcome::Success
        }
        Err(err) => {
            let message = format!("{err:#}");
            error!(task = %task.name, run_id = task.run_id, error = %message, "task failed");
            TaskOutcome::Failed(message)
        }
    };

    if env
        .runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        warn!(task = %task.name, "runtime gone; completion dropped");
    }
}

/// Dispatch on the task name.
pub async fn execute(name: &str, env: Arc<TaskEnvironment>) -> Result<()> {
    let kind: TaskKind = name.parse().map_err(anyhow::Error::msg)?;

    match kind {
        TaskKind::Images => run_images(env).await,
        TaskKind::Styles => run_styles(env).await,
        TaskKind::Markup => run_markup(env).await,
        TaskKind::BundleScript => bundle_script(env).await,
        TaskKind::Watch => start_watching(env).await,
        TaskKind::Build => {
            info!("build complete");
            Ok(())
        }
    }
}

/// Bundle every configured entry; in watch mode the contexts stay resident.
pub async fn bundle_script(env: Arc<TaskEnvironment>) -> Result<()> {
    let mut task = BundleTask::new(
        env.config.bundle_configs().to_vec(),
        env.config.build_options(),
        env.root.clone(),
        Arc::clone(&env.fs),
        Arc::clone(&env.bundler),
        Arc::clone(&env.notifier),
    );
    if env.watch_mode {
        task = task.watch_with(Arc::clone(&env.dependency_watch));
    }

    let run = task.run().await;
    let aborted = run.aborted();

    if env.watch_mode {
        for handle in run.contexts {
            env.keep_resident(Resident::Task(handle));
        }
    }

    if !aborted.is_empty() {
        bail!("bundle output failed: {}", aborted.join("; "));
    }
    Ok(())
}

/// Subscribe the style, image and markup globs to re-trigger their tasks and
/// start the live-reload server when enabled.
pub async fn start_watching(env: Arc<TaskEnvironment>) -> Result<()> {
    let profiles = build_pipeline_profiles(&env.config)?;
    let watcher = spawn_watcher(
        env.root.clone(),
        profiles,
        env.runtime_tx.clone(),
        Arc::clone(&env.fs),
    )?;
    env.keep_resident(Resident::Watcher(watcher));

    let settings = env.config.livereload();
    if settings.enabled {
        let server = livereload::start(&env.root, settings).await?;
        info!(addr = %server.local_addr(), "live reload listening");
        env.keep_resident(Resident::LiveReload(server));
    }

    info!(root = ?env.root, "watching for changes");
    Ok(())
}
