// src/lib.rs

pub mod bundle;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod livereload;
pub mod logging;
pub mod notifier;
pub mod pipeline;
pub mod types;
pub mod watch;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, resolve_config};
use crate::dag::{DagGraph, Scheduler};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::errors::PipelineError;
use crate::exec::{RealExecutorBackend, TaskEnvironment};
use crate::types::TaskKind;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution and the requested target
/// - scheduler / queue / runtime
/// - executor and its task environment
/// - Ctrl-C handling
///
/// One-shot targets return once their closure has run; `watch` keeps the
/// process alive until Ctrl-C or until its initial run fails.
pub async fn run(args: CliArgs) -> Result<()> {
    let (cfg, root) = resolve_config(args.config.as_deref())?;

    let target = TaskKind::from_str(&args.target)
        .map_err(|_| PipelineError::TaskNotFound(args.target.clone()))?;

    if args.dry_run {
        print_dry_run(&cfg, target)?;
        return Ok(());
    }

    let watch_mode = target == TaskKind::Watch;
    let behaviour = cfg.watch().triggered_while_running;
    let queue_length = cfg.watch().queue_length;

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let env = Arc::new(TaskEnvironment::new(cfg, root, rt_tx.clone(), watch_mode));
    let executor = RealExecutorBackend::new(Arc::clone(&env));

    // Ctrl-C -> graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    info!(target = %target, root = ?env.root, "starting");
    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: target.as_str().to_string(),
            reason: TriggerReason::Manual,
        })
        .await?;

    let options = RuntimeOptions {
        exit_when_idle: !watch_mode,
        required_task: watch_mode.then(|| target.as_str().to_string()),
    };

    let core = CoreRuntime::new(Scheduler::standard(), behaviour, queue_length, options);
    let runtime = Runtime::new(core, rt_rx, executor);
    runtime.run().await?;
    Ok(())
}

/// Dry-run output: the execution plan of the target and the effective
/// configuration.
fn print_dry_run(cfg: &ConfigFile, target: TaskKind) -> Result<()> {
    let plan = DagGraph::standard().execution_plan(target.as_str())?;

    println!("assetpipe dry-run");
    println!("  target = {target}");
    println!("  plan = {}", plan.join(" -> "));
    println!();

    let styles = cfg.styles();
    println!("styles: {:?} -> {:?}", styles.src, styles.dest);
    let images = cfg.images();
    println!("images: {:?} -> {:?}", images.src, images.dest);
    let markup = cfg.markup();
    println!("markup: {:?} -> {:?}", markup.src, markup.dest);

    let options = cfg.build_options();
    println!(
        "bundles ({}), source_maps = {}, extensions = {:?}:",
        cfg.bundle_configs().len(),
        options.source_maps,
        options.extensions
    );
    for bundle in cfg.bundle_configs() {
        println!("  - {:?} -> {:?}", bundle.entry, bundle.output_path());
    }

    let watch = cfg.watch();
    println!(
        "watch: triggered_while_running = {:?}, queue_length = {}, use_hash = {}, debounce_ms = {}",
        watch.triggered_while_running, watch.queue_length, watch.use_hash, watch.debounce_ms
    );
    println!("notify: enabled = {}", cfg.notify().enabled);
    let livereload = cfg.livereload();
    if livereload.enabled {
        println!("livereload: {}:{}", livereload.host, livereload.port);
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
