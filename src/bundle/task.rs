// src/bundle/task.rs

//! The `bundle-script` task.
//!
//! One [`BundleContext`] per configured entry, each driven by its own Tokio
//! task. The task result is available once every context has finished its
//! first pass (see [`FirstPassBarrier`]). In watch mode the contexts keep
//! running afterwards, rebuilding once per dependency change; those passes
//! are only logged (and reported to an optional observer).

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::bundle::barrier::{Arrival, FirstPassBarrier, FirstPassReport};
use crate::bundle::context::{BundleContext, PassOutcome};
use crate::bundle::dependency_watch::DependencyWatchFactory;
use crate::bundle::ScriptBundler;
use crate::config::{BuildOptions, BundleConfig};
use crate::fs::FileSystem;
use crate::notifier::Notifier;

/// Emitted after every pass of every context (first passes included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassEvent {
    pub output_name: String,
    /// 1 for the first pass of a context.
    pub pass: u64,
    pub outcome: PassOutcome,
}

/// Result of [`BundleTask::run`].
#[derive(Debug)]
pub struct BundleRun {
    /// One report per configured entry, in configuration order.
    pub first_pass: Vec<FirstPassReport>,
    /// Context drivers. Already finished unless running in watch mode.
    pub contexts: Vec<JoinHandle<()>>,
}

impl BundleRun {
    /// First passes that could not write their output.
    pub fn aborted(&self) -> Vec<String> {
        self.first_pass
            .iter()
            .filter_map(|r| match &r.outcome {
                PassOutcome::Aborted(msg) => Some(format!("{}: {}", r.output_name, msg)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct BundleTask {
    configs: Vec<BundleConfig>,
    options: Arc<BuildOptions>,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    bundler: Arc<dyn ScriptBundler>,
    notifier: Arc<dyn Notifier>,
    watch: Option<Arc<dyn DependencyWatchFactory>>,
    observer: Option<mpsc::UnboundedSender<PassEvent>>,
}

impl BundleTask {
    pub fn new(
        configs: Vec<BundleConfig>,
        options: BuildOptions,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        bundler: Arc<dyn ScriptBundler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            configs,
            options: Arc::new(options),
            root: root.into(),
            fs,
            bundler,
            notifier,
            watch: None,
            observer: None,
        }
    }

    /// Keep contexts resident and rebuild on dependency changes.
    pub fn watch_with(mut self, factory: Arc<dyn DependencyWatchFactory>) -> Self {
        self.watch = Some(factory);
        self
    }

    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<PassEvent>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub async fn run(self) -> BundleRun {
        let (barrier, arrivals) =
            FirstPassBarrier::new(self.configs.iter().map(|c| c.output_name.clone()));

        info!(
            bundles = self.configs.len(),
            watch = self.watch.is_some(),
            "bundle-script starting"
        );

        let mut contexts = Vec::with_capacity(self.configs.len());
        for (config, arrival) in self.configs.into_iter().zip(arrivals) {
            let ctx = BundleContext::new(
                config,
                Arc::clone(&self.options),
                self.root.clone(),
                Arc::clone(&self.fs),
                Arc::clone(&self.bundler),
                Arc::clone(&self.notifier),
            );
            contexts.push(tokio::spawn(drive_context(
                ctx,
                arrival,
                self.watch.clone(),
                self.observer.clone(),
            )));
        }

        let first_pass = barrier.wait().await;
        info!(bundles = first_pass.len(), "bundle-script first pass complete");

        BundleRun {
            first_pass,
            contexts,
        }
    }
}

/// Run one pass on the blocking pool. `None` if the pass panicked, in which
/// case the context is gone.
async fn run_pass(mut ctx: BundleContext) -> Option<(BundleContext, PassOutcome)> {
    let output_name = ctx.output_name().to_string();
    let joined = tokio::task::spawn_blocking(move || {
        let res = ctx.pass();
        (ctx, res)
    })
    .await;

    match joined {
        Ok((ctx, Ok(outcome))) => Some((ctx, outcome)),
        Ok((ctx, Err(err))) => {
            error!(output = %output_name, error = %format!("{err:#}"), "bundle pass aborted");
            Some((ctx, PassOutcome::Aborted(format!("{err:#}"))))
        }
        Err(join_err) => {
            error!(output = %output_name, error = %join_err, "bundle pass panicked");
            None
        }
    }
}

fn observe(observer: &Option<mpsc::UnboundedSender<PassEvent>>, ctx: &BundleContext, outcome: &PassOutcome) {
    if let Some(tx) = observer {
        let _ = tx.send(PassEvent {
            output_name: ctx.output_name().to_string(),
            pass: ctx.passes(),
            outcome: outcome.clone(),
        });
    }
}

async fn drive_context(
    ctx: BundleContext,
    arrival: Arrival,
    watch: Option<Arc<dyn DependencyWatchFactory>>,
    observer: Option<mpsc::UnboundedSender<PassEvent>>,
) {
    // A panic drops `arrival`, which the barrier reports as aborted.
    let Some((mut ctx, outcome)) = run_pass(ctx).await else {
        return;
    };
    observe(&observer, &ctx, &outcome);
    let aborted = matches!(outcome, PassOutcome::Aborted(_));
    arrival.arrive(outcome);

    let Some(factory) = watch else {
        ctx.finish();
        return;
    };
    if aborted {
        ctx.finish();
        return;
    }

    let mut feed = match factory.create(ctx.output_name()) {
        Ok(feed) => feed,
        Err(err) => {
            warn!(output = %ctx.output_name(), error = %format!("{err:#}"), "cannot watch bundle dependencies");
            ctx.finish();
            return;
        }
    };

    loop {
        if let Err(err) = feed.update(ctx.dependencies()) {
            warn!(output = %ctx.output_name(), error = %format!("{err:#}"), "failed to refresh dependency watch");
        }
        ctx.wait_for_change();

        let Some(batch) = feed.next_change().await else {
            break;
        };
        info!(output = %ctx.output_name(), changed = ?batch.paths, "dependency changed; rebuilding");

        let Some((next, outcome)) = run_pass(ctx).await else {
            return;
        };
        ctx = next;
        observe(&observer, &ctx, &outcome);
    }

    ctx.finish();
}
