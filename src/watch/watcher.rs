// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::watch::debounce::is_content_change;
use crate::watch::event_handler::ChangeRouter;
use crate::watch::patterns::TaskWatchProfile;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher that observes `root` recursively and sends
/// `RuntimeEvent::TaskTriggered` for tasks whose source globs match a
/// changed path.
///
/// Only content changes are considered; access events from our own hashing
/// reads would otherwise feed back into the loop.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<TaskWatchProfile>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    fs: Arc<dyn FileSystem>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = event_tx.send(event);
            }
            Err(err) => error!("file watch error: {err}"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!("file watcher started on {:?}", root);

    let router = Arc::new(Mutex::new(ChangeRouter::new(root, profiles, fs)));

    tokio::spawn(async move {
        {
            let router = Arc::clone(&router);
            let _ = tokio::task::spawn_blocking(move || {
                router.lock().unwrap_or_else(PoisonError::into_inner).prime();
            })
            .await;
        }

        while let Some(event) = event_rx.recv().await {
            if !is_content_change(&event.kind) {
                continue;
            }
            debug!(?event, "received notify event");

            let router = Arc::clone(&router);
            let paths = event.paths;
            let routed = tokio::task::spawn_blocking(move || {
                let mut router = router.lock().unwrap_or_else(PoisonError::into_inner);
                let mut tasks: Vec<String> = Vec::new();
                for path in &paths {
                    for task in router.route(path) {
                        if !tasks.contains(&task) {
                            tasks.push(task);
                        }
                    }
                }
                tasks
            })
            .await;

            let tasks = match routed {
                Ok(tasks) => tasks,
                Err(err) => {
                    warn!("change routing panicked: {err}");
                    continue;
                }
            };

            for task in tasks {
                let event = RuntimeEvent::TaskTriggered {
                    task,
                    reason: TriggerReason::FileWatch,
                };
                if runtime_tx.send(event).await.is_err() {
                    debug!("runtime channel closed; stopping watcher loop");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
