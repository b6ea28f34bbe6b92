// src/bundle/dependency_watch.rs

//! Watches the files a bundle context read during its last pass.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::watch::debounce::DebouncedWatcher;

/// Dependency paths that changed within one debounce window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    pub paths: Vec<PathBuf>,
}

/// Change feed over a context's dependency set.
pub trait DependencyWatch: Send {
    /// Replace the watched set with `dependencies`.
    fn update(&mut self, dependencies: &BTreeSet<PathBuf>) -> Result<()>;

    /// Wait for the next batch of changes. `None` once the feed is closed.
    fn next_change(&mut self) -> Pin<Box<dyn Future<Output = Option<ChangeBatch>> + Send + '_>>;
}

/// Creates one [`DependencyWatch`] per bundle context.
pub trait DependencyWatchFactory: Send + Sync + fmt::Debug {
    fn create(&self, output_name: &str) -> Result<Box<dyn DependencyWatch>>;
}

/// Factory for debounced `notify` watchers.
#[derive(Debug, Clone)]
pub struct NotifyDependencyWatchFactory {
    debounce: Duration,
}

impl NotifyDependencyWatchFactory {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce }
    }
}

impl DependencyWatchFactory for NotifyDependencyWatchFactory {
    fn create(&self, output_name: &str) -> Result<Box<dyn DependencyWatch>> {
        Ok(Box::new(NotifyDependencyWatch::new(output_name, self.debounce)?))
    }
}

/// Watches the parent directory of every dependency (non-recursively) and
/// forwards content changes to files in the tracked set. Reads of tracked
/// files (as done by every bundling pass) are not changes.
pub struct NotifyDependencyWatch {
    output_name: String,
    watcher: DebouncedWatcher,
    watched_dirs: BTreeSet<PathBuf>,
    tracked: Arc<Mutex<BTreeSet<PathBuf>>>,
    rx: mpsc::UnboundedReceiver<ChangeBatch>,
}

impl fmt::Debug for NotifyDependencyWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyDependencyWatch")
            .field("output_name", &self.output_name)
            .field("watched_dirs", &self.watched_dirs)
            .finish_non_exhaustive()
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

impl NotifyDependencyWatch {
    pub fn new(output_name: &str, debounce: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracked: Arc<Mutex<BTreeSet<PathBuf>>> = Arc::new(Mutex::new(BTreeSet::new()));

        let callback_tracked = Arc::clone(&tracked);
        let callback_name = output_name.to_string();
        let watcher = DebouncedWatcher::new(output_name, debounce, move |changed| {
            let tracked = callback_tracked
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mut paths: Vec<PathBuf> = changed
                .iter()
                .map(|p| canonical(p))
                .filter(|p| tracked.contains(p))
                .collect();
            drop(tracked);

            paths.sort();
            paths.dedup();
            if paths.is_empty() {
                return;
            }
            debug!(output = %callback_name, ?paths, "dependency change");
            if tx.send(ChangeBatch { paths }).is_err() {
                debug!(output = %callback_name, "dependency change receiver dropped");
            }
        })
        .with_context(|| format!("creating dependency watcher for {output_name}"))?;

        Ok(Self {
            output_name: output_name.to_string(),
            watcher,
            watched_dirs: BTreeSet::new(),
            tracked,
            rx,
        })
    }
}

impl DependencyWatch for NotifyDependencyWatch {
    fn update(&mut self, dependencies: &BTreeSet<PathBuf>) -> Result<()> {
        let files: BTreeSet<PathBuf> = dependencies.iter().map(|p| canonical(p)).collect();
        let dirs: BTreeSet<PathBuf> = files
            .iter()
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect();

        for dir in self.watched_dirs.difference(&dirs) {
            if let Err(err) = self.watcher.watcher().unwatch(dir) {
                debug!(dir = ?dir, error = %err, "unwatch failed");
            }
        }

        let mut watched = BTreeSet::new();
        for dir in &dirs {
            if self.watched_dirs.contains(dir) {
                watched.insert(dir.clone());
                continue;
            }
            match self
                .watcher
                .watcher()
                .watch(dir, RecursiveMode::NonRecursive)
            {
                Ok(()) => {
                    watched.insert(dir.clone());
                }
                Err(err) => {
                    warn!(output = %self.output_name, dir = ?dir, error = %err, "cannot watch directory");
                }
            }
        }

        *self.tracked.lock().unwrap_or_else(PoisonError::into_inner) = files;
        info!(
            output = %self.output_name,
            files = dependencies.len(),
            dirs = watched.len(),
            "watching bundle dependencies"
        );
        self.watched_dirs = watched;
        Ok(())
    }

    fn next_change(&mut self) -> Pin<Box<dyn Future<Output = Option<ChangeBatch>> + Send + '_>> {
        Box::pin(self.rx.recv())
    }
}
