// src/exec/environment.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::bundle::{CommonJsBundler, DependencyWatchFactory, NotifyDependencyWatchFactory, ScriptBundler};
use crate::config::ConfigFile;
use crate::engine::RuntimeEvent;
use crate::fs::{FileSystem, RealFileSystem};
use crate::livereload::LiveReloadHandle;
use crate::notifier::{notifier_from_settings, Notifier};
use crate::watch::WatcherHandle;

/// Something a task started that must outlive the task itself.
#[derive(Debug)]
pub enum Resident {
    Watcher(WatcherHandle),
    LiveReload(LiveReloadHandle),
    Task(JoinHandle<()>),
}

/// Everything a task action needs, shared by all tasks of a process.
///
/// `watch_mode` is fixed at construction: true when the requested target is
/// `watch`, which makes `bundle-script` keep its contexts resident.
pub struct TaskEnvironment {
    pub config: Arc<ConfigFile>,
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub bundler: Arc<dyn ScriptBundler>,
    pub notifier: Arc<dyn Notifier>,
    pub dependency_watch: Arc<dyn DependencyWatchFactory>,
    pub watch_mode: bool,
    pub runtime_tx: mpsc::Sender<RuntimeEvent>,
    residents: Mutex<Vec<Resident>>,
}

impl fmt::Debug for TaskEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEnvironment")
            .field("root", &self.root)
            .field("watch_mode", &self.watch_mode)
            .field("residents", &self.resident_count())
            .finish_non_exhaustive()
    }
}

impl TaskEnvironment {
    /// Production defaults: real filesystem, CommonJS bundler, notifier per
    /// `[notify]`, `notify`-backed dependency watching.
    pub fn new(
        config: ConfigFile,
        root: impl Into<PathBuf>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        watch_mode: bool,
    ) -> Self {
        let notifier = notifier_from_settings(config.notify());
        let debounce = Duration::from_millis(config.watch().debounce_ms);
        Self {
            config: Arc::new(config),
            root: root.into(),
            fs: Arc::new(RealFileSystem),
            bundler: Arc::new(CommonJsBundler::new()),
            notifier,
            dependency_watch: Arc::new(NotifyDependencyWatchFactory::new(debounce)),
            watch_mode,
            runtime_tx,
            residents: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_bundler(mut self, bundler: Arc<dyn ScriptBundler>) -> Self {
        self.bundler = bundler;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_dependency_watch(mut self, factory: Arc<dyn DependencyWatchFactory>) -> Self {
        self.dependency_watch = factory;
        self
    }

    pub fn keep_resident(&self, resident: Resident) {
        debug!(?resident, "keeping resident");
        self.residents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(resident);
    }

    pub fn resident_count(&self) -> usize {
        self.residents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
