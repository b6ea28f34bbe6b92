// src/bundle/context.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::bundle::logger::BundleLogger;
use crate::bundle::{BundleRequest, ScriptBundler};
use crate::config::{BuildOptions, BundleConfig};
use crate::errors::CompileError;
use crate::fs::FileSystem;
use crate::notifier::{report_compile_error, Notifier};
use crate::pipeline::sources::join_root;

/// Lifecycle of a bundle context.
///
/// `Idle → Bundling → {Written | Failed} → (watch ? WaitingForChange →
/// Bundling | Terminal)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Idle,
    Bundling,
    Written,
    Failed,
    WaitingForChange,
    Terminal,
}

/// How a single pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Bundle written; `bytes` is the size of the script (without its map).
    Written { bytes: usize },
    /// A compile error was reported; nothing was written.
    Failed(CompileError),
    /// The pass could not finish (e.g. the output could not be written).
    Aborted(String),
}

/// Per-entry bundling state. Contexts share nothing mutable with each other.
#[derive(Debug)]
pub struct BundleContext {
    config: BundleConfig,
    options: Arc<BuildOptions>,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    bundler: Arc<dyn ScriptBundler>,
    notifier: Arc<dyn Notifier>,
    logger: BundleLogger,
    state: ContextState,
    dependencies: BTreeSet<PathBuf>,
    passes: u64,
}

impl BundleContext {
    pub fn new(
        config: BundleConfig,
        options: Arc<BuildOptions>,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        bundler: Arc<dyn ScriptBundler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let root = root.into();
        let entry = join_root(&root, &config.entry);
        Self {
            config,
            options,
            root,
            fs,
            bundler,
            notifier,
            logger: BundleLogger::new(),
            state: ContextState::Idle,
            dependencies: BTreeSet::from([entry]),
            passes: 0,
        }
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    pub fn output_name(&self) -> &str {
        &self.config.output_name
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Files read by the last pass (always including the entry).
    pub fn dependencies(&self) -> &BTreeSet<PathBuf> {
        &self.dependencies
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn entry_path(&self) -> PathBuf {
        join_root(&self.root, &self.config.entry)
    }

    pub fn output_path(&self) -> PathBuf {
        join_root(&self.root, &self.config.dest).join(&self.config.output_name)
    }

    pub fn wait_for_change(&mut self) {
        self.state = ContextState::WaitingForChange;
    }

    pub fn finish(&mut self) {
        self.state = ContextState::Terminal;
    }

    /// Run one bundling pass.
    ///
    /// Compile errors are reported to the notifier and returned as
    /// `PassOutcome::Failed`; only output write failures are `Err`. Either
    /// way the context ends in `Written` or `Failed`.
    pub fn pass(&mut self) -> Result<PassOutcome> {
        self.state = ContextState::Bundling;
        self.passes += 1;

        let entry = self.entry_path();
        let timer = self.logger.begin(&self.config.output_name);
        let request = BundleRequest {
            root: &self.root,
            entry: &entry,
            output_name: &self.config.output_name,
            options: &self.options,
        };

        match self.bundler.bundle(self.fs.as_ref(), &request) {
            Ok(output) => {
                let out_path = self.output_path();
                if let Err(err) =
                    self.write_output(&out_path, &output.code, output.source_map.as_deref())
                {
                    self.state = ContextState::Failed;
                    timer.fail();
                    return Err(err);
                }

                self.dependencies = output.dependencies;
                self.dependencies.insert(entry);
                self.state = ContextState::Written;

                let bytes = output.code.len();
                timer.end(bytes);
                Ok(PassOutcome::Written { bytes })
            }
            Err(failure) => {
                report_compile_error(self.notifier.as_ref(), &failure.error);

                // Keep watching what was known to matter, plus whatever this
                // pass got to before failing.
                self.dependencies.extend(failure.dependencies);
                self.dependencies.insert(entry);
                self.state = ContextState::Failed;

                timer.fail();
                Ok(PassOutcome::Failed(failure.error))
            }
        }
    }

    fn write_output(&self, out_path: &Path, code: &str, map: Option<&str>) -> Result<()> {
        self.fs
            .write(out_path, code.as_bytes())
            .with_context(|| format!("writing bundle {:?}", out_path))?;

        if let Some(map) = map {
            let map_path = out_path.with_file_name(format!("{}.map", self.config.output_name));
            self.fs
                .write(&map_path, map.as_bytes())
                .with_context(|| format!("writing source map {:?}", map_path))?;
            debug!(map = ?map_path, "source map written");
        }

        Ok(())
    }
}
