// src/bundle/mod.rs

//! Script bundling.
//!
//! - [`commonjs`]: the default [`ScriptBundler`], a CommonJS bundler that
//!   follows `require` calls from an entry point.
//! - [`context`]: one [`BundleContext`] per configured entry; runs passes and
//!   tracks the files each pass read.
//! - [`barrier`]: [`FirstPassBarrier`], resolved once every context finished
//!   its first pass.
//! - [`task`]: the `bundle-script` task tying the above together, including
//!   rebuild-on-change in watch mode.
//! - [`dependency_watch`]: per-context watchers over a dependency set.
//! - [`logger`]: pass timing and size logging.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::config::BuildOptions;
use crate::errors::CompileError;
use crate::fs::FileSystem;

pub mod barrier;
pub mod commonjs;
pub mod context;
pub mod dependency_watch;
pub mod logger;
pub mod resolve;
pub mod source_map;
pub mod task;

pub use barrier::{Arrival, FirstPassBarrier, FirstPassReport};
pub use commonjs::CommonJsBundler;
pub use context::{BundleContext, ContextState, PassOutcome};
pub use dependency_watch::{
    ChangeBatch, DependencyWatch, DependencyWatchFactory, NotifyDependencyWatchFactory,
};
pub use logger::{pretty_duration, BundleLogger, BundleTimer};
pub use task::{BundleRun, BundleTask, PassEvent};

/// Input for one bundling pass.
#[derive(Debug, Clone, Copy)]
pub struct BundleRequest<'a> {
    /// Project root; source-map paths are made relative to it.
    pub root: &'a Path,
    /// Entry file as a filesystem path.
    pub entry: &'a Path,
    /// File name of the produced bundle, used for the map's `file` field.
    pub output_name: &'a str,
    pub options: &'a BuildOptions,
}

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOutput {
    pub code: String,
    /// Serialized v3 source map, when `options.source_maps` is set.
    pub source_map: Option<String>,
    /// Every file read to produce this bundle.
    pub dependencies: BTreeSet<PathBuf>,
}

/// A failed pass still reports what it read, so watchers can pick up the
/// fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFailure {
    pub error: CompileError,
    pub dependencies: BTreeSet<PathBuf>,
}

/// Turns an entry point into a single script.
///
/// Implementations are stateless between passes; each call reads its inputs
/// fresh through `fs`.
pub trait ScriptBundler: Send + Sync + Debug {
    fn bundle(
        &self,
        fs: &dyn FileSystem,
        request: &BundleRequest<'_>,
    ) -> Result<BundleOutput, BundleFailure>;
}
