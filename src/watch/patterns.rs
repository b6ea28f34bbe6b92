// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::ConfigFile;
use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::pipeline::sources::{glob_base, join_root};
use crate::types::TaskKind;

/// Compiled include/exclude globs for one task.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths (e.g. `"scss/site.scss"`) into [`matches`](Self::matches).
#[derive(Clone)]
pub struct TaskWatchProfile {
    name: TaskName,
    /// Direct dependencies of this task.
    deps: Vec<TaskName>,
    include: GlobSet,
    exclude: Option<GlobSet>,
    /// Literal directory prefixes of the include patterns.
    bases: Vec<PathBuf>,
    use_hash: bool,
}

impl fmt::Debug for TaskWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWatchProfile")
            .field("name", &self.name)
            .field("bases", &self.bases)
            .finish_non_exhaustive()
    }
}

impl TaskWatchProfile {
    pub fn new(
        name: impl Into<TaskName>,
        deps: Vec<TaskName>,
        include: &[String],
        exclude: &[String],
        use_hash: bool,
    ) -> Result<Self> {
        let name = name.into();
        let include_set = build_globset(include)
            .with_context(|| format!("building watch globset for task {name}"))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for task {name}"))?,
            )
        };

        let mut bases: Vec<PathBuf> = include.iter().map(|p| glob_base(p)).collect();
        bases.sort();
        bases.dedup();

        Ok(Self {
            name,
            deps,
            include: include_set,
            exclude: exclude_set,
            bases,
            use_hash,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deps(&self) -> &[TaskName] {
        &self.deps
    }

    /// Whether triggers are suppressed while the task's content hash is
    /// unchanged.
    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// Returns true if this task is interested in the given root-relative
    /// path.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Profiles for the tasks re-triggered by the `watch` task: `images`,
/// `styles` and `markup`, each watching its own source globs.
pub fn build_pipeline_profiles(cfg: &ConfigFile) -> Result<Vec<TaskWatchProfile>> {
    let use_hash = cfg.watch().use_hash;
    let sources = [
        (TaskKind::Images, &cfg.images().src),
        (TaskKind::Styles, &cfg.styles().src),
        (TaskKind::Markup, &cfg.markup().src),
    ];

    sources
        .into_iter()
        .map(|(kind, globs)| {
            let deps = kind
                .dependencies()
                .iter()
                .map(|d| d.as_str().to_string())
                .collect();
            TaskWatchProfile::new(kind.as_str(), deps, globs, &[], use_hash)
        })
        .collect()
}

/// Collect every file under the profile's glob bases that it matches,
/// sorted by path.
///
/// Used when computing aggregated hashes for `use_hash` profiles.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    profile: &TaskWatchProfile,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for base in &profile.bases {
        let base_dir = join_root(root, base);
        if !fs.is_dir(&base_dir) {
            continue;
        }

        let mut stack = vec![base_dir];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    if let Some(rel) = crate::watch::path_utils::relative_str(root, &path) {
                        if profile.matches(&rel) {
                            files.push(path);
                        }
                    }
                }
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}
