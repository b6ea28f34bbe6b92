// src/pipeline/sources.rs

//! Glob expansion for task inputs.
//!
//! Each pattern is split into a literal *base* directory and the remaining
//! glob; matched files keep their path relative to that base so outputs
//! mirror the source layout (`images/icons/a.png` → `build/images/icons/a.png`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::fs::FileSystem;

/// One matched input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as seen by the filesystem (`root` joined with the match).
    pub path: PathBuf,
    /// Path relative to the glob base of the pattern that matched it.
    pub relative: PathBuf,
}

/// Literal directory prefix of a glob: every leading component without glob
/// metacharacters. A pattern without metacharacters yields its parent.
pub fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let mut base = PathBuf::new();

    for (idx, component) in components.iter().enumerate() {
        let is_last = idx + 1 == components.len();
        if is_last || has_glob_meta(component) {
            break;
        }
        if component.is_empty() && idx == 0 {
            base.push("/");
        } else if !component.is_empty() && *component != "." {
            base.push(component);
        }
    }

    base
}

fn has_glob_meta(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

/// Compile a pattern the way task inputs are matched: `*` stays within one
/// path segment, `**` crosses them.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

/// Expand `patterns` relative to `root`.
///
/// Results are de-duplicated and sorted by path. Dotfiles are skipped, and
/// a pattern whose base directory does not exist simply matches nothing.
pub fn collect_sources(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &[String],
) -> Result<Vec<SourceFile>> {
    let mut found: BTreeMap<PathBuf, SourceFile> = BTreeMap::new();

    for pattern in patterns {
        let matcher = compile_glob(pattern)?;
        let base = glob_base(pattern);
        let base_dir = join_root(root, &base);

        if fs.is_file(&base_dir) {
            continue;
        }
        if !fs.is_dir(&base_dir) {
            debug!(pattern = %pattern, base = ?base_dir, "glob base does not exist; no matches");
            continue;
        }

        let mut stack = vec![base_dir.clone()];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                let hidden = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
                if hidden {
                    continue;
                }

                if fs.is_dir(&path) {
                    stack.push(path);
                    continue;
                }

                let Some(rel_to_root) = relative_to(root, &path) else {
                    continue;
                };
                if !matcher.is_match(&rel_to_root) {
                    continue;
                }

                let relative = match path.strip_prefix(&base_dir) {
                    Ok(rel) => rel.to_path_buf(),
                    Err(_) => PathBuf::from(&rel_to_root),
                };
                found.entry(path.clone()).or_insert(SourceFile { path, relative });
            }
        }
    }

    debug!(patterns = ?patterns, matched = found.len(), "expanded source globs");
    Ok(found.into_values().collect())
}

/// Join a root-relative path onto `root`, without introducing `./` prefixes
/// or trailing separators.
pub fn join_root(root: &Path, rel: &Path) -> PathBuf {
    if rel.as_os_str().is_empty() {
        root.to_path_buf()
    } else if root == Path::new(".") || root.as_os_str().is_empty() || rel.is_absolute() {
        rel.to_path_buf()
    } else {
        root.join(rel)
    }
}

/// `path` relative to `root` with forward slashes.
fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = if root == Path::new(".") || root.as_os_str().is_empty() {
        path.strip_prefix(".").unwrap_or(path)
    } else {
        path.strip_prefix(root).ok()?
    };
    Some(rel.to_string_lossy().replace('\\', "/"))
}
