// src/watch/event_handler.rs

//! Turns individual changed paths into task triggers.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::watch::cache::FileCache;
use crate::watch::dag_filter::has_dependent_in_matching;
use crate::watch::hash::{compute_aggregate_hash, MemoryHashStore};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{collect_matching_files, TaskWatchProfile};

/// Routes changed paths to the tasks that should be re-triggered.
///
/// For each path:
/// 1. find every profile whose globs match the root-relative path;
/// 2. drop tasks that another matching task already depends on;
/// 3. for `use_hash` profiles, drop tasks whose aggregated content hash is
///    unchanged.
#[derive(Debug)]
pub struct ChangeRouter {
    root: PathBuf,
    profiles: Vec<TaskWatchProfile>,
    dep_map: HashMap<String, Vec<String>>,
    fs: Arc<dyn FileSystem>,
    hashes: MemoryHashStore,
    cache: FileCache,
}

impl ChangeRouter {
    pub fn new(root: PathBuf, profiles: Vec<TaskWatchProfile>, fs: Arc<dyn FileSystem>) -> Self {
        let dep_map = profiles
            .iter()
            .map(|p| (p.name().to_string(), p.deps().to_vec()))
            .collect();

        Self {
            root,
            profiles,
            dep_map,
            fs,
            hashes: MemoryHashStore::new(),
            cache: FileCache::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record the current content hash of every `use_hash` profile so the
    /// first change event is compared against the startup state.
    pub fn prime(&mut self) {
        for idx in 0..self.profiles.len() {
            if !self.profiles[idx].use_hash() {
                continue;
            }
            if let Some(hash) = self.aggregate_hash(idx) {
                let name = self.profiles[idx].name().to_string();
                self.hashes.save(&name, hash);
            }
        }
    }

    /// Tasks to trigger for a change at `path`, sorted by name.
    pub fn route(&mut self, path: &Path) -> Vec<TaskName> {
        let Some(rel) = relative_str(&self.root, path) else {
            debug!(?path, root = ?self.root, "change outside watch root; ignoring");
            return Vec::new();
        };

        let matching: Vec<usize> = self
            .profiles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.matches(&rel))
            .map(|(idx, _)| idx)
            .collect();

        if matching.is_empty() {
            return Vec::new();
        }

        let matching_names: HashSet<String> = matching
            .iter()
            .map(|&idx| self.profiles[idx].name().to_string())
            .collect();

        let selected: Vec<usize> = matching
            .into_iter()
            .filter(|&idx| {
                !has_dependent_in_matching(
                    self.profiles[idx].name(),
                    &matching_names,
                    &self.dep_map,
                )
            })
            .collect();

        self.cache.invalidate(path);

        let mut triggered = Vec::new();
        for idx in selected {
            let name = self.profiles[idx].name().to_string();
            if self.profiles[idx].use_hash() && !self.content_changed(idx) {
                info!(task = %name, path = %rel, "watched content unchanged; skipping trigger");
                continue;
            }
            debug!(task = %name, path = %rel, "watch match -> triggering task");
            triggered.push(name);
        }

        triggered.sort();
        triggered
    }

    /// Compare and store the profile's aggregate hash. Any hashing failure
    /// counts as a change.
    fn content_changed(&mut self, idx: usize) -> bool {
        let name = self.profiles[idx].name().to_string();
        match self.aggregate_hash(idx) {
            Some(hash) => self.hashes.save(&name, hash),
            None => true,
        }
    }

    fn aggregate_hash(&mut self, idx: usize) -> Option<String> {
        let profile = &self.profiles[idx];
        let files = match collect_matching_files(self.fs.as_ref(), &self.root, profile) {
            Ok(files) => files,
            Err(err) => {
                warn!(task = %profile.name(), error = %err, "failed to collect watched files");
                return None;
            }
        };

        let mut file_hashes = Vec::with_capacity(files.len());
        for file in &files {
            match self.cache.get_or_compute(self.fs.as_ref(), file) {
                Ok(hash) => file_hashes.push(hash),
                Err(err) => {
                    warn!(task = %profile.name(), file = ?file, error = %err, "failed to hash watched file");
                    return None;
                }
            }
        }

        Some(compute_aggregate_hash(&file_hashes))
    }
}
