// src/watch/hash.rs

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::engine::TaskName;
use crate::fs::FileSystem;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Aggregate hash over per-file hashes.
///
/// `hashes` must be ordered by the corresponding file path for the result to
/// be stable.
pub fn compute_aggregate_hash(hashes: &[String]) -> String {
    let mut hasher = Hasher::new();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, files = hashes.len(), "computed aggregate hash");
    hash
}

/// Last seen aggregate hash per task. Lives as long as the watcher; nothing
/// is persisted.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<TaskName, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, task: &str) -> Option<&str> {
        self.map.get(task).map(String::as_str)
    }

    /// Store `hash` for `task`; returns whether it differs from the
    /// previous value (or there was none).
    pub fn save(&mut self, task: &str, hash: String) -> bool {
        match self.map.insert(task.to_string(), hash) {
            Some(previous) => self.map.get(task).is_some_and(|h| *h != previous),
            None => true,
        }
    }
}
