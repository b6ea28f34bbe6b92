// src/bundle/resolve.rs

//! CommonJS module resolution against a [`FileSystem`].

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use tracing::trace;

use crate::fs::FileSystem;

/// Resolves `require` requests to files.
///
/// Every file consulted while resolving (including `package.json`
/// manifests) is recorded so the caller can watch it.
pub struct Resolver<'a> {
    fs: &'a dyn FileSystem,
    extensions: Vec<String>,
    consulted: RefCell<BTreeSet<PathBuf>>,
}

impl<'a> Resolver<'a> {
    /// `extra_extensions` are tried after `.js` and `.json`.
    pub fn new(fs: &'a dyn FileSystem, extra_extensions: &[String]) -> Self {
        let mut extensions = vec![".js".to_string(), ".json".to_string()];
        for ext in extra_extensions {
            if !extensions.contains(ext) {
                extensions.push(ext.clone());
            }
        }
        Self {
            fs,
            extensions,
            consulted: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Manifests read during resolution so far.
    pub fn take_consulted(&self) -> BTreeSet<PathBuf> {
        std::mem::take(&mut *self.consulted.borrow_mut())
    }

    /// Resolve `request` as written in `from_file`.
    pub fn resolve(&self, from_file: &Path, request: &str) -> Option<PathBuf> {
        let dir = from_file.parent().unwrap_or_else(|| Path::new(""));

        let resolved = if is_path_request(request) {
            let target = if request.starts_with('/') {
                PathBuf::from(request)
            } else {
                normalize_path(&dir.join(request))
            };
            self.load_as_file(&target)
                .or_else(|| self.load_as_directory(&target))
        } else {
            self.load_node_module(dir, request)
        };

        trace!(from = ?from_file, request, resolved = ?resolved, "resolve");
        resolved
    }

    fn load_as_file(&self, path: &Path) -> Option<PathBuf> {
        if self.fs.is_file(path) {
            return Some(path.to_path_buf());
        }
        let file_name = path.file_name()?.to_str()?;
        self.extensions.iter().find_map(|ext| {
            let candidate = path.with_file_name(format!("{file_name}{ext}"));
            self.fs.is_file(&candidate).then_some(candidate)
        })
    }

    fn load_index(&self, dir: &Path) -> Option<PathBuf> {
        self.extensions.iter().find_map(|ext| {
            let candidate = dir.join(format!("index{ext}"));
            self.fs.is_file(&candidate).then_some(candidate)
        })
    }

    fn load_as_directory(&self, dir: &Path) -> Option<PathBuf> {
        if !self.fs.is_dir(dir) {
            return None;
        }

        let manifest = dir.join("package.json");
        if self.fs.is_file(&manifest) {
            self.consulted.borrow_mut().insert(manifest.clone());
            if let Some(main) = self.read_main(&manifest) {
                let target = normalize_path(&dir.join(main));
                if let Some(found) = self
                    .load_as_file(&target)
                    .or_else(|| self.load_index(&target))
                {
                    return Some(found);
                }
            }
        }

        self.load_index(dir)
    }

    fn read_main(&self, manifest: &Path) -> Option<String> {
        let text = self.fs.read_to_string(manifest).ok()?;
        let value: serde_json::Value = serde_json::from_str(&text).ok()?;
        value
            .get("main")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }

    fn load_node_module(&self, start: &Path, request: &str) -> Option<PathBuf> {
        for dir in start.ancestors() {
            if dir.file_name().is_some_and(|n| n == "node_modules") {
                continue;
            }
            let candidate = dir.join("node_modules").join(request);
            if let Some(found) = self
                .load_as_file(&candidate)
                .or_else(|| self.load_as_directory(&candidate))
            {
                return Some(normalize_path(&found));
            }
        }
        None
    }
}

fn is_path_request(request: &str) -> bool {
    request == "."
        || request == ".."
        || request.starts_with("./")
        || request.starts_with("../")
        || request.starts_with('/')
}

/// Lexically resolve `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}
