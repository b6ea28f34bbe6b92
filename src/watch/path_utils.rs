// src/watch/path_utils.rs

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - A `root` of `.` (or empty) accepts relative paths as they are.
/// - Otherwise we try a direct `strip_prefix(root)`, then the same on
///   canonicalized paths (symlinked temp dirs, `/private/var` on macOS).
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if (root == Path::new(".") || root.as_os_str().is_empty()) && path.is_relative() {
        let rel = path.strip_prefix(".").unwrap_or(path);
        return Some(to_slash(rel));
    }

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
