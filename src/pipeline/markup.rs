// src/pipeline/markup.rs

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::MarkupConfig;
use crate::fs::FileSystem;
use crate::pipeline::sources::{collect_sources, join_root};
use crate::pipeline::TransformReport;

/// Copy every file matched by `cfg.src` into `cfg.dest`, preserving paths
/// relative to the glob base. Destinations with identical content are left
/// untouched so live-reload only sees real changes.
pub fn copy_markup(fs: &dyn FileSystem, root: &Path, cfg: &MarkupConfig) -> Result<TransformReport> {
    let dest_dir = join_root(root, &cfg.dest);
    let mut report = TransformReport::default();

    for source in collect_sources(fs, root, &cfg.src)? {
        let out = dest_dir.join(&source.relative);
        let content = fs.read(&source.path)?;

        if fs.is_file(&out) && fs.read(&out)? == content {
            report.skipped += 1;
            continue;
        }

        fs.write(&out, &content)?;
        debug!(src = ?source.path, out = ?out, "markup copied");
        report.written.push(out);
    }

    info!(
        written = report.written.len(),
        skipped = report.skipped,
        "markup copied"
    );
    Ok(report)
}
