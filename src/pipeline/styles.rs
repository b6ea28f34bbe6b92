// src/pipeline/styles.rs

//! Sass/SCSS compilation with `grass`.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use grass::{Options, OutputStyle};
use tracing::{debug, info};

use crate::config::StylesConfig;
use crate::errors::CompileError;
use crate::fs::FileSystem;
use crate::pipeline::sources::{collect_sources, join_root, SourceFile};
use crate::pipeline::TransformReport;
use crate::types::StyleOutput;

/// Lets `grass` resolve `@use`/`@import` through our [`FileSystem`].
#[derive(Debug)]
struct GrassFs<'a> {
    fs: &'a dyn FileSystem,
}

impl grass::Fs for GrassFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.fs.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.fs.is_file(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.fs
            .read(path)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e.to_string()))
    }
}

/// A partial (`_name.scss`) is only ever imported, never compiled alone.
pub fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

fn is_stylesheet(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("scss") | Some("sass")
    )
}

/// Compile one stylesheet to CSS text.
pub fn compile_file(
    fs: &dyn FileSystem,
    path: &Path,
    style: StyleOutput,
) -> std::result::Result<String, CompileError> {
    let adapter = GrassFs { fs };
    let load_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let output_style = match style {
        StyleOutput::Expanded => OutputStyle::Expanded,
        StyleOutput::Compressed => OutputStyle::Compressed,
    };

    let options = Options::default()
        .fs(&adapter)
        .load_path(&load_dir)
        .style(output_style);

    grass::from_path(path, &options).map_err(|e| CompileError::Stylesheet {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Compile every non-partial stylesheet matched by `cfg.src` into
/// `cfg.dest`, keeping paths relative to the glob base and swapping the
/// extension for `.css`.
///
/// A stylesheet that fails to compile is recorded in the report and skipped;
/// the remaining files are still written. Write failures abort.
pub fn compile_styles(
    fs: &dyn FileSystem,
    root: &Path,
    cfg: &StylesConfig,
) -> Result<TransformReport> {
    let dest_dir = join_root(root, &cfg.dest);
    let mut report = TransformReport::default();

    let sources: Vec<SourceFile> = collect_sources(fs, root, &cfg.src)?
        .into_iter()
        .filter(|s| is_stylesheet(&s.path) && !is_partial(&s.path))
        .collect();

    for source in sources {
        match compile_file(fs, &source.path, cfg.output_style) {
            Ok(css) => {
                let out = dest_dir.join(source.relative.with_extension("css"));
                fs.write(&out, css.as_bytes())?;
                debug!(src = ?source.path, out = ?out, bytes = css.len(), "stylesheet written");
                report.written.push(out);
            }
            Err(err) => report.errors.push(err),
        }
    }

    info!(
        written = report.written.len(),
        errors = report.errors.len(),
        "styles compiled"
    );
    Ok(report)
}
