// src/pipeline/images.rs

//! Image optimization: lossless PNG re-encoding, SVG minification, plain
//! copies for everything else, and a "changed" filter so unchanged images are
//! not reprocessed.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, ImageFormat};
use regex::Regex;
use tracing::{debug, info};

use crate::config::ImagesConfig;
use crate::errors::CompileError;
use crate::fs::FileSystem;
use crate::pipeline::sources::{collect_sources, join_root};
use crate::pipeline::TransformReport;

/// Whether `dest` is missing or older than `src`.
pub fn is_changed(fs: &dyn FileSystem, src: &Path, dest: &Path) -> bool {
    match (fs.modified(src), fs.modified(dest)) {
        (Some(src_time), Some(dest_time)) => dest_time < src_time,
        _ => true,
    }
}

static CDATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!\[CDATA\[.*?\]\]>")
        .unwrap_or_else(|e| panic!("cdata pattern is valid: {e}"))
});

static XML_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->").unwrap_or_else(|e| panic!("comment pattern is valid: {e}"))
});

static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r">\s+<").unwrap_or_else(|e| panic!("whitespace pattern is valid: {e}"))
});

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Strip comments and inter-tag whitespace from an SVG document. CDATA
/// sections are kept verbatim. Input that is not UTF-8 is returned as is.
pub fn minify_svg(bytes: &[u8]) -> Vec<u8> {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return bytes.to_vec();
    };

    let squeeze = |markup: &str| -> String {
        let without_comments = XML_COMMENT.replace_all(markup, "");
        BETWEEN_TAGS.replace_all(&without_comments, "><").into_owned()
    };

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for cdata in CDATA.find_iter(text) {
        out.push_str(&squeeze(&text[last..cdata.start()]));
        out.push_str(cdata.as_str());
        last = cdata.end();
    }
    out.push_str(&squeeze(&text[last..]));

    let trimmed = out.trim();
    if trimmed.len() < bytes.len() {
        trimmed.as_bytes().to_vec()
    } else {
        bytes.to_vec()
    }
}

/// Decode and re-encode a PNG with maximum compression and adaptive
/// filtering. Pixels and color type are unchanged; the original bytes are
/// returned when re-encoding does not make the file smaller.
pub fn optimize_png(bytes: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| e.to_string())?;

    let mut encoded = Vec::new();
    PngEncoder::new_with_quality(&mut encoded, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color())
        .map_err(|e| e.to_string())?;

    if encoded.len() < bytes.len() {
        Ok(encoded)
    } else {
        Ok(bytes.to_vec())
    }
}

/// Optimize every image matched by `cfg.src` into `cfg.dest`.
///
/// Files whose destination is at least as new as the source are skipped. A
/// PNG that cannot be decoded is recorded as a compile error and not written.
/// JPEG and GIF files are copied unchanged.
pub fn optimize_images(
    fs: &dyn FileSystem,
    root: &Path,
    cfg: &ImagesConfig,
) -> Result<TransformReport> {
    let dest_dir = join_root(root, &cfg.dest);
    let mut report = TransformReport::default();

    for source in collect_sources(fs, root, &cfg.src)? {
        let out = dest_dir.join(&source.relative);
        if !is_changed(fs, &source.path, &out) {
            report.skipped += 1;
            continue;
        }

        let original = fs.read(&source.path)?;
        let bytes = if has_extension(&source.path, "png") {
            match optimize_png(&original) {
                Ok(optimized) => optimized,
                Err(message) => {
                    report.errors.push(CompileError::Image {
                        path: source.path.clone(),
                        message,
                    });
                    continue;
                }
            }
        } else if has_extension(&source.path, "svg") {
            minify_svg(&original)
        } else {
            original
        };

        fs.write(&out, &bytes)?;
        debug!(src = ?source.path, out = ?out, bytes = bytes.len(), "image written");
        report.written.push(out);
    }

    info!(
        written = report.written.len(),
        skipped = report.skipped,
        errors = report.errors.len(),
        "images optimized"
    );
    Ok(report)
}
