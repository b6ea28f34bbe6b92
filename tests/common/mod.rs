#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use assetpipe::fs::MockFileSystem;
use image::{ImageBuffer, ImageFormat, Rgba};

pub use assetpipe_test_utils::init_tracing;

/// Mock filesystem rooted at `.` holding the given `(path, content)` pairs.
pub fn mock_fs(files: &[(&str, &str)]) -> MockFileSystem {
    let fs = MockFileSystem::new();
    for (path, content) in files {
        fs.add_file(path, content.as_bytes());
    }
    fs
}

/// Write `(path, content)` pairs below `root`, creating directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
}

/// A small, poorly compressed RGBA PNG (solid color, no filtering gains
/// exploited by the default encoder settings).
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, y| Rgba([(x % 7) as u8 * 30, (y % 5) as u8 * 40, 200, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Poll `cond` every 10ms until it holds or two seconds pass.
pub async fn eventually<F>(mut cond: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
