// src/pipeline/mod.rs

//! Stream-style asset transforms: glob-matched inputs → transform → output
//! directory.
//!
//! - [`images`]: "changed" filter plus lossless PNG optimization.
//! - [`styles`]: Sass/SCSS compilation via `grass`.
//! - [`markup`]: plain copy into the output directory.
//!
//! The transforms are synchronous and run on Tokio's blocking pool from the
//! `run_*` wrappers, which also route compile errors to the notifier.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::errors::CompileError;
use crate::exec::TaskEnvironment;
use crate::notifier::report_all;

pub mod images;
pub mod markup;
pub mod sources;
pub mod styles;

pub use images::optimize_images;
pub use markup::copy_markup;
pub use styles::compile_styles;

/// What a transform did with its inputs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransformReport {
    pub written: Vec<PathBuf>,
    /// Inputs left alone because their output was already up to date.
    pub skipped: usize,
    pub errors: Vec<CompileError>,
}

async fn run_transform<F>(env: Arc<TaskEnvironment>, what: &'static str, transform: F) -> Result<()>
where
    F: FnOnce(&TaskEnvironment) -> Result<TransformReport> + Send + 'static,
{
    let worker_env = Arc::clone(&env);
    let report = tokio::task::spawn_blocking(move || transform(&worker_env))
        .await
        .with_context(|| format!("{what} worker panicked"))??;

    report_all(env.notifier.as_ref(), &report.errors);
    Ok(())
}

pub async fn run_images(env: Arc<TaskEnvironment>) -> Result<()> {
    run_transform(env, "images", |env| {
        optimize_images(env.fs.as_ref(), &env.root, env.config.images())
    })
    .await
}

pub async fn run_styles(env: Arc<TaskEnvironment>) -> Result<()> {
    run_transform(env, "styles", |env| {
        compile_styles(env.fs.as_ref(), &env.root, env.config.styles())
    })
    .await
}

pub async fn run_markup(env: Arc<TaskEnvironment>) -> Result<()> {
    run_transform(env, "markup", |env| {
        copy_markup(env.fs.as_ref(), &env.root, env.config.markup())
    })
    .await
}
