// src/errors.rs

//! Crate-wide error types.
//!
//! Two families live here:
//! - [`PipelineError`]: failures that abort a task (or the whole process),
//!   e.g. a bad config file or an unwritable output directory.
//! - [`CompileError`]: transform errors (Sass syntax, unresolvable
//!   `require`, undecodable image). These are recovered at the task boundary
//!   by [`crate::notifier::report_compile_error`] and never fail a task.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Tasks failed: {}", .0.join(", "))]
    TasksFailed(Vec<String>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A transform error that is reported to the user but does not stop the
/// pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("{}: {message}", path.display())]
    Stylesheet { path: PathBuf, message: String },

    #[error("{}: {message}", path.display())]
    Script { path: PathBuf, message: String },

    #[error("{}: {message}", path.display())]
    Image { path: PathBuf, message: String },
}

impl CompileError {
    /// Source file the error was raised for.
    pub fn path(&self) -> &PathBuf {
        match self {
            CompileError::Stylesheet { path, .. }
            | CompileError::Script { path, .. }
            | CompileError::Image { path, .. } => path,
        }
    }

    /// Bare error message without the path prefix.
    pub fn message(&self) -> &str {
        match self {
            CompileError::Stylesheet { message, .. }
            | CompileError::Script { message, .. }
            | CompileError::Image { message, .. } => message,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
