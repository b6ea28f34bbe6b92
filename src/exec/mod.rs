// src/exec/mod.rs

//! Task execution layer.
//!
//! This module runs the action behind each scheduled task and reports back
//! to the orchestration runtime via `RuntimeEvent`s.
//!
//! - [`environment`] holds the shared [`TaskEnvironment`] (config, root,
//!   collaborators, watch mode) and the handles of resident watchers.
//! - [`executor_loop`] owns the executor loop that serializes instances of
//!   the same task.
//! - [`task_runner`] maps task names to actions and reports completion.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod environment;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use environment::{Resident, TaskEnvironment};
pub use executor_loop::spawn_executor;
