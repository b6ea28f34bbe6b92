// src/dag/mod.rs

//! The pipeline task graph and the per-run scheduler driving it.

pub mod graph;
pub mod run;
pub mod scheduler;

pub use graph::DagGraph;
pub use run::{ScheduledTask, SchedulerStep, TaskRunState};
pub use scheduler::Scheduler;
