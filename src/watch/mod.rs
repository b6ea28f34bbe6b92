// src/watch/mod.rs

//! File watching and change detection for the `watch` task.
//!
//! This module is responsible for:
//! - Compiling the source globs of `images`, `styles` and `markup`.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Optionally suppressing triggers when the watched content hash is
//!   unchanged.
//!
//! Script dependencies are watched separately, per bundle context, in
//! `bundle::dependency_watch`.

pub mod cache;
pub mod dag_filter;
pub mod debounce;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use debounce::{is_content_change, DebouncedWatcher};
pub use event_handler::ChangeRouter;
pub use hash::MemoryHashStore;
pub use patterns::{build_pipeline_profiles, TaskWatchProfile};
pub use watcher::{spawn_watcher, WatcherHandle};
