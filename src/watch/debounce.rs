// src/watch/debounce.rs

//! A `notify` watcher that only reports content changes, batched over a
//! quiet window.
//!
//! Reading a watched file produces access/open events on most backends.
//! Every consumer here reads the files it watches (bundling passes, output
//! comparison, hashing), so those events must never count as a change.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, Watcher};
use tracing::{debug, warn};

/// Whether an event can mean the file's bytes changed.
///
/// Access events and metadata-only modifications (atime, permissions) are
/// ignored.
pub fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Owns the underlying watcher. Dropping it closes the event channel, which
/// ends the batching thread.
pub struct DebouncedWatcher {
    watcher: RecommendedWatcher,
}

impl std::fmt::Debug for DebouncedWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedWatcher").finish_non_exhaustive()
    }
}

impl DebouncedWatcher {
    /// Start a watcher that calls `on_batch` with the sorted, deduplicated
    /// paths of content changes once no further change arrived for
    /// `quiet`. Nothing is watched until paths are added via
    /// [`DebouncedWatcher::watcher`].
    pub fn new<F>(name: &str, quiet: Duration, mut on_batch: F) -> Result<Self>
    where
        F: FnMut(Vec<PathBuf>) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Vec<PathBuf>>();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_content_change(&event.kind) => {
                    let _ = tx.send(event.paths);
                }
                Ok(_) => {}
                Err(err) => warn!("file watch error: {err}"),
            },
            Config::default(),
        )
        .with_context(|| format!("creating watcher for {name}"))?;

        let thread_name = format!("debounce-{name}");
        thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                while let Ok(first) = rx.recv() {
                    let mut pending: BTreeSet<PathBuf> = first.into_iter().collect();
                    let mut deadline = Instant::now() + quiet;
                    loop {
                        let wait = deadline.saturating_duration_since(Instant::now());
                        match rx.recv_timeout(wait) {
                            Ok(more) => {
                                pending.extend(more);
                                deadline = Instant::now() + quiet;
                            }
                            Err(RecvTimeoutError::Timeout) => break,
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }
                    if !pending.is_empty() {
                        on_batch(pending.into_iter().collect());
                    }
                }
                debug!(thread = %thread_name, "watch channel closed");
            })
            .context("spawning debounce thread")?;

        Ok(Self { watcher })
    }

    pub fn watcher(&mut self) -> &mut RecommendedWatcher {
        &mut self.watcher
    }
}
