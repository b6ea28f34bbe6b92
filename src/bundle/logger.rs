// src/bundle/logger.rs

use std::time::{Duration, Instant};

use tracing::info;

/// Logs the start and end of bundling passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleLogger;

/// A running pass; consumed by [`BundleTimer::end`].
#[derive(Debug)]
#[must_use = "a started pass should be ended to log its duration"]
pub struct BundleTimer {
    output_name: String,
    started: Instant,
}

impl BundleLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn begin(&self, output_name: &str) -> BundleTimer {
        info!(output = %output_name, "bundling");
        BundleTimer {
            output_name: output_name.to_string(),
            started: Instant::now(),
        }
    }
}

impl BundleTimer {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Log completion with the bundle size in bytes.
    pub fn end(self, bytes: usize) -> Duration {
        let elapsed = self.started.elapsed();
        info!(
            output = %self.output_name,
            elapsed = %pretty_duration(elapsed),
            bytes,
            "bundled"
        );
        elapsed
    }

    /// Log that the pass ended without output.
    pub fn fail(self) -> Duration {
        let elapsed = self.started.elapsed();
        info!(
            output = %self.output_name,
            elapsed = %pretty_duration(elapsed),
            "bundling failed"
        );
        elapsed
    }
}

/// Human readable duration using the largest fitting unit:
/// `1.25 s`, `340 ms`, `12 μs`, `800 ns`. Minutes are spelled out above 60 s.
pub fn pretty_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if d.as_secs() >= 60 {
        let secs = d.as_secs();
        return format!("{} m {} s", secs / 60, secs % 60);
    }
    if d.as_secs() >= 1 {
        return format!("{} s", trim_decimals(d.as_secs_f64()));
    }
    if nanos >= 1_000_000 {
        return format!("{} ms", (nanos + 500_000) / 1_000_000);
    }
    if nanos >= 1_000 {
        return format!("{} μs", (nanos + 500) / 1_000);
    }
    format!("{nanos} ns")
}

fn trim_decimals(value: f64) -> String {
    let s = format!("{value:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
