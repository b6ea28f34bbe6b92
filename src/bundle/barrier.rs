// src/bundle/barrier.rs

//! Join point for the first pass of every bundle context.
//!
//! Each context receives one [`Arrival`]. `arrive` consumes it, so a context
//! can report at most once and later rebuild passes have nothing to report
//! with. [`FirstPassBarrier::wait`] consumes the barrier and resolves after
//! every arrival was used or dropped; a dropped arrival is reported as
//! aborted.

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::bundle::context::PassOutcome;

/// How one context's first pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstPassReport {
    pub output_name: String,
    pub outcome: PassOutcome,
}

#[derive(Debug)]
pub struct Arrival {
    output_name: String,
    tx: oneshot::Sender<PassOutcome>,
}

impl Arrival {
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn arrive(self, outcome: PassOutcome) {
        debug!(output = %self.output_name, ?outcome, "first pass arrived");
        if self.tx.send(outcome).is_err() {
            debug!(output = %self.output_name, "barrier already gone");
        }
    }
}

#[derive(Debug)]
pub struct FirstPassBarrier {
    pending: Vec<(String, oneshot::Receiver<PassOutcome>)>,
}

impl FirstPassBarrier {
    /// One arrival per output name, in the same order.
    pub fn new<I, S>(output_names: I) -> (Self, Vec<Arrival>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pending = Vec::new();
        let mut arrivals = Vec::new();

        for name in output_names {
            let name = name.into();
            let (tx, rx) = oneshot::channel();
            pending.push((name.clone(), rx));
            arrivals.push(Arrival {
                output_name: name,
                tx,
            });
        }

        (Self { pending }, arrivals)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Resolve once every arrival has reported or been dropped. With no
    /// arrivals this returns immediately.
    pub async fn wait(self) -> Vec<FirstPassReport> {
        let mut reports = Vec::with_capacity(self.pending.len());

        for (output_name, rx) in self.pending {
            let outcome = match rx.await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(output = %output_name, "bundle context stopped before its first pass");
                    PassOutcome::Aborted("context stopped before its first pass".to_string())
                }
            };
            reports.push(FirstPassReport {
                output_name,
                outcome,
            });
        }

        reports
    }
}
