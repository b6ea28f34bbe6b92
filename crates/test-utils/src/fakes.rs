//! In-memory stand-ins for the notifier and the dependency watchers.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetpipe::bundle::{ChangeBatch, DependencyWatch, DependencyWatchFactory};
use assetpipe::notifier::{Notification, Notifier};
use tokio::sync::mpsc;

/// Notifier that keeps every notification it receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.sent.lock().unwrap().push(notification.clone());
    }
}

/// Dependency watch driven by the test: [`trigger`](Self::trigger) delivers
/// a change batch to the named context. Every `update` call is recorded.
#[derive(Debug, Default, Clone)]
pub struct ManualDependencyWatchFactory {
    senders: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<ChangeBatch>>>>,
    updates: Arc<Mutex<Vec<(String, BTreeSet<PathBuf>)>>>,
}

impl ManualDependencyWatchFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a change to `output_name`. Returns false if no context with
    /// that name has created its watch yet.
    pub fn trigger(&self, output_name: &str, paths: Vec<PathBuf>) -> bool {
        match self.senders.lock().unwrap().get(output_name) {
            Some(tx) => tx.send(ChangeBatch { paths }).is_ok(),
            None => false,
        }
    }

    /// Every dependency set handed to `update`, in call order.
    pub fn updates(&self) -> Vec<(String, BTreeSet<PathBuf>)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn last_update_for(&self, output_name: &str) -> Option<BTreeSet<PathBuf>> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == output_name)
            .map(|(_, deps)| deps.clone())
    }
}

impl DependencyWatchFactory for ManualDependencyWatchFactory {
    fn create(&self, output_name: &str) -> anyhow::Result<Box<dyn DependencyWatch>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .unwrap()
            .insert(output_name.to_string(), tx);
        Ok(Box::new(ManualDependencyWatch {
            output_name: output_name.to_string(),
            rx,
            updates: Arc::clone(&self.updates),
        }))
    }
}

struct ManualDependencyWatch {
    output_name: String,
    rx: mpsc::UnboundedReceiver<ChangeBatch>,
    updates: Arc<Mutex<Vec<(String, BTreeSet<PathBuf>)>>>,
}

impl DependencyWatch for ManualDependencyWatch {
    fn update(&mut self, dependencies: &BTreeSet<PathBuf>) -> anyhow::Result<()> {
        self.updates
            .lock()
            .unwrap()
            .push((self.output_name.clone(), dependencies.clone()));
        Ok(())
    }

    fn next_change(&mut self) -> Pin<Box<dyn Future<Output = Option<ChangeBatch>> + Send + '_>> {
        Box::pin(self.rx.recv())
    }
}
