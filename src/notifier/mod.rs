// src/notifier/mod.rs

//! Error notification boundary.
//!
//! Transform failures ([`CompileError`]) are caught at the task or pass that
//! raised them and routed through [`report_compile_error`]: the error is
//! logged, one [`Notification`] is handed to the configured [`Notifier`], and
//! the caller carries on. Nothing here fails.

use std::fmt::Debug;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::NotifySettings;
use crate::errors::CompileError;

pub mod desktop;

pub use desktop::DesktopNotifier;

/// Title used for every compile error notification.
pub const COMPILE_ERROR_TITLE: &str = "Compile Error";

/// A message for the user's notification center.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn compile_error(err: &CompileError) -> Self {
        Self::new(COMPILE_ERROR_TITLE, err.to_string())
    }
}

/// Sink for notifications.
///
/// Implementations must not block for long and must not fail: delivery is
/// best effort.
pub trait Notifier: Send + Sync + Debug {
    fn notify(&self, notification: &Notification);
}

/// Notifier that only writes to the log; used when `[notify] enabled = false`.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        warn!(
            title = %notification.title,
            message = %notification.message,
            "notification"
        );
    }
}

/// Log a compile error and send exactly one notification for it.
pub fn report_compile_error(notifier: &dyn Notifier, err: &CompileError) {
    error!(path = ?err.path(), error = %err.message(), "compile error");
    notifier.notify(&Notification::compile_error(err));
}

/// Report a batch of compile errors, one notification each.
pub fn report_all(notifier: &dyn Notifier, errors: &[CompileError]) {
    if errors.is_empty() {
        return;
    }
    debug!(count = errors.len(), "reporting compile errors");
    for err in errors {
        report_compile_error(notifier, err);
    }
}

/// Build the notifier selected by `[notify]`.
pub fn notifier_from_settings(settings: &NotifySettings) -> Arc<dyn Notifier> {
    if settings.enabled {
        Arc::new(DesktopNotifier::default())
    } else {
        Arc::new(LogNotifier)
    }
}
