// src/notifier/desktop.rs

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use super::{Notification, Notifier};

/// Sends notifications to the desktop notification center by shelling out to
/// the platform tool (`notify-send` on Linux/BSD, `osascript` on macOS).
///
/// The helper process is spawned on the ambient Tokio runtime and never
/// awaited by the caller. Outside a runtime, or on platforms without a
/// known tool, the notification is only logged.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    program: Option<&'static str>,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        let program = if cfg!(target_os = "macos") {
            Some("osascript")
        } else if cfg!(unix) {
            Some("notify-send")
        } else {
            None
        };
        Self { program }
    }
}

impl DesktopNotifier {
    fn command(&self, notification: &Notification) -> Option<Command> {
        let program = self.program?;
        let mut cmd = Command::new(program);
        if program == "osascript" {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                escape_applescript(&notification.message),
                escape_applescript(&notification.title)
            );
            cmd.arg("-e").arg(script);
        } else {
            cmd.arg(&notification.title).arg(&notification.message);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        Some(cmd)
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) {
        warn!(
            title = %notification.title,
            message = %notification.message,
            "notification"
        );

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no tokio runtime; desktop notification skipped");
            return;
        };
        let Some(mut cmd) = self.command(notification) else {
            return;
        };

        // Spawning needs the runtime context for child reaping.
        let _guard = handle.enter();
        match cmd.spawn() {
            Ok(mut child) => {
                handle.spawn(async move {
                    if let Err(err) = child.wait().await {
                        debug!(error = %err, "desktop notifier exited abnormally");
                    }
                });
            }
            Err(err) => {
                debug!(error = %err, "failed to spawn desktop notifier");
            }
        }
    }
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
