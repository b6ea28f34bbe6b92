use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// The fixed set of tasks the pipeline knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Images,
    Styles,
    Markup,
    BundleScript,
    Watch,
    Build,
}

impl TaskKind {
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Images,
        TaskKind::Styles,
        TaskKind::Markup,
        TaskKind::BundleScript,
        TaskKind::Watch,
        TaskKind::Build,
    ];

    /// Task name as used on the CLI, in logs and in runtime events.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Images => "images",
            TaskKind::Styles => "styles",
            TaskKind::Markup => "markup",
            TaskKind::BundleScript => "bundle-script",
            TaskKind::Watch => "watch",
            TaskKind::Build => "build",
        }
    }

    /// Direct dependencies: tasks that must complete before this one starts.
    pub fn dependencies(self) -> &'static [TaskKind] {
        match self {
            TaskKind::Images | TaskKind::Markup | TaskKind::BundleScript => &[],
            TaskKind::Styles => &[TaskKind::Images],
            TaskKind::Watch => &[TaskKind::BundleScript],
            TaskKind::Build => &[
                TaskKind::BundleScript,
                TaskKind::Styles,
                TaskKind::Images,
                TaskKind::Markup,
            ],
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    /// Parse a task name. `default` is an alias for `watch`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "images" => Ok(TaskKind::Images),
            "styles" | "sass" => Ok(TaskKind::Styles),
            "markup" => Ok(TaskKind::Markup),
            "bundle-script" | "browserify" => Ok(TaskKind::BundleScript),
            "watch" | "default" => Ok(TaskKind::Watch),
            "build" => Ok(TaskKind::Build),
            other => Err(format!("unknown task: {other}")),
        }
    }
}

/// Behaviour when a new trigger arrives for a task that is already part of
/// the active run.
///
/// - `Queue`: remember the trigger and start a new run when the current one
///   finishes (default behaviour).
/// - `Cancel`: drop any previously queued run and only keep the latest
///   trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// Output style for compiled stylesheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StyleOutput {
    #[default]
    Expanded,
    Compressed,
}
