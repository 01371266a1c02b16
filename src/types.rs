// src/types.rs

use std::fmt;

/// The build tasks a watch event or the orchestrator can trigger.
///
/// Clean is not part of this set: it runs exactly once, before the first
/// transform, and is never re-triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskKind {
    Markup,
    Styles,
    Scripts,
    Library,
    Images,
    Sprite,
}

impl TaskKind {
    /// Every transform, in the order they are registered and reported.
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Markup,
        TaskKind::Styles,
        TaskKind::Scripts,
        TaskKind::Library,
        TaskKind::Images,
        TaskKind::Sprite,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Markup => "markup",
            TaskKind::Styles => "styles",
            TaskKind::Scripts => "scripts",
            TaskKind::Library => "library",
            TaskKind::Images => "images",
            TaskKind::Sprite => "sprite",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Part of the initial full build.
    Startup,
    /// A watched source file changed.
    FileWatch,
}
