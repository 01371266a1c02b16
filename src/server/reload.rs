// src/server/reload.rs

//! Live-reload fan-out: the runtime publishes, every connected browser tab
//! subscribes.

use tokio::sync::broadcast;
use tracing::debug;

use crate::types::TaskKind;

/// What a page should do after a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Only stylesheets changed; re-fetch them in place.
    Css,
    /// Reload the whole page.
    Full,
}

impl ReloadKind {
    pub fn for_task(task: TaskKind) -> Self {
        match task {
            TaskKind::Styles => ReloadKind::Css,
            _ => ReloadKind::Full,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReloadKind::Css => "css",
            ReloadKind::Full => "full",
        }
    }
}

/// Cloneable handle to the reload channel.
#[derive(Debug, Clone)]
pub struct Reloader {
    tx: broadcast::Sender<ReloadKind>,
}

impl Reloader {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadKind> {
        self.tx.subscribe()
    }

    /// Tell every connected page that `task` finished; returns how many
    /// pages were listening.
    pub fn reload(&self, task: TaskKind) -> usize {
        let kind = ReloadKind::for_task(task);
        // No subscribers is not an error: nobody has the page open.
        let receivers = self.tx.send(kind).unwrap_or(0);
        debug!(task = %task, kind = kind.as_str(), receivers, "reload broadcast");
        receivers
    }
}

impl Default for Reloader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_reload_kind() {
        let reloader = Reloader::new();
        assert_eq!(reloader.reload(TaskKind::Markup), 0);

        let mut rx = reloader.subscribe();
        assert_eq!(reloader.reload(TaskKind::Styles), 1);
        assert_eq!(rx.recv().await.unwrap(), ReloadKind::Css);

        reloader.reload(TaskKind::Scripts);
        assert_eq!(rx.recv().await.unwrap(), ReloadKind::Full);
    }
}
