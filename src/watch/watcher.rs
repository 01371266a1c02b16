// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::types::TriggerReason;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBinding;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher that observes `root` recursively and sends
/// `RuntimeEvent::TaskTriggered` for every binding whose globs match a
/// changed path.
///
/// - `root` is the project root against which all glob patterns are evaluated.
/// - `bindings` is the compiled per-transform watch set.
/// - `runtime_tx` is the channel into the main runtime.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: Vec<WatchBinding>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let bindings = Arc::new(bindings);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("assetpipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetpipe: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    let async_root = root.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !is_content_change(&event.kind) {
                continue;
            }
            debug!("received notify event: {:?}", event);

            for path in &event.paths {
                let Some(rel_str) = relative_str(&async_root, path) else {
                    warn!(
                        "could not relativize path {:?} against root {:?}",
                        path, async_root
                    );
                    continue;
                };

                for binding in bindings.iter().filter(|b| b.matches(&rel_str)) {
                    debug!(
                        task = %binding.task(),
                        path = %rel_str,
                        "watch match -> triggering transform"
                    );
                    let event = RuntimeEvent::TaskTriggered {
                        task: binding.task(),
                        reason: TriggerReason::FileWatch,
                    };
                    if let Err(err) = runtime_tx.send(event).await {
                        warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
                        // Runtime is gone; nothing left to notify.
                        return;
                    }
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Only events that can change file contents re-trigger transforms; reads
/// performed by the transforms themselves show up as access events.
fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    #[test]
    fn access_events_do_not_trigger() {
        assert!(!is_content_change(&EventKind::Access(AccessKind::Any)));
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Any)));
    }
}
