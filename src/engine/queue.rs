// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::types::TaskKind;

/// Triggers that arrived while their transform was already running.
///
/// Semantics:
/// - At most one rerun is remembered per transform; any number of triggers
///   arriving during one run coalesce into it.
/// - Transforms are independent, so a trigger for one never waits on
///   another.
/// - When a transform completes, the runtime calls [`take`](Self::take) to
///   learn whether it must run again straight away.
#[derive(Debug, Default)]
pub struct TriggerQueue {
    pending: BTreeSet<TaskKind>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no queued reruns.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Record that `task` was triggered while running.
    pub fn record_trigger(&mut self, task: TaskKind) {
        let inserted = self.pending.insert(task);
        debug!(task = %task, inserted, "trigger queued behind running transform");
    }

    /// Remove and report the queued rerun of `task`, if any.
    pub fn take(&mut self, task: TaskKind) -> bool {
        self.pending.remove(&task)
    }

}
