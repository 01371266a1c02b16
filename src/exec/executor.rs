// src/exec/executor.rs

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::transforms::TransformRegistry;
use crate::types::{TaskKind, TriggerReason};

/// A transform the runtime wants executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub task: TaskKind,
    pub reason: TriggerReason,
}

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledTask>` is what the runtime uses as
/// `exec_tx`. Each scheduled transform runs in its own blocking task, so
/// different transforms run in parallel; the runtime guarantees one
/// instance per transform at a time.
pub fn spawn_executor(
    registry: TransformRegistry,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");
        while let Some(scheduled) = rx.recv().await {
            let registry = registry.clone();
            let runtime_tx = runtime_tx.clone();
            tokio::spawn(async move {
                run_task(registry, scheduled, runtime_tx).await;
            });
        }
        info!("executor loop finished (channel closed)");
    });

    tx
}

async fn run_task(
    registry: TransformRegistry,
    scheduled: ScheduledTask,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let task = scheduled.task;
    info!(task = %task, reason = ?scheduled.reason, "starting transform");

    let joined = tokio::task::spawn_blocking(move || registry.run(task)).await;
    let outcome = match joined {
        Ok(Ok(report)) => TaskOutcome::Success(report),
        Ok(Err(err)) => {
            error!(task = %task, error = %format!("{err:#}"), "transform error");
            TaskOutcome::Fatal(format!("{err:#}"))
        }
        Err(err) => {
            error!(task = %task, error = %err, "transform panicked");
            TaskOutcome::Fatal(err.to_string())
        }
    };

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TaskCompleted { task, outcome })
        .await
    {
        error!(task = %task, error = %err, "failed to send TaskCompleted to runtime");
    }
}
