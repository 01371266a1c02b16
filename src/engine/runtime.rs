// src/engine/runtime.rs

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::queue::TriggerQueue;
use crate::exec::ScheduledTask;
use crate::server::Reloader;
use crate::transforms::TransformReport;
use crate::types::{TaskKind, TriggerReason};

/// Result of one transform invocation as seen by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The transform ran; per-file failures are counted in the report.
    Success(TransformReport),
    /// Writing outputs failed or the transform panicked. Ends the run.
    Fatal(String),
}

/// Events sent into the runtime from watchers, executor, or external signals.
///
/// - startup seeding and the watcher send `TaskTriggered`
/// - the executor sends `TaskCompleted`
/// - Ctrl-C handling sends `ShutdownRequested`
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered {
        task: TaskKind,
        reason: TriggerReason,
    },
    TaskCompleted {
        task: TaskKind,
        outcome: TaskOutcome,
    },
    ShutdownRequested,
}

/// Options that influence how the runtime behaves.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// If true, exit as soon as nothing is running and nothing is queued
    /// (`--once`). In watch mode this is `false`.
    pub exit_when_idle: bool,
}

/// Totals over every transform run of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub runs: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Whether this was a single build (`--once`).
    pub once: bool,
}

impl RunSummary {
    fn record(&mut self, report: &TransformReport) {
        self.runs += 1;
        self.processed += report.processed;
        self.skipped += report.skipped;
        self.failed += report.failed;
    }

    /// Process exit code: a single build with failed files exits 1.
    pub fn exit_code(&self) -> i32 {
        if self.once && self.failed > 0 { 1 } else { 0 }
    }
}

/// The main orchestration runtime.
///
/// Responsibilities:
/// - Consume `RuntimeEvent`s from watcher/executor/ctrl-c.
/// - Keep each transform to at most one running instance, queueing one
///   rerun for triggers that arrive meanwhile.
/// - Send `ScheduledTask`s to the executor.
/// - Ask the dev server to reload after watch-triggered runs.
pub struct Runtime {
    running: HashMap<TaskKind, TriggerReason>,
    queue: TriggerQueue,
    options: RuntimeOptions,
    reloader: Option<Reloader>,
    summary: RunSummary,

    /// Unified event stream from all producers (watcher, executor, signal handler).
    events_rx: mpsc::Receiver<RuntimeEvent>,

    /// Channel to executor.
    exec_tx: mpsc::Sender<ScheduledTask>,
}

impl Runtime {
    pub fn new(
        options: RuntimeOptions,
        reloader: Option<Reloader>,
        events_rx: mpsc::Receiver<RuntimeEvent>,
        exec_tx: mpsc::Sender<ScheduledTask>,
    ) -> Self {
        let summary = RunSummary {
            once: options.exit_when_idle,
            ..RunSummary::default()
        };
        Self {
            running: HashMap::new(),
            queue: TriggerQueue::new(),
            options,
            reloader,
            summary,
            events_rx,
            exec_tx,
        }
    }

    /// Main event loop.
    ///
    /// Startup triggers must already be in the channel when this is called,
    /// so that `--once` does not see an idle runtime before they arrive.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!("assetpipe runtime started");

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "runtime received event");

            let keep_running = match event {
                RuntimeEvent::TaskTriggered { task, reason } => {
                    self.handle_task_trigger(task, reason).await?
                }
                RuntimeEvent::TaskCompleted { task, outcome } => {
                    self.handle_task_completion(task, outcome).await?
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested, stopping runtime");
                    false
                }
            };

            if !keep_running {
                break;
            }
        }

        info!(
            runs = self.summary.runs,
            processed = self.summary.processed,
            failed = self.summary.failed,
            "assetpipe runtime exiting"
        );
        Ok(self.summary)
    }

    async fn handle_task_trigger(&mut self, task: TaskKind, reason: TriggerReason) -> Result<bool> {
        info!(task = %task, ?reason, "task triggered");

        if self.running.contains_key(&task) {
            self.queue.record_trigger(task);
        } else {
            self.dispatch(task, reason).await?;
        }
        Ok(true)
    }

    async fn handle_task_completion(&mut self, task: TaskKind, outcome: TaskOutcome) -> Result<bool> {
        let reason = self.running.remove(&task);

        match outcome {
            TaskOutcome::Success(report) => {
                if report.failed > 0 {
                    warn!(task = %task, failed = report.failed, "transform finished with failed files");
                }
                self.summary.record(&report);

                if reason == Some(TriggerReason::FileWatch) {
                    if let Some(reloader) = &self.reloader {
                        reloader.reload(task);
                    }
                }
            }
            TaskOutcome::Fatal(message) => {
                error!(task = %task, %message, "transform failed fatally");
                return Err(anyhow!("{task} failed: {message}"));
            }
        }

        if self.queue.take(task) {
            self.dispatch(task, TriggerReason::FileWatch).await?;
        }

        if self.options.exit_when_idle && self.running.is_empty() && self.queue.is_empty() {
            info!("runtime idle and exit_when_idle=true, stopping");
            return Ok(false);
        }

        Ok(true)
    }

    async fn dispatch(&mut self, task: TaskKind, reason: TriggerReason) -> Result<()> {
        debug!(task = %task, "dispatching task to executor");
        self.running.insert(task, reason);
        if let Err(err) = self.exec_tx.send(ScheduledTask { task, reason }).await {
            error!(error = %err, "failed to send task to executor");
            return Err(err.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_single_builds_with_failures_exit_nonzero() {
        let mut summary = RunSummary {
            once: true,
            ..RunSummary::default()
        };
        assert_eq!(summary.exit_code(), 0);

        summary.record(&TransformReport {
            failed: 1,
            ..TransformReport::default()
        });
        assert_eq!(summary.exit_code(), 1);

        summary.once = false;
        assert_eq!(summary.exit_code(), 0);
    }

    #[tokio::test]
    async fn triggers_during_a_run_coalesce_into_one_rerun() {
        let (rt_tx, rt_rx) = mpsc::channel(16);
        let (exec_tx, mut exec_rx) = mpsc::channel(16);
        let runtime = Runtime::new(
            RuntimeOptions {
                exit_when_idle: true,
            },
            None,
            rt_rx,
            exec_tx,
        );

        for _ in 0..3 {
            rt_tx
                .send(RuntimeEvent::TaskTriggered {
                    task: TaskKind::Styles,
                    reason: TriggerReason::FileWatch,
                })
                .await
                .unwrap();
        }
        let handle = tokio::spawn(runtime.run());

        // Fake executor: complete whatever arrives.
        let mut dispatched = 0;
        while let Some(scheduled) = exec_rx.recv().await {
            dispatched += 1;
            rt_tx
                .send(RuntimeEvent::TaskCompleted {
                    task: scheduled.task,
                    outcome: TaskOutcome::Success(TransformReport::default()),
                })
                .await
                .unwrap();
            if dispatched == 2 {
                break;
            }
        }

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(dispatched, 2);
        assert_eq!(summary.runs, 2);
    }

    #[tokio::test]
    async fn only_watch_triggered_completions_reload_pages() {
        use crate::server::ReloadKind;
        use tokio::sync::broadcast::error::TryRecvError;

        let reloader = Reloader::new();
        let mut page = reloader.subscribe();
        let (rt_tx, rt_rx) = mpsc::channel(16);
        let (exec_tx, mut exec_rx) = mpsc::channel(16);
        let runtime = Runtime::new(
            RuntimeOptions {
                exit_when_idle: true,
            },
            Some(reloader),
            rt_rx,
            exec_tx,
        );

        let triggers = [
            (TaskKind::Markup, TriggerReason::Startup),
            (TaskKind::Styles, TriggerReason::FileWatch),
            (TaskKind::Scripts, TriggerReason::FileWatch),
        ];
        for (task, reason) in triggers {
            rt_tx
                .send(RuntimeEvent::TaskTriggered { task, reason })
                .await
                .unwrap();
        }
        let handle = tokio::spawn(runtime.run());

        for _ in 0..triggers.len() {
            let scheduled = exec_rx.recv().await.unwrap();
            rt_tx
                .send(RuntimeEvent::TaskCompleted {
                    task: scheduled.task,
                    outcome: TaskOutcome::Success(TransformReport::default()),
                })
                .await
                .unwrap();
        }

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.runs, 3);
        assert_eq!(page.try_recv().unwrap(), ReloadKind::Css);
        assert_eq!(page.try_recv().unwrap(), ReloadKind::Full);
        assert!(matches!(page.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn fatal_outcome_ends_the_run_with_an_error() {
        let (rt_tx, rt_rx) = mpsc::channel(4);
        let (exec_tx, _exec_rx) = mpsc::channel(4);
        let runtime = Runtime::new(RuntimeOptions::default(), None, rt_rx, exec_tx);

        rt_tx
            .send(RuntimeEvent::TaskCompleted {
                task: TaskKind::Markup,
                outcome: TaskOutcome::Fatal("disk full".into()),
            })
            .await
            .unwrap();

        let err = runtime.run().await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }
}
