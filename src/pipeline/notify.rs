// src/pipeline/notify.rs

//! Error/notification channel.
//!
//! Every per-file stage failure ends up here as a [`Notification`]; the run
//! that produced it continues with the remaining files.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::error;

use crate::types::TaskKind;

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub task: TaskKind,
    /// Identifier of the failing stage (e.g. `"include"`, `"compile"`).
    pub stage: String,
    /// Source file, relative to the project root, if the failure concerns one.
    pub file: Option<String>,
    pub message: String,
}

impl Notification {
    pub fn new(
        task: TaskKind,
        stage: impl Into<String>,
        file: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task,
            stage: stage.into(),
            file,
            message: message.into(),
        }
    }

    pub fn title(&self) -> String {
        format!("assetpipe error in {}", self.stage)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "[{}] {}: {}", self.task, file, self.message),
            None => write!(f, "[{}] {}", self.task, self.message),
        }
    }
}

/// Sink for notifications. Shared between transforms running on different
/// worker threads.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Logs the failure and draws a popup-style box on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        error!(
            task = %notification.task,
            stage = %notification.stage,
            file = notification.file.as_deref().unwrap_or("-"),
            "{}",
            notification.message
        );
        eprintln!("{}", render_popup(&notification));
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    inner: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

fn render_popup(notification: &Notification) -> String {
    let title = notification.title();
    let body = notification.to_string();
    let lines: Vec<&str> = std::iter::once(title.as_str())
        .chain(body.lines())
        .collect();
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!("+{}+\n", "-".repeat(width + 2)));
    for (i, line) in lines.iter().enumerate() {
        let pad = width - line.chars().count();
        out.push_str(&format!("| {}{} |\n", line, " ".repeat(pad)));
        if i == 0 {
            out.push_str(&format!("+{}+\n", "-".repeat(width + 2)));
        }
    }
    out.push_str(&format!("+{}+", "-".repeat(width + 2)));
    out
}
