// src/transforms/mod.rs

//! The asset transforms and the registry that owns them.
//!
//! - [`markup`]: include resolution, one output per page.
//! - [`styles`]: compile → minify → prefix → one combined stylesheet.
//! - [`scripts`]: lint (advisory) → minify → one combined script.
//! - [`passthrough`]: byte-for-byte copies (library tree, plain images).
//! - [`sprite`]: packs the sprite subtree into a sheet + stylesheet partial.
//! - [`clean`]: empties output directories before a full build.
//!
//! Each transform owns its incremental cache, so the registry hands out
//! exclusive access per task and transforms never share mutable state.

pub mod clean;
pub mod markup;
pub mod passthrough;
pub mod scripts;
pub mod sprite;
pub mod styles;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::pipeline::notify::{Notification, Notifier};
use crate::types::TaskKind;

pub use clean::{clean_outputs, CleanReport, CLEANED_TASKS};
pub use markup::MarkupTransform;
pub use passthrough::PassthroughTransform;
pub use scripts::ScriptsTransform;
pub use sprite::SpriteTransform;
pub use styles::StylesTransform;

/// Shared, read-only inputs of every transform run.
#[derive(Clone)]
pub struct BuildContext {
    pub config: Arc<BuildConfig>,
    pub notifier: Arc<dyn Notifier>,
}

impl BuildContext {
    pub fn new(config: Arc<BuildConfig>, notifier: Arc<dyn Notifier>) -> Self {
        Self { config, notifier }
    }

    /// Report a per-file failure that happened outside a stage pipeline
    /// (reading a source, decoding an image).
    pub(crate) fn notify(&self, task: TaskKind, stage: &str, file: &str, err: impl std::fmt::Display) {
        self.notifier.notify(Notification::new(
            task,
            stage,
            Some(file.to_string()),
            err.to_string(),
        ));
    }
}

/// Outcome of one transform invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// Files that went through the pipeline this run.
    pub processed: usize,
    /// Files whose cached result was reused.
    pub skipped: usize,
    /// Files dropped because a stage failed.
    pub failed: usize,
    /// Output files written this run.
    pub written: Vec<PathBuf>,
}

/// A named unit of work turning one category's sources into outputs.
///
/// `run` returns `Err` only for fatal conditions (writing outputs); per-file
/// failures are notified and counted in the report.
pub trait Transform: Send {
    fn kind(&self) -> TaskKind;

    fn run(&mut self, ctx: &BuildContext) -> Result<TransformReport>;

    /// Forget everything processed so far.
    fn clear_cache(&mut self);
}

type SharedTransform = Arc<Mutex<Box<dyn Transform>>>;

/// Owns one instance of every transform.
#[derive(Clone)]
pub struct TransformRegistry {
    ctx: BuildContext,
    transforms: HashMap<TaskKind, SharedTransform>,
}

impl TransformRegistry {
    /// Build all six transforms for the given configuration.
    pub fn new(ctx: BuildContext) -> Result<Self> {
        let cfg = Arc::clone(&ctx.config);
        let mut transforms: HashMap<TaskKind, SharedTransform> = HashMap::new();

        let all: Vec<Box<dyn Transform>> = vec![
            Box::new(MarkupTransform::new()),
            Box::new(StylesTransform::new(&cfg)?),
            Box::new(ScriptsTransform::new()),
            Box::new(PassthroughTransform::library()),
            Box::new(PassthroughTransform::images()),
            Box::new(SpriteTransform::new()),
        ];
        for transform in all {
            transforms.insert(transform.kind(), Arc::new(Mutex::new(transform)));
        }

        Ok(Self { ctx, transforms })
    }

    /// Run one transform to completion on the calling thread.
    pub fn run(&self, task: TaskKind) -> Result<TransformReport> {
        let transform = self
            .transforms
            .get(&task)
            .ok_or_else(|| anyhow!("no transform registered for {task}"))?;
        let mut guard = transform
            .lock()
            .map_err(|_| anyhow!("transform {task} panicked in an earlier run"))?;

        debug!(task = %task, "running transform");
        let report = guard.run(&self.ctx)?;
        info!(
            task = %task,
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            "transform finished"
        );
        Ok(report)
    }

    /// Clear the caches of the given transforms (after Clean removed their
    /// outputs).
    pub fn clear_caches(&self, tasks: &[TaskKind]) {
        for task in tasks {
            if let Some(transform) = self.transforms.get(task) {
                if let Ok(mut guard) = transform.lock() {
                    guard.clear_cache();
                    debug!(task = %task, "cache cleared");
                }
            }
        }
    }
}
