// src/pipeline/stage.rs

//! Ordered per-file stages and the runner that composes them.
//!
//! A transform is described as a list of named stage functions, each with
//! the contract `Asset -> Result<Asset>`. [`StagePipeline::run`] drives one
//! file through them in order and stops at the first failure; the file's
//! output is only produced once every stage has succeeded.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::trace;

use crate::pipeline::notify::{Notification, Notifier};
use crate::types::TaskKind;

/// One file travelling through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Absolute path of the source file.
    pub source: PathBuf,
    /// Source path relative to the project root (forward slashes).
    pub rel_root: String,
    /// Output path relative to the category's output directory.
    pub rel: String,
    pub contents: Vec<u8>,
}

impl Asset {
    /// Contents as UTF-8 text.
    pub fn text(&self) -> anyhow::Result<&str> {
        std::str::from_utf8(&self.contents)
            .map_err(|e| anyhow::anyhow!("{} is not valid UTF-8: {e}", self.rel_root))
    }

    /// Same asset with new contents.
    pub fn with_contents(self, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: contents.into(),
            ..self
        }
    }
}

/// A stage failed for one file.
#[derive(Debug, Error)]
#[error("{stage} failed for {file}: {message}")]
pub struct StageError {
    pub stage: &'static str,
    pub file: String,
    pub message: String,
}

impl StageError {
    pub fn into_notification(self, task: TaskKind) -> Notification {
        Notification::new(task, self.stage, Some(self.file), self.message)
    }
}

type StageFn = Box<dyn Fn(Asset) -> anyhow::Result<Asset> + Send + Sync>;

/// A named stage function.
pub struct Stage {
    name: &'static str,
    run: StageFn,
}

impl Stage {
    pub fn new<F>(name: &'static str, run: F) -> Self
    where
        F: Fn(Asset) -> anyhow::Result<Asset> + Send + Sync + 'static,
    {
        Self {
            name,
            run: Box::new(run),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).finish()
    }
}

/// Ordered list of stages belonging to one transform.
#[derive(Debug)]
pub struct StagePipeline {
    task: TaskKind,
    stages: Vec<Stage>,
}

impl StagePipeline {
    pub fn new(task: TaskKind) -> Self {
        Self {
            task,
            stages: Vec::new(),
        }
    }

    /// Append a stage.
    pub fn stage<F>(mut self, name: &'static str, run: F) -> Self
    where
        F: Fn(Asset) -> anyhow::Result<Asset> + Send + Sync + 'static,
    {
        self.stages.push(Stage::new(name, run));
        self
    }

    /// Drive one asset through every stage, stopping at the first failure.
    pub fn run(&self, mut asset: Asset) -> Result<Asset, StageError> {
        for stage in &self.stages {
            let file = asset.rel_root.clone();
            trace!(task = %self.task, stage = stage.name, file = %file, "running stage");
            asset = (stage.run)(asset).map_err(|err| StageError {
                stage: stage.name,
                file,
                message: format!("{err:#}"),
            })?;
        }
        Ok(asset)
    }

    /// Like [`run`](Self::run), but a failure is reported through the
    /// notifier and the file is dropped.
    pub fn process(&self, asset: Asset, notifier: &dyn Notifier) -> Option<Asset> {
        match self.run(asset) {
            Ok(asset) => Some(asset),
            Err(err) => {
                notifier.notify(err.into_notification(self.task));
                None
            }
        }
    }
}
