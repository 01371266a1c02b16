#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetpipe::config::BuildConfig;
use assetpipe::pipeline::{MemoryNotifier, Notifier};
use assetpipe::transforms::{BuildContext, TransformRegistry};
use image::{Rgba, RgbaImage};
use tempfile::TempDir;

/// A throwaway project directory laid out like a real site.
pub struct ProjectFixture {
    dir: TempDir,
    pub notifier: Arc<MemoryNotifier>,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("creating temp project"),
            notifier: Arc::new(MemoryNotifier::new()),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write a text file, creating parent directories.
    pub fn file(self, rel: &str, contents: &str) -> Self {
        self.write(rel, contents);
        self
    }

    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().expect("fixture path has a parent"))
            .expect("creating fixture dirs");
        fs::write(path, contents).expect("writing fixture file");
    }

    /// Write a solid-colour PNG.
    pub fn png(self, rel: &str, width: u32, height: u32, color: [u8; 4]) -> Self {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().expect("fixture path has a parent"))
            .expect("creating fixture dirs");
        RgbaImage::from_pixel(width, height, Rgba(color))
            .save(&path)
            .expect("writing fixture png");
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel))
            .unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Built-in layout rooted at the fixture.
    pub fn config(&self) -> BuildConfig {
        BuildConfig::with_defaults(self.root()).expect("default config resolves")
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    /// Registry over the default config, reporting into the fixture's
    /// memory notifier.
    pub fn registry(&self) -> TransformRegistry {
        TransformRegistry::new(BuildContext::new(Arc::new(self.config()), self.notifier()))
            .expect("building transform registry")
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}
