// src/transforms/passthrough.rs

//! Byte-for-byte copies: the third-party library tree and the non-sprite
//! image tree. The relative layout under the source base is mirrored under
//! the output directory.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;

use crate::config::{BuildConfig, Category, CategoryPaths};
use crate::pipeline::cache::IncrementalCache;
use crate::pipeline::discover::{discover, write_output};
use crate::transforms::{BuildContext, Transform, TransformReport};
use crate::types::TaskKind;
use crate::watch::hash::compute_bytes_hash;

pub struct PassthroughTransform {
    kind: TaskKind,
    category: Category,
    cache: IncrementalCache,
}

impl PassthroughTransform {
    pub fn library() -> Self {
        Self::new(TaskKind::Library, Category::Library)
    }

    pub fn images() -> Self {
        Self::new(TaskKind::Images, Category::Images)
    }

    fn new(kind: TaskKind, category: Category) -> Self {
        Self {
            kind,
            category,
            cache: IncrementalCache::new(),
        }
    }

    fn paths<'a>(&self, cfg: &'a BuildConfig) -> &'a CategoryPaths {
        cfg.paths(self.category)
    }
}

impl Transform for PassthroughTransform {
    fn kind(&self) -> TaskKind {
        self.kind
    }

    fn run(&mut self, ctx: &BuildContext) -> Result<TransformReport> {
        let cfg = &ctx.config;
        let paths = self.paths(cfg);
        let files = discover(&cfg.root, &paths.sources)?;
        let mut report = TransformReport::default();

        let live: HashSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        self.cache.retain_paths(&live);

        for file in files {
            let asset = match file.read() {
                Ok(asset) => asset,
                Err(err) => {
                    ctx.notify(self.kind, "read", &file.rel_root, format!("{err:#}"));
                    self.cache.invalidate(&file.path);
                    report.failed += 1;
                    continue;
                }
            };

            let fingerprint = compute_bytes_hash(&asset.contents);
            let dest = paths.dist.join(&asset.rel);
            if self.cache.is_fresh(&file.path, &fingerprint) && dest.is_file() {
                report.skipped += 1;
                continue;
            }

            write_output(&dest, &asset.contents)?;
            self.cache.insert(file.path.clone(), fingerprint, ());
            report.processed += 1;
            report.written.push(dest);
        }

        Ok(report)
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
