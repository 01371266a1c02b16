// src/transforms/clean.rs

//! Clean: empties the generated output directories before a full build.
//!
//! Only the scripts, styles, markup and images outputs are emptied; the
//! library and font outputs survive. The directories themselves are kept.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::types::TaskKind;

/// Transforms whose outputs Clean removes; their caches must be cleared.
pub const CLEANED_TASKS: [TaskKind; 5] = [
    TaskKind::Markup,
    TaskKind::Styles,
    TaskKind::Scripts,
    TaskKind::Images,
    TaskKind::Sprite,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Entries (files or directories) removed.
    pub removed: usize,
    pub directories: Vec<PathBuf>,
}

pub fn clean_outputs(cfg: &BuildConfig) -> Result<CleanReport> {
    let mut report = CleanReport::default();
    for dir in cfg.clean_targets() {
        if !dir.is_dir() {
            debug!(dir = ?dir, "clean target absent");
            continue;
        }
        report.removed += empty_dir(dir)?;
        report.directories.push(dir.to_path_buf());
    }
    info!(removed = report.removed, "outputs cleaned");
    Ok(report)
}

fn empty_dir(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("reading {:?}", dir))? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path).with_context(|| format!("removing {:?}", path))?;
        } else {
            fs::remove_file(&path).with_context(|| format!("removing {:?}", path))?;
        }
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empties_generated_outputs_and_keeps_library_and_fonts() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "dist/js/ui.js",
            "dist/css/style.min.css",
            "dist/html/index.html",
            "dist/img/sprite/sprite.png",
            "dist/lib/jquery.js",
            "dist/font/a.woff",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }

        let cfg = BuildConfig::with_defaults(root).unwrap();
        let report = clean_outputs(&cfg).unwrap();

        assert_eq!(report.removed, 4);
        assert!(!root.join("dist/js/ui.js").exists());
        assert!(!root.join("dist/img/sprite").exists());
        assert!(root.join("dist/js").is_dir());
        assert!(root.join("dist/lib/jquery.js").exists());
        assert!(root.join("dist/font/a.woff").exists());
    }

    #[test]
    fn missing_outputs_are_fine() {
        let dir = tempdir().unwrap();
        let cfg = BuildConfig::with_defaults(dir.path()).unwrap();
        assert_eq!(clean_outputs(&cfg).unwrap(), CleanReport::default());
    }
}
