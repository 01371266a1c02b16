// src/pipeline/discover.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::pipeline::stage::Asset;
use crate::watch::patterns::GlobMatcher;

/// A source file matched by a category's glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the project root, forward slashes.
    pub rel_root: String,
    /// Path relative to the glob's literal base; mirrored under the output
    /// directory.
    pub rel: String,
}

impl SourceFile {
    /// Read the file into an [`Asset`].
    pub fn read(&self) -> Result<Asset> {
        let contents =
            fs::read(&self.path).with_context(|| format!("reading source {:?}", self.path))?;
        Ok(Asset {
            source: self.path.clone(),
            rel_root: self.rel_root.clone(),
            rel: self.rel.clone(),
            contents,
        })
    }
}

/// Find every file under `root` matched by `matcher`, sorted by path.
///
/// Only the matcher's literal base directory is walked. A missing base
/// directory yields no files.
pub fn discover(root: &Path, matcher: &GlobMatcher) -> Result<Vec<SourceFile>> {
    let base = root.join(matcher.base());
    let mut found = Vec::new();

    if base.is_dir() {
        walk(&base, &mut |path| {
            let rel_root = to_slash(path.strip_prefix(root).unwrap_or(path));
            if matcher.matches(&rel_root) {
                let rel = to_slash(path.strip_prefix(&base).unwrap_or(path));
                found.push(SourceFile {
                    path: path.to_path_buf(),
                    rel_root,
                    rel,
                });
            }
        })?;
    }

    found.sort_by(|a, b| a.rel_root.cmp(&b.rel_root));
    Ok(found)
}

fn walk(dir: &Path, visit: &mut dyn FnMut(&Path)) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, visit)?;
        } else if path.is_file() {
            visit(&path);
        }
    }
    Ok(())
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Write an output file, creating parent directories.
///
/// Failures here are fatal for the run.
pub fn write_output(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }
    fs::write(path, contents).with_context(|| format!("writing output {:?}", path))?;
    Ok(())
}
