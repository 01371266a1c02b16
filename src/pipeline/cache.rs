// src/pipeline/cache.rs

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

/// One remembered source file.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    fingerprint: String,
    value: T,
}

/// Per-transform memory of already-processed inputs.
///
/// Entries are keyed by source path and hold the content fingerprint the
/// file had when it was last processed successfully, plus whatever the
/// transform needs to reuse that result (`()` when nothing is reused, the
/// minified contribution for bundling transforms). A changed fingerprint
/// invalidates the entry implicitly.
#[derive(Debug, Clone)]
pub struct IncrementalCache<T = ()> {
    entries: HashMap<PathBuf, CacheEntry<T>>,
}

impl<T> Default for IncrementalCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> IncrementalCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value for `path`, if it was produced from the same
    /// fingerprint.
    pub fn get_fresh(&self, path: &Path, fingerprint: &str) -> Option<&T> {
        self.entries
            .get(path)
            .filter(|entry| entry.fingerprint == fingerprint)
            .map(|entry| &entry.value)
    }

    pub fn is_fresh(&self, path: &Path, fingerprint: &str) -> bool {
        self.get_fresh(path, fingerprint).is_some()
    }

    /// Record a successful processing of `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, fingerprint: String, value: T) {
        self.entries
            .insert(path.into(), CacheEntry { fingerprint, value });
    }

    /// Forget `path` (e.g. after it failed).
    pub fn invalidate(&mut self, path: &Path) {
        if self.entries.remove(path).is_some() {
            debug!("invalidated cache entry for {:?}", path);
        }
    }

    /// Drop entries for files that no longer exist. Returns how many were
    /// removed.
    pub fn retain_paths(&mut self, live: &HashSet<PathBuf>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| live.contains(path));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
