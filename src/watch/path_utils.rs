// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher and source discovery.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    // Notably macOS reports /private/var/... for paths under /var/...
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(rel.to_string_lossy().replace('\\', "/"));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_and_uses_forward_slashes() {
        let rel = relative_str(Path::new("/p"), Path::new("/p/src/html/a.html"));
        assert_eq!(rel.as_deref(), Some("src/html/a.html"));
    }

    #[test]
    fn unrelated_paths_are_rejected() {
        assert_eq!(relative_str(Path::new("/p"), Path::new("/q/a.html")), None);
    }
}
