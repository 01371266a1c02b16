// src/watch/hash.rs

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash an in-memory buffer (file contents already read, or a stage output).
pub fn compute_bytes_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Combine several fingerprints into one, order-sensitively.
pub fn combine_hashes<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\0");
    }
    hasher.finalize().to_hex().to_string()
}

/// Compute a deterministic hash over the contents of the given files.
///
/// Order of `paths` does not matter; we sort them before hashing to keep the
/// hash stable. Paths are part of the hash, so renaming a file changes it.
pub fn compute_hash_for_paths<I, P>(paths: I) -> Result<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut hasher = Hasher::new();

    let mut paths_vec: Vec<PathBuf> = paths
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .collect();
    paths_vec.sort();

    for path in paths_vec {
        if path.is_file() {
            debug!("hashing file {:?}", path);
            let file_hash = compute_file_hash(&path)?;
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(file_hash.as_bytes());
        }
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, "computed aggregate hash");
    Ok(hash)
}
