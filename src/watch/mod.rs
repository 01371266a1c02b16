// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling source / watch / exclude glob patterns.
//! - Turning the path configuration into one watch binding per transform.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Content hashing used by the incremental caches.
//!
//! It does **not** run transforms; it only turns filesystem changes into
//! task-level triggers for the runtime.

pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{combine_hashes, compute_bytes_hash, compute_file_hash, compute_hash_for_paths};
pub use patterns::{build_watch_bindings, normalize_rel, GlobMatcher, WatchBinding};
pub use watcher::{spawn_watcher, WatcherHandle};
