// src/pipeline/mod.rs

//! Building blocks shared by every transform.
//!
//! - [`stage`]: ordered per-file stage functions and the runner that
//!   composes them.
//! - [`cache`]: per-transform incremental cache keyed by content hashes.
//! - [`notify`]: the error/notification channel per-file failures go to.
//! - [`discover`]: glob-driven source discovery and output writing.

pub mod cache;
pub mod discover;
pub mod notify;
pub mod stage;

pub use cache::IncrementalCache;
pub use discover::{discover, write_output, SourceFile};
pub use notify::{MemoryNotifier, Notification, Notifier, TerminalNotifier};
pub use stage::{Asset, Stage, StageError, StagePipeline};
