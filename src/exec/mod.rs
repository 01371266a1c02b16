// src/exec/mod.rs

//! Transform execution layer.
//!
//! [`executor`] owns the loop which consumes `ScheduledTask`s, runs the
//! matching transform on the blocking thread pool, and reports back to the
//! orchestration runtime via `RuntimeEvent::TaskCompleted`.

pub mod executor;

pub use executor::{spawn_executor, ScheduledTask};
