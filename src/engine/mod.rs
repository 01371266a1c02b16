// src/engine/mod.rs

//! Orchestration engine for assetpipe.
//!
//! This module ties together:
//! - the trigger queue (what happens when triggers arrive while a transform runs)
//! - the main runtime event loop that reacts to:
//!   - startup and file-watch triggers
//!   - transform completion events
//!   - shutdown signals

pub mod queue;
pub mod runtime;

pub use queue::TriggerQueue;
pub use runtime::{RunSummary, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome};
