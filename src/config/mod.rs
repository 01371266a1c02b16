// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the resolved, immutable
//!   [`BuildConfig`] (`model.rs`).
//! - Load an optional config file from disk (`loader.rs`).
//! - Validate basic invariants like output directories not overlapping
//!   the sources (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, DEFAULT_CONFIG_FILE};
pub use model::{
    BuildConfig, Category, CategoryPaths, CategorySection, PathsSection, RawConfigFile,
    ServerSection, ServerSettings, SpriteSection, SpriteSettings,
};
pub use validate::validate_config;
