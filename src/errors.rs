// src/errors.rs

//! Crate-wide error enum and result alias.
//!
//! Fatal paths (config I/O, Clean, writing outputs) mostly use
//! `anyhow::Context`; this enum covers the failures callers may want to
//! match on.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetpipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    GlobError {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Config file not found: {0:?}")]
    ConfigNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AssetpipeError>;
