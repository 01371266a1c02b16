// src/config/validate.rs

use std::path::Path;

use crate::config::model::{BuildConfig, Category};
use crate::errors::{AssetpipeError, Result};

/// Largest accepted sprite padding, in pixels.
const MAX_SPRITE_PADDING: u32 = 256;

/// Run basic semantic validation against a resolved configuration.
///
/// This checks:
/// - the server port is non-zero
/// - no output directory is the project root, and none lies inside a source
///   tree (that would make the watcher rebuild its own output)
/// - bundle and sprite file names are bare file names
/// - the sprite padding is within bounds
pub fn validate_config(cfg: &BuildConfig) -> Result<()> {
    validate_server(cfg)?;
    validate_output_dirs(cfg)?;
    validate_file_names(cfg)?;
    validate_sprite(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> AssetpipeError {
    AssetpipeError::ConfigError(msg.into())
}

fn validate_server(cfg: &BuildConfig) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(config_error("[server].port must be non-zero"));
    }
    Ok(())
}

fn validate_output_dirs(cfg: &BuildConfig) -> Result<()> {
    let mut outputs: Vec<(String, &Path)> = Category::ALL
        .iter()
        .map(|c| (format!("paths.{}", c.as_str()), cfg.paths(*c).dist.as_path()))
        .collect();
    outputs.push(("sprite".to_string(), cfg.sprite.dist.as_path()));

    let source_bases: Vec<(String, std::path::PathBuf)> = Category::ALL
        .iter()
        .map(|c| (format!("paths.{}", c.as_str()), cfg.paths(*c).base_dir(&cfg.root)))
        .chain(std::iter::once((
            "sprite".to_string(),
            cfg.sprite.base_dir(&cfg.root),
        )))
        .collect();

    for (name, dist) in &outputs {
        if *dist == cfg.root.as_path() {
            return Err(config_error(format!(
                "[{name}].dist must not be the project root"
            )));
        }
        for (src_name, base) in &source_bases {
            // A base equal to the root means the glob starts with a wildcard;
            // only nested bases are checked.
            if *base != cfg.root && dist.starts_with(base) {
                return Err(config_error(format!(
                    "[{name}].dist {dist:?} lies inside the sources of [{src_name}]"
                )));
            }
        }
    }
    Ok(())
}

fn validate_file_names(cfg: &BuildConfig) -> Result<()> {
    let names = [
        ("paths.styles.bundle", cfg.styles_bundle()),
        ("paths.scripts.bundle", cfg.scripts_bundle()),
        ("sprite.image", cfg.sprite.image_name.as_str()),
    ];
    for (key, name) in names {
        if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
            return Err(config_error(format!(
                "[{key}] must be a bare file name (got {name:?})"
            )));
        }
    }
    Ok(())
}

fn validate_sprite(cfg: &BuildConfig) -> Result<()> {
    if cfg.sprite.padding > MAX_SPRITE_PADDING {
        return Err(config_error(format!(
            "[sprite].padding must be <= {MAX_SPRITE_PADDING} (got {})",
            cfg.sprite.padding
        )));
    }
    if !cfg.sprite.image_name.to_lowercase().ends_with(".png") {
        return Err(config_error("[sprite].image must be a .png file name"));
    }
    Ok(())
}
