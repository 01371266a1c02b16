// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::model::{BuildConfig, RawConfigFile};
use crate::config::validate::validate_config;
use crate::errors::{AssetpipeError, Result};

/// Config file looked up in the project root when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Assetpipe.toml";

/// Load a configuration file from a given path and return the raw model.
///
/// This only performs TOML deserialization; it does **not** resolve paths or
/// perform semantic validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    debug!("parsed config from {:?}", path);
    Ok(config)
}

/// Resolve the build configuration for a project root.
///
/// - With `explicit = Some(path)` the file must exist.
/// - Otherwise `<root>/Assetpipe.toml` is used if present, and the built-in
///   layout if not.
///
/// The result is resolved against `root` and validated.
pub fn load_and_validate(root: impl AsRef<Path>, explicit: Option<&Path>) -> Result<BuildConfig> {
    let root = root.as_ref();

    let raw = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(AssetpipeError::ConfigNotFound(path.to_path_buf()));
            }
            load_from_path(path)?
        }
        None => {
            let candidate = root.join(DEFAULT_CONFIG_FILE);
            if candidate.is_file() {
                load_from_path(&candidate)?
            } else {
                info!("no {DEFAULT_CONFIG_FILE} found; using the built-in layout");
                RawConfigFile::default()
            }
        }
    };

    let config = BuildConfig::resolve(&raw, root)?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_default_file_uses_builtin_layout() {
        let dir = tempdir().unwrap();
        let cfg = load_and_validate(dir.path(), None).unwrap();
        assert_eq!(cfg.server.port, 4000);
        assert!(cfg.markup.dist.ends_with("dist/html"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_and_validate(dir.path(), Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, AssetpipeError::ConfigNotFound(_)));
    }

    #[test]
    fn default_file_in_root_is_picked_up() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[server]\nport = 8123\n\n[paths.scripts]\nbundle = \"app.js\"\n",
        )
        .unwrap();
        let cfg = load_and_validate(dir.path(), None).unwrap();
        assert_eq!(cfg.server.port, 8123);
        assert_eq!(cfg.scripts_bundle(), "app.js");
    }

    #[test]
    fn malformed_toml_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[server\nport = 1").unwrap();
        let err = load_and_validate(dir.path(), None).unwrap_err();
        assert!(matches!(err, AssetpipeError::TomlError(_)));
    }
}
