// src/logging.rs

//! Subscriber setup.
//!
//! The filter is an [`EnvFilter`] built from, in order of priority:
//! 1. `--log-level` (applies one level to everything)
//! 2. `ASSETPIPE_LOG`, any `EnvFilter` directive string such as
//!    `info,assetpipe::transforms=debug`
//! 3. `info`
//!
//! Output goes to stderr, next to the error popups of the notifier.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "ASSETPIPE_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Install the global subscriber. Call once, from `main`.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    let directives = match (cli_level, env.map(str::trim)) {
        (Some(level), _) => level_directive(level),
        (None, Some(env)) if !env.is_empty() => env,
        (None, _) => DEFAULT_DIRECTIVES,
    };
    EnvFilter::try_new(directives).with_context(|| format!("invalid log filter {directives:?}"))
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives(cli: Option<LogLevel>, env: Option<&str>) -> String {
        build_filter(cli, env).unwrap().to_string()
    }

    #[test]
    fn cli_level_wins_over_env() {
        assert_eq!(directives(Some(LogLevel::Warn), Some("assetpipe=trace")), "warn");
    }

    #[test]
    fn env_accepts_per_module_directives() {
        let filter = directives(None, Some("info,assetpipe::transforms=debug"));
        assert!(filter.contains("assetpipe::transforms=debug"), "{filter}");
        assert!(filter.contains("info"), "{filter}");
    }

    #[test]
    fn falls_back_to_info() {
        assert_eq!(directives(None, None), "info");
        assert_eq!(directives(None, Some("  ")), "info");
    }

    #[test]
    fn malformed_env_is_an_error() {
        assert!(build_filter(None, Some("assetpipe=loud")).is_err());
    }
}
