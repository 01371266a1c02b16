// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetpipe`.
///
/// With no flags this performs the default build-and-watch: clean the output
/// directories, run every transform, then keep watching and serving `dist/`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build front-end assets, watch sources and serve the output with live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Project root. All source globs and output directories resolve
    /// against it.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: String,

    /// Path to the config file (TOML).
    ///
    /// Default: `Assetpipe.toml` inside the project root; a missing default
    /// file means "use the built-in layout".
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Override the dev server port from the config.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Build everything once, without watcher or dev server, then exit.
    ///
    /// Exits with status 1 if any source file failed to build.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the resolved paths and watch bindings, but don't build anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
