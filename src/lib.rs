// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod transforms;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, validate_config, BuildConfig, Category};
use crate::engine::{RunSummary, Runtime, RuntimeEvent, RuntimeOptions};
use crate::pipeline::notify::{Notifier, TerminalNotifier};
use crate::server::Reloader;
use crate::transforms::{clean_outputs, BuildContext, TransformRegistry, CLEANED_TASKS};
use crate::types::{TaskKind, TriggerReason};
use crate::watch::build_watch_bindings;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (plus the `--port` override)
/// - Clean, awaited before anything else
/// - transform registry / executor / runtime
/// - (unless `--once`) dev server and file watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<RunSummary> {
    let root = PathBuf::from(&args.root);
    let explicit = args.config.as_ref().map(PathBuf::from);
    let mut cfg = load_and_validate(&root, explicit.as_deref())?;

    if let Some(port) = args.port {
        cfg.server.port = port;
        validate_config(&cfg)?;
    }

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(RunSummary::default());
    }

    let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier);
    run_with(cfg, notifier, args.once).await
}

/// Clean, then build every transform once and exit. Used by `--once`.
pub async fn build_once(cfg: BuildConfig, notifier: Arc<dyn Notifier>) -> Result<RunSummary> {
    run_with(cfg, notifier, true).await
}

async fn run_with(cfg: BuildConfig, notifier: Arc<dyn Notifier>, once: bool) -> Result<RunSummary> {
    let cfg = Arc::new(cfg);
    let registry = TransformRegistry::new(BuildContext::new(Arc::clone(&cfg), notifier))?;

    // Clean must finish before the first transform starts.
    let clean_cfg = Arc::clone(&cfg);
    let cleaned = tokio::task::spawn_blocking(move || clean_outputs(&clean_cfg)).await??;
    registry.clear_caches(&CLEANED_TASKS);
    debug!(removed = cleaned.removed, "clean finished");

    // Runtime event channel. Capacity must hold every startup trigger.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let exec_tx = exec::spawn_executor(registry, rt_tx.clone());

    // Dev server and file watcher (disabled in --once mode).
    let mut reloader = None;
    let mut _watcher_handle = None;
    let mut server_handle = None;
    if !once {
        let live = Reloader::new();
        let (_, handle) = server::spawn_server(cfg.server.clone(), live.clone()).await?;
        server_handle = Some(handle);

        let bindings = build_watch_bindings(&cfg)?;
        _watcher_handle = Some(watch::spawn_watcher(cfg.root.clone(), bindings, rt_tx.clone())?);
        reloader = Some(live);
    }

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    info!(tasks = ?TaskKind::ALL, "initial build");
    for task in TaskKind::ALL {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Startup,
            })
            .await?;
    }

    let options = RuntimeOptions {
        exit_when_idle: once,
    };
    let runtime = Runtime::new(options, reloader, rt_rx, exec_tx);
    let summary = runtime.run().await?;

    if let Some(handle) = server_handle {
        handle.abort();
    }
    Ok(summary)
}

/// Simple dry-run output: resolved paths and watch bindings.
fn print_dry_run(cfg: &BuildConfig) -> Result<()> {
    println!("assetpipe dry-run");
    println!("  root = {}", cfg.root.display());
    println!();

    println!("paths:");
    for category in Category::ALL {
        let paths = cfg.paths(category);
        println!("  - {}", category.as_str());
        println!("      src: {}", paths.src);
        println!("      dist: {}", paths.dist.display());
        if !paths.exclude.is_empty() {
            println!("      exclude: {:?}", paths.exclude);
        }
        if let Some(ref bundle) = paths.bundle {
            println!("      bundle: {bundle}");
        }
    }
    println!("  - sprite");
    println!("      src: {}", cfg.sprite.src);
    println!("      sheet: {}", cfg.sprite.dist.join(&cfg.sprite.image_name).display());
    println!("      partial: {}", cfg.sprite.partial.display());
    println!();

    println!("watch:");
    for binding in build_watch_bindings(cfg)? {
        println!("  - {} <- {:?}", binding.task(), binding.patterns());
    }
    println!();

    println!(
        "server: http://127.0.0.1:{}{} (root {}, listing {})",
        cfg.server.port,
        cfg.server.open_path,
        cfg.server.root.display(),
        cfg.server.directory_listing
    );

    debug!("dry-run complete (no build)");
    Ok(())
}
