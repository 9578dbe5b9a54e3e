//! confchain
//!
//! Merges layered YAML configuration files, resolving their imports, and
//! optionally keeps watching them for changes.

use anyhow::{Context, Result};
use clap::Parser;
use confchain::cli::{Cli, Command, OutputArgs, WatchArgs};
use confchain::config::{
    ChainConfig, ChainPaths, Document, PathLayer, PathSnapshot, overrides_document,
    watcher::{WatchPaths, WatcherConfig, start_config_watcher},
};
use confchain::dispatch::Dispatcher;
use confchain::format::{OutputFormat, format_document, format_snapshots};
use confchain::logging::{LogTarget, init_logging};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the static layer built from `--set` arguments.
const OVERRIDE_LAYER: &str = "cli";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;

    let chain = build_chain(&cli)?;
    debug!(layers = ?chain.names().collect::<Vec<_>>(), "Configuration chain");

    match cli.command {
        None => run_show(chain, OutputArgs::default()),
        Some(Command::Show(args)) => run_show(chain, args),
        Some(Command::Files(args)) => run_files(chain, args),
        Some(Command::Watch(args)) => run_watch(chain, args).await,
    }
}

/// Build the chain from `--layer` arguments, or discover the default tiers.
fn build_chain(cli: &Cli) -> Result<ChainConfig> {
    let mut chain = if cli.layers.is_empty() {
        ChainPaths::discover().build_chain()
    } else {
        let mut chain = ChainConfig::new();
        for (name, path) in &cli.layers {
            chain.insert(name.clone(), PathLayer::new(path));
        }
        chain
    };

    if !cli.set.is_empty() {
        let overrides = overrides_document(cli.set.as_slice())?;
        chain.insert(OVERRIDE_LAYER, overrides);
    }
    Ok(chain)
}

fn run_show(mut chain: ChainConfig, args: OutputArgs) -> Result<()> {
    let merged = chain.merge()?;
    print!("{}", format_document(&merged, args.format)?);
    Ok(())
}

fn run_files(mut chain: ChainConfig, args: OutputArgs) -> Result<()> {
    chain.refresh()?;
    let snapshots: Vec<&PathSnapshot> = chain
        .layers()
        .filter_map(|(_, layer)| layer.as_file())
        .flat_map(PathLayer::snapshots)
        .collect();
    print!("{}", format_snapshots(&snapshots, args.format)?);
    Ok(())
}

fn watch_paths(chain: &ChainConfig) -> WatchPaths {
    WatchPaths::new(chain.dependencies())
}

/// Print the merged configuration, then every key that changes, until
/// interrupted.
///
/// A reload that fails (bad YAML, import cycle) is logged and the last good
/// configuration stays in effect.
async fn run_watch(mut chain: ChainConfig, args: WatchArgs) -> Result<()> {
    let format = args.format;
    let mut dispatcher = Dispatcher::new().with_fallback(
        move |key: &str, value: &Value| -> Result<()> {
            print!("{}", format_entry(key, value, format)?);
            Ok(())
        },
    );

    let merged = chain.merge()?;
    dispatcher.dispatch(merged)?;

    let watcher_config = WatcherConfig {
        debounce_duration: Duration::from_millis(args.debounce_ms),
    };
    let mut watched = watch_paths(&chain);
    if watched.is_empty() {
        warn!("No configuration files to watch");
    }
    let mut handle = start_config_watcher(watched.clone(), watcher_config.clone())
        .context("Failed to start config file watcher")?;
    info!(files = watched.files().len(), "Watching configuration");

    loop {
        let event = tokio::select! {
            event = handle.wait_for_change() => event,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        };

        let Some(event) = event else {
            info!("Config file watcher stopped");
            break;
        };
        if !event.requires_reload() {
            warn!(?event, "Config watcher error");
            continue;
        }
        for path in event.affected_paths() {
            info!(path = %path.display(), "Config change detected");
        }

        match chain.merge() {
            Ok(merged) => {
                if let Err(e) = dispatcher.dispatch(merged) {
                    warn!("{:#}", e);
                }
            }
            Err(e) => {
                warn!("Failed to reload config, keeping current: {}", e);
            }
        }

        // Imports may have been added or removed.
        let current = watch_paths(&chain);
        if current.files() != watched.files() {
            debug!(files = current.files().len(), "Dependency set changed, restarting watcher");
            handle = start_config_watcher(current.clone(), watcher_config.clone())?;
            watched = current;
        }
    }

    Ok(())
}

/// Render one changed top-level key.
fn format_entry(key: &str, value: &Value, format: OutputFormat) -> Result<String> {
    let mut single = Document::new();
    single.insert(key.to_string(), value.clone());
    format_document(&single, format)
}
