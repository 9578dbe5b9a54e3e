//! CLI command definitions for confchain
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::format::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default debounce for `watch`, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Layered YAML configuration: merge, inspect and watch
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config layer as NAME=PATH, lowest precedence first (repeatable).
    ///
    /// When omitted, the base/app/user layers are discovered from
    /// CONFCHAIN_BASE, CONFCHAIN_APP_DIR and CONFCHAIN_USER_DIR.
    #[arg(short = 'L', long = "layer", value_name = "NAME=PATH", value_parser = parse_layer, global = true)]
    pub layers: Vec<(String, PathBuf)>,

    /// Override a value as KEY=VALUE (repeatable, dotted keys nest, values are YAML)
    #[arg(short, long = "set", value_name = "KEY=VALUE", global = true)]
    pub set: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged configuration (default if no subcommand given)
    Show(OutputArgs),

    /// List every file the configuration was loaded from
    Files(OutputArgs),

    /// Keep the configuration loaded and report changes as files are edited
    Watch(WatchArgs),
}

/// Arguments for commands that print a result
#[derive(Args, Debug, Default)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// Arguments for the watch subcommand
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Quiet period before a burst of file events triggers a reload
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,

    /// Output format for changed values
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Parse `NAME=PATH`.
fn parse_layer(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got '{arg}'")),
    }
}
