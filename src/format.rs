//! Output formatting for merged documents and dependency listings.

use crate::config::{Document, PathSnapshot};
use anyhow::Result;
use clap::ValueEnum;
use std::fmt::Write;
use std::time::UNIX_EPOCH;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// YAML (default)
    #[default]
    Yaml,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one entry per line
    Text,
}

/// Render a merged document.
///
/// `Text` prints one `key: value` line per top-level key with the value in
/// compact JSON.
pub fn format_document(document: &Document, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(document)?,
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(document)?;
            out.push('\n');
            out
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for (key, value) in document {
                writeln!(out, "{key}: {value}")?;
            }
            out
        }
    })
}

/// Render the files a chain depends on.
pub fn format_snapshots(snapshots: &[&PathSnapshot], format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(snapshots)?,
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(snapshots)?;
            out.push('\n');
            out
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for snapshot in snapshots {
                if snapshot.existed() {
                    let mtime = snapshot
                        .modified()
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_secs())
                        .unwrap_or_default();
                    writeln!(
                        out,
                        "{}\t{} bytes\tmtime {}",
                        snapshot.path().display(),
                        snapshot.size(),
                        mtime
                    )?;
                } else {
                    writeln!(out, "{}\tmissing", snapshot.path().display())?;
                }
            }
            out
        }
    })
}
