//! Structured error types for configuration loading.
//!
//! Missing files are not errors: they load as empty documents. Everything in
//! here means the configuration cannot be trusted and the current
//! refresh or merge must stop.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, importing or watching configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file exists but is not valid YAML.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A file parsed, but its top level is not a mapping.
    #[error("config {} must contain a mapping at the top level", path.display())]
    NotAMapping { path: PathBuf },

    /// A value is `.inf`, `-.inf` or `.nan`, which has no JSON form.
    #[error("config {} sets '{key}' to a non-finite number", path.display())]
    NonFiniteNumber { path: PathBuf, key: String },

    /// An `import:` directive has the wrong shape.
    #[error("invalid import in {}: {message}", path.display())]
    InvalidImport { path: PathBuf, message: String },

    /// A file imports itself, directly or through other files.
    #[error("import cycle: {}", format_chain(chain))]
    ImportCycle { chain: Vec<PathBuf> },

    /// A wildcard import pattern could not be compiled.
    #[error("invalid import pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A `--set KEY=VALUE` override could not be applied.
    #[error("invalid override '{arg}': {message}")]
    Override { arg: String, message: String },

    /// The file watcher could not be started.
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl ConfigError {
    pub fn invalid_import(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidImport {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_override(arg: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Override {
            arg: arg.into(),
            message: message.into(),
        }
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
