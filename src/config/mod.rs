//! Layered, file-backed configuration.
//!
//! A [`ChainConfig`] holds named layers in precedence order. Each file-backed
//! layer ([`PathLayer`]) is a YAML document whose `import:` directives splice
//! in other files, recursively. Layers remember a [`PathSnapshot`] of every
//! file they read, so [`ChainConfig::merge`] only re-reads what changed.
//!
//! ## Merge Strategy
//! - Layers: top-level keys of later layers replace earlier ones wholesale
//! - Imports: top-level keys of the imported file replace those of the
//!   importing mapping wholesale
//! - Nulls: after merging, every null value at any depth is dropped, so a
//!   later layer can delete a key by setting it to `~`
//!
//! ## Environment Variables
//! - `CONFCHAIN_BASE` - Explicit base config file
//! - `CONFCHAIN_APP_DIR` - App config dir (default: `.`)
//! - `CONFCHAIN_USER_DIR` - User config dir (default: `~/.confchain`)

mod chain;
mod files;
mod imports;
mod layer;
mod loader;
mod merge;
mod overrides;
mod snapshot;
mod walk;
pub mod watcher;

pub use chain::{ChainConfig, Layer};
pub use files::{absolute_path, load_document, parse_document};
pub use imports::{IMPORT_KEY, load_resolved, resolve_imports};
pub use layer::PathLayer;
pub use loader::{CONFIG_FILE_NAME, ChainPaths, ConfigTier};
pub use merge::{merge_all, merge_shallow, prune_nulls};
pub use overrides::overrides_document;
pub use snapshot::PathSnapshot;
pub use walk::{WalkEntry, Walker, node_at, node_at_mut};

/// A configuration mapping. Keys keep their insertion order.
pub type Document = serde_json::Map<String, serde_json::Value>;
