//! A single file-backed configuration layer.

use super::Document;
use super::files::absolute_path;
use super::imports::load_resolved;
use super::snapshot::PathSnapshot;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A document loaded from a YAML file, with its imports resolved.
///
/// The layer remembers a snapshot of every file it read. [`PathLayer::refresh`]
/// re-stats those files and reloads only when one of them changed, so it is
/// cheap enough to call on every reconfiguration check.
///
/// Not synchronized: callers sharing a layer across threads must serialize
/// access themselves.
#[derive(Debug, Clone)]
pub struct PathLayer {
    path: PathBuf,
    document: Document,
    /// Root file first, then every imported file in the order it was opened.
    imports: Vec<PathSnapshot>,
}

impl PathLayer {
    /// Create an unloaded layer. The first [`refresh`](Self::refresh) loads it.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: absolute_path(path.as_ref()),
            document: Document::new(),
            imports: Vec::new(),
        }
    }

    /// Create a layer and load it immediately.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut layer = Self::new(path);
        layer.refresh()?;
        Ok(layer)
    }

    /// The root file of this layer.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The document as of the last successful load.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Snapshots taken during the last successful load.
    pub fn snapshots(&self) -> &[PathSnapshot] {
        &self.imports
    }

    /// Every file this layer depends on, root first.
    pub fn dependencies(&self) -> impl Iterator<Item = &Path> {
        self.imports.iter().map(PathSnapshot::path)
    }

    pub fn is_loaded(&self) -> bool {
        !self.imports.is_empty()
    }

    /// The first dependency that changed on disk since the last load.
    ///
    /// Stops at the first stale file, so at most one `stat` per dependency.
    pub fn stale_path(&self) -> Option<&Path> {
        let (stale, current) = self
            .imports
            .iter()
            .find_map(|snapshot| snapshot.recapture_if_changed().map(|now| (snapshot, now)))?;
        info!(
            layer = %self.path.display(),
            path = %stale.path().display(),
            "{} config",
            stale.change_kind(&current)
        );
        Some(stale.path())
    }

    /// Reload the layer if it was never loaded or a dependency changed.
    ///
    /// Returns `Ok(true)` when the document was reloaded. On error the
    /// previous document and snapshots are kept, so the next call retries.
    pub fn refresh(&mut self) -> Result<bool> {
        if self.is_loaded() && self.stale_path().is_none() {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }

    /// Unconditionally re-read the root file and its imports.
    pub fn reload(&mut self) -> Result<()> {
        let (document, imports) = load_resolved(&self.path)?;
        debug!(
            layer = %self.path.display(),
            keys = document.len(),
            files = imports.len(),
            "Loaded config layer"
        );
        self.document = document;
        self.imports = imports;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_new_layer_is_unloaded() {
        let layer = PathLayer::new("app.yaml");
        assert!(!layer.is_loaded());
        assert!(layer.document().is_empty());
        assert!(layer.path().is_absolute());
    }

    #[test]
    fn test_first_refresh_loads() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.yaml");
        std::fs::write(&path, "a: 1\n").unwrap();

        let mut layer = PathLayer::new(&path);
        assert!(layer.refresh().unwrap());
        assert_eq!(Value::Object(layer.document().clone()), json!({"a": 1}));
        assert_eq!(layer.dependencies().collect::<Vec<_>>(), vec![path.as_path()]);
    }

    #[test]
    fn test_missing_root_loads_empty_and_tracks_creation() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.yaml");

        let mut layer = PathLayer::open(&path).unwrap();
        assert!(layer.is_loaded());
        assert!(layer.document().is_empty());
        assert!(!layer.refresh().unwrap());

        std::fs::write(&path, "a: 1\n").unwrap();
        assert_eq!(layer.stale_path(), Some(path.as_path()));
        assert!(layer.refresh().unwrap());
        assert_eq!(layer.document()["a"], json!(1));
    }

    #[test]
    fn test_refresh_on_mtime_only_change() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.yaml");
        std::fs::write(&path, "a: 1\n").unwrap();
        let mut layer = PathLayer::open(&path).unwrap();
        let loaded_at = layer.snapshots()[0].modified();

        std::fs::write(&path, "a: 2\n").unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(loaded_at + Duration::from_secs(60)).unwrap();
        drop(file);

        assert!(layer.refresh().unwrap());
        assert_eq!(layer.document()["a"], json!(2));
        assert!(!layer.refresh().unwrap());
    }

    #[test]
    fn test_failed_reload_keeps_previous_state() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.yaml");
        std::fs::write(&path, "a: 1\n").unwrap();
        let mut layer = PathLayer::open(&path).unwrap();

        std::fs::write(&path, "a: [unclosed\n").unwrap();
        assert!(layer.refresh().is_err());
        assert_eq!(layer.document()["a"], json!(1));

        // Still stale, so fixing the file is picked up.
        std::fs::write(&path, "a: 22\n").unwrap();
        assert!(layer.refresh().unwrap());
        assert_eq!(layer.document()["a"], json!(22));
    }
}
