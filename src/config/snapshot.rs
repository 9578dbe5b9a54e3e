//! Point-in-time file status used for cheap staleness checks.
//!
//! Only `stat` is ever consulted. File contents are never read or hashed
//! to decide whether a layer must be reloaded.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A frozen record of a file's existence, size and modification time.
///
/// Missing files are a normal state: they are recorded with `existed: false`,
/// a zero size and the Unix epoch as modification time.
#[derive(Debug, Clone, Serialize)]
pub struct PathSnapshot {
    path: PathBuf,
    existed: bool,
    modified: SystemTime,
    size: u64,
}

impl PathSnapshot {
    /// Stat `path` and freeze its current status.
    pub fn capture(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::metadata(path) {
            Ok(meta) => Self {
                path: path.to_path_buf(),
                existed: true,
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                size: meta.len(),
            },
            Err(_) => Self::missing(path),
        }
    }

    fn missing(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            existed: false,
            modified: SystemTime::UNIX_EPOCH,
            size: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn existed(&self) -> bool {
        self.existed
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// True when both snapshots describe the same file state.
    ///
    /// Two missing files always match; two existing files match when their
    /// modification time and size are identical.
    pub fn same_state(&self, other: &PathSnapshot) -> bool {
        match (self.existed, other.existed) {
            (false, false) => true,
            (true, true) => self.modified == other.modified && self.size == other.size,
            _ => false,
        }
    }

    /// Re-stat the file and report whether it changed since this snapshot.
    pub fn is_stale(&self) -> bool {
        self.recapture_if_changed().is_some()
    }

    /// Re-stat the file once, returning the new snapshot if it differs.
    pub(crate) fn recapture_if_changed(&self) -> Option<PathSnapshot> {
        let current = Self::capture(&self.path);
        (!self.same_state(&current)).then_some(current)
    }

    /// Describe how the file changed between this snapshot and `current`,
    /// for log messages.
    pub(crate) fn change_kind(&self, current: &PathSnapshot) -> &'static str {
        match (self.existed, current.existed) {
            (true, false) => "Deleted",
            (false, true) => "Created",
            _ => "Updated",
        }
    }
}

impl PartialEq for PathSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.same_state(other)
    }
}

impl Eq for PathSnapshot {}
