//! File watcher for configuration dependencies.
//!
//! Watches the exact set of files a [`ChainConfig`](super::ChainConfig)
//! depends on (layer roots and every imported file). Because editors often
//! replace files rather than write them in place, the parent directory of
//! each file is watched and events are filtered back down to the set.
//!
//! Emits change events through a tokio watch channel. Uses debouncing to
//! coalesce rapid file changes. The watcher only signals; deciding when to
//! call `merge()` again is up to the consumer.

use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::files::absolute_path;
use crate::error::Result;

/// Event types emitted when watched configuration files change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChangeEvent {
    /// One watched file was created, modified or removed
    Changed(PathBuf),
    /// Multiple files changed in quick succession
    BatchChange(Vec<PathBuf>),
    /// Watcher encountered an error
    Error(String),
}

impl ConfigChangeEvent {
    /// Returns true if this event requires a config reload.
    pub fn requires_reload(&self) -> bool {
        !matches!(self, ConfigChangeEvent::Error(_))
    }

    /// Get the affected paths for this event.
    pub fn affected_paths(&self) -> Vec<&Path> {
        match self {
            ConfigChangeEvent::Changed(p) => vec![p.as_path()],
            ConfigChangeEvent::BatchChange(paths) => paths.iter().map(|p| p.as_path()).collect(),
            ConfigChangeEvent::Error(_) => vec![],
        }
    }
}

/// How often the event loop checks whether its handle was dropped.
const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

/// The set of files being watched.
#[derive(Debug, Clone, Default)]
pub struct WatchPaths {
    files: Vec<PathBuf>,
    /// Absolute and canonical spellings of every file, for event matching.
    aliases: HashSet<PathBuf>,
}

impl WatchPaths {
    pub fn new<P: AsRef<Path>>(files: impl IntoIterator<Item = P>) -> Self {
        let mut paths = Self::default();
        for file in files {
            let file = absolute_path(file.as_ref());
            if !paths.aliases.insert(file.clone()) {
                continue;
            }
            if let Ok(canonical) = file.canonicalize() {
                paths.aliases.insert(canonical);
            }
            paths.files.push(file);
        }
        paths
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.aliases.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The watched files, in the order given.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Distinct parent directories, in sorted order.
    fn directories(&self) -> BTreeSet<PathBuf> {
        self.files
            .iter()
            .filter_map(|file| file.parent().map(Path::to_path_buf))
            .collect()
    }
}

/// Handle to control the config watcher.
pub struct ConfigWatcherHandle {
    /// Receiver for config change events.
    pub events: watch::Receiver<Option<ConfigChangeEvent>>,
    /// Handle to the watcher task (it stops shortly after `events` is dropped).
    _task_handle: tokio::task::JoinHandle<()>,
}

impl ConfigWatcherHandle {
    /// Wait for the next config change event.
    pub async fn wait_for_change(&mut self) -> Option<ConfigChangeEvent> {
        // Skip the initial None value
        loop {
            if self.events.changed().await.is_err() {
                return None; // Sender dropped
            }
            let event = self.events.borrow_and_update().clone();
            if event.is_some() {
                return event;
            }
        }
    }
}

/// Starts watching `paths` for changes.
///
/// Must be called from within a tokio runtime. Directories that do not exist
/// are skipped with a warning; files inside them are not observed until the
/// watcher is restarted.
pub fn start_config_watcher(paths: WatchPaths, config: WatcherConfig) -> Result<ConfigWatcherHandle> {
    let (event_tx, event_rx) = watch::channel(None);
    let (notify_tx, notify_rx) = mpsc::channel();

    let mut debouncer = new_debouncer(config.debounce_duration, notify_tx)?;
    let watcher = debouncer.watcher();

    for dir in paths.directories() {
        if dir.exists() {
            info!("Watching config directory: {}", dir.display());
            watcher.watch(&dir, notify::RecursiveMode::NonRecursive)?;
        } else {
            warn!(
                "Config directory does not exist, skipping watch: {}",
                dir.display()
            );
        }
    }

    let task_handle = tokio::task::spawn_blocking(move || {
        // Keep the debouncer alive
        let _debouncer = debouncer;
        process_notify_events(notify_rx, event_tx, &paths);
    });

    Ok(ConfigWatcherHandle {
        events: event_rx,
        _task_handle: task_handle,
    })
}

/// Process events from the notify debouncer and convert to ConfigChangeEvents.
fn process_notify_events(
    rx: mpsc::Receiver<std::result::Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>>,
    tx: watch::Sender<Option<ConfigChangeEvent>>,
    paths: &WatchPaths,
) {
    loop {
        match rx.recv_timeout(CLOSE_POLL_INTERVAL) {
            Ok(Ok(events)) => {
                let changed = events
                    .into_iter()
                    .filter(|event| {
                        matches!(
                            event.kind,
                            DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                        )
                    })
                    .map(|event| event.path);
                let Some(event) = classify_events(changed, paths) else {
                    continue;
                };
                debug!("Config change detected: {:?}", event);
                if tx.send(Some(event)).is_err() {
                    info!("Config watcher receiver dropped, stopping");
                    return;
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
                if tx.send(Some(ConfigChangeEvent::Error(e.to_string()))).is_err() {
                    return;
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if tx.is_closed() {
                    info!("Config watcher receiver dropped, stopping");
                    return;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                info!("Config watcher channel closed, stopping");
                return;
            }
        }
    }
}

/// Reduce a batch of changed paths to at most one event about watched files.
fn classify_events(
    changed: impl IntoIterator<Item = PathBuf>,
    paths: &WatchPaths,
) -> Option<ConfigChangeEvent> {
    let mut hits: Vec<PathBuf> = Vec::new();
    for path in changed {
        if paths.contains(&path) && !hits.contains(&path) {
            hits.push(path);
        }
    }

    match hits.len() {
        0 => None,
        1 => hits.pop().map(ConfigChangeEvent::Changed),
        _ => Some(ConfigChangeEvent::BatchChange(hits)),
    }
}
