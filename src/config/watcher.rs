//! Configuration file watcher for hot reload.
//!
//! The watch is placed on the directory containing the config file rather
//! than the file itself: editors and config-management tools replace files
//! through a rename, which drops a file-level inotify watch.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;

/// Why a reload was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadSignal {
    /// The watched config file was written or replaced.
    FileChanged,
    /// SIGHUP received.
    Hangup,
}

/// Error type for establishing the watch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("config path {} has no parent directory", .0.display())]
    NoParent(PathBuf),
    #[error("cannot resolve config directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    dir: PathBuf,
    path: PathBuf,
    signal_tx: mpsc::UnboundedSender<ReloadSignal>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`.
    ///
    /// The config path is made absolute against its canonicalized parent so
    /// it compares equal to the paths `notify` reports.
    pub fn new(
        path: &Path,
        signal_tx: mpsc::UnboundedSender<ReloadSignal>,
    ) -> Result<Self, WatchError> {
        let (dir, path) = watch_target(path)?;
        Ok(Self {
            dir,
            path,
            signal_tx,
        })
    }

    /// Absolute path of the watched config file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start watching. The returned watcher must be kept alive; dropping it
    /// stops the watch and closes this watcher's side of the signal channel.
    pub fn run(self) -> Result<RecommendedWatcher, WatchError> {
        let tx = self.signal_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_write_event(&event.kind) && event.paths.iter().any(|p| *p == path) {
                        tracing::info!(path = %path.display(), kind = ?event.kind, "Config file change detected");
                        if tx.send(ReloadSignal::FileChanged).is_err() {
                            tracing::warn!("Reload coordinator gone, dropping config change");
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default(),
        )?;

        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        tracing::info!(
            directory = %self.dir.display(),
            path = %self.path.display(),
            "Config watcher started"
        );
        Ok(watcher)
    }
}

/// Whether an event kind means the file content may have changed.
///
/// Covers in-place writes, creation, and a rename landing on the path.
/// Access, metadata-only and removal events are ignored.
pub fn is_write_event(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => true,
        EventKind::Modify(ModifyKind::Name(mode)) => {
            matches!(mode, RenameMode::To | RenameMode::Both | RenameMode::Any)
        }
        _ => false,
    }
}

fn watch_target(path: &Path) -> Result<(PathBuf, PathBuf), WatchError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| WatchError::NoParent(path.to_path_buf()))?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => return Err(WatchError::NoParent(path.to_path_buf())),
    };
    let dir = parent
        .canonicalize()
        .map_err(|source| WatchError::Directory {
            path: parent.clone(),
            source,
        })?;
    let path = dir.join(file_name);
    Ok((dir, path))
}
