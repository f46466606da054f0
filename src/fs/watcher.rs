use std::path::{Path, PathBuf};
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::event::Event;

/// Watches a single file and sends [`Event::FsChange`] when it settles.
pub struct FsWatcher {
    target: PathBuf,
    /// Handle to the debouncer (dropped to stop watching).
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

impl FsWatcher {
    /// Watch `target` through its parent directory, so the file may be
    /// replaced by editors that write a new inode on save.
    ///
    /// Events are debounced by `debounce_duration` and sent via `event_tx`.
    pub fn new(
        target: &Path,
        debounce_duration: Duration,
        event_tx: mpsc::UnboundedSender<Event>,
    ) -> notify::Result<Self> {
        let target = if target.is_absolute() {
            target.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(notify::Error::io)?
                .join(target)
        };
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(notify::Error::io)?;

        let watched = target.clone();
        let mut debouncer = new_debouncer(
            debounce_duration,
            move |result: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                match result {
                    Ok(events) => {
                        let paths: Vec<PathBuf> = events
                            .iter()
                            .filter(|e| e.kind == DebouncedEventKind::Any)
                            .map(|e| e.path.clone())
                            .filter(|p| is_target(p, &watched))
                            .collect();

                        if paths.is_empty() {
                            return;
                        }
                        debug!(count = paths.len(), "mirror changed on disk");
                        let _ = event_tx.send(Event::FsChange(paths));
                    }
                    Err(err) => warn!(error = %err, "file watcher error"),
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(&dir, notify::RecursiveMode::NonRecursive)?;

        Ok(Self {
            target,
            _debouncer: debouncer,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

/// Whether an event path names the watched file. Only the file name is
/// compared since the watcher may report a canonicalized directory.
pub fn is_target(path: &Path, target: &Path) -> bool {
    match (path.file_name(), target.file_name()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
