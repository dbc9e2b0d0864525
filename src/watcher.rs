use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};

use crate::error::{LiveImportError, Result};
use crate::tracking::has_source_extension;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl SourceEvent {
    pub fn path(&self) -> &Path {
        match self {
            SourceEvent::Modified(path) | SourceEvent::Deleted(path) => path,
        }
    }
}

/// Debounced notifications about module source files under a set of roots.
pub struct SourceWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    receiver: Receiver<std::result::Result<Vec<DebouncedEvent>, notify::Error>>,
    source_extensions: Vec<String>,
}

impl SourceWatcher {
    pub fn new(roots: &[PathBuf], source_extensions: &[String]) -> Result<Self> {
        let (tx, rx) = channel();

        let mut debouncer = new_debouncer(Duration::from_millis(500), tx)
            .map_err(|e| LiveImportError::Watcher(e.to_string()))?;

        for root in roots {
            debouncer
                .watcher()
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| LiveImportError::Watcher(e.to_string()))?;
        }

        Ok(Self {
            _debouncer: debouncer,
            receiver: rx,
            source_extensions: source_extensions.to_vec(),
        })
    }

    /// Block until the next batch of source changes. `None` once the watcher
    /// has shut down.
    pub fn recv(&self) -> Option<Vec<SourceEvent>> {
        loop {
            match self.receiver.recv() {
                Ok(Ok(events)) => {
                    let events = self.source_events(events);
                    if !events.is_empty() {
                        return Some(events);
                    }
                }
                Ok(Err(e)) => tracing::warn!("Watch error: {}", e),
                Err(_) => return None,
            }
        }
    }

    fn source_events(&self, events: Vec<DebouncedEvent>) -> Vec<SourceEvent> {
        let mut result: Vec<SourceEvent> = events
            .into_iter()
            .filter(|e| has_source_extension(&e.path, &self.source_extensions))
            .filter_map(|e| {
                let path = e.path;
                if path.is_file() {
                    Some(SourceEvent::Modified(path))
                } else if !path.exists() {
                    Some(SourceEvent::Deleted(path))
                } else {
                    None
                }
            })
            .collect();
        result.dedup();
        result
    }
}
