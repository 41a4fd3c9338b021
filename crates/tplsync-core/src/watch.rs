//! File watch registry
//!
//! Owns one `notify` watcher per watched file, keyed by canonical path.
//! Registering a path twice keeps the first subscription. Events from all
//! watchers are funneled into a single channel so they can be handled one
//! at a time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A change to a watched file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Canonical path the watch was registered under
    pub path: PathBuf,
}

/// Subscription for a single file
///
/// The parent directory is watched rather than the file itself so that
/// editors which save by renaming a temp file over the original keep
/// producing events.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
}

/// Path-keyed set of active watches
pub struct WatchManager {
    watches: HashMap<PathBuf, WatchHandle>,
    events: mpsc::UnboundedSender<WatchEvent>,
}

impl WatchManager {
    /// Create an empty registry and the receiver its events arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                watches: HashMap::new(),
                events: tx,
            },
            rx,
        )
    }

    /// Canonical key for an existing file
    pub fn resolve(path: &Path) -> Result<PathBuf> {
        path.canonicalize().map_err(|e| Error::io(path, e))
    }

    /// Start watching `path`
    ///
    /// Returns `false` without doing anything if the path is already
    /// watched. The file must exist.
    pub fn register(&mut self, path: &Path) -> Result<bool> {
        let key = Self::resolve(path)?;
        if self.watches.contains_key(&key) {
            debug!("Already watching {:?}", key);
            return Ok(false);
        }

        let parent = key
            .parent()
            .ok_or_else(|| Error::Config(format!("{:?} has no parent directory", key)))?
            .to_path_buf();
        let file_name = key.file_name().map(ToOwned::to_owned);

        let tx = self.events.clone();
        let event_key = key.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == file_name.as_deref());
                    if touches_file && is_content_change(&event.kind) {
                        let _ = tx.send(WatchEvent {
                            path: event_key.clone(),
                        });
                    }
                }
                Err(e) => warn!("Watch error on {:?}: {}", event_key, e),
            }
        })?;
        watcher.watch(&parent, RecursiveMode::NonRecursive)?;

        debug!("Watching {:?}", key);
        self.watches.insert(key, WatchHandle { _watcher: watcher });
        Ok(true)
    }

    /// Stop watching `path`; returns whether a watch was removed
    pub fn unregister(&mut self, path: &Path) -> bool {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.watches.remove(&key).is_some()
    }

    /// Number of active subscriptions
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }
}

/// Only creations and content/name changes count; metadata and access
/// events do not.
fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind};
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_register_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("template.html");
        std::fs::write(&path, "<pdf/>").unwrap();

        let (mut watches, _rx) = WatchManager::new();
        assert!(watches.register(&path).unwrap());
        assert!(!watches.register(&path).unwrap());

        // Different spelling of the same file
        let dotted = dir.path().join(".").join("template.html");
        assert!(!watches.register(&dotted).unwrap());

        assert_eq!(watches.len(), 1);
        assert!(watches.unregister(&dotted));
        assert!(watches.is_empty());
    }

    #[test]
    fn test_distinct_paths_get_distinct_watches() {
        let dir = TempDir::new().unwrap();
        let capture = dir.path().join(".fetch");
        let template = dir.path().join("template.html");
        std::fs::write(&capture, "").unwrap();
        std::fs::write(&template, "").unwrap();

        let (mut watches, _rx) = WatchManager::new();
        watches.register(&capture).unwrap();
        watches.register(&template).unwrap();
        assert_eq!(watches.len(), 2);

        assert!(watches.unregister(&capture));
        assert!(!watches.unregister(&capture));
        assert_eq!(watches.len(), 1);
    }

    #[test]
    fn test_register_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let (mut watches, _rx) = WatchManager::new();

        let err = watches.register(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(watches.is_empty());
    }

    #[test]
    fn test_content_change_filter() {
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(!is_content_change(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Permissions
        ))));
        assert!(!is_content_change(&EventKind::Access(AccessKind::Read)));
    }

    #[tokio::test]
    async fn test_change_is_reported_under_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("template.html");
        std::fs::write(&path, "v1").unwrap();

        let (mut watches, mut rx) = WatchManager::new();
        watches.register(&path).unwrap();
        std::fs::write(&path, "v2").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.path, WatchManager::resolve(&path).unwrap());
    }
}
