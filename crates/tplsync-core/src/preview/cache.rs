//! Latest rendered artifact

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;

use crate::error::{Error, Result};

/// Bytes returned by a preview request
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub bytes: Bytes,
    pub generated_at: DateTime<Utc>,
}

impl RenderedArtifact {
    /// Timestamp as exposed to viewers
    pub fn timestamp_millis(&self) -> i64 {
        self.generated_at.timestamp_millis()
    }
}

/// Holds at most one artifact
///
/// Clones share the same slot. A new artifact and its timestamp replace the
/// old pair in a single swap, so readers never see a mix of the two.
#[derive(Debug, Clone)]
pub struct PreviewCache {
    current: Arc<watch::Sender<Option<Arc<RenderedArtifact>>>>,
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewCache {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            current: Arc::new(tx),
        }
    }

    /// Replace the stored artifact, returning its timestamp
    ///
    /// Timestamps strictly increase at millisecond resolution, even when two
    /// artifacts arrive within the same millisecond.
    pub fn store(&self, bytes: impl Into<Bytes>) -> DateTime<Utc> {
        let bytes = bytes.into();
        let mut generated_at = Utc::now();

        self.current.send_modify(|slot| {
            if let Some(previous) = slot.as_ref() {
                if generated_at.timestamp_millis() <= previous.timestamp_millis() {
                    generated_at = previous.generated_at + Duration::milliseconds(1);
                }
            }
            *slot = Some(Arc::new(RenderedArtifact {
                bytes,
                generated_at,
            }));
        });

        generated_at
    }

    /// Timestamp of the stored artifact, if any
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.current.borrow().as_ref().map(|a| a.generated_at)
    }

    /// The stored artifact
    pub fn artifact(&self) -> Result<Arc<RenderedArtifact>> {
        self.current.borrow().clone().ok_or(Error::ResourceMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache() {
        let cache = PreviewCache::new();
        assert!(cache.latest().is_none());
        assert!(matches!(cache.artifact(), Err(Error::ResourceMissing)));
    }

    #[test]
    fn test_store_replaces_artifact() {
        let cache = PreviewCache::new();

        let t1 = cache.store(b"first".to_vec());
        assert_eq!(cache.latest(), Some(t1));
        assert_eq!(cache.artifact().unwrap().bytes.as_ref(), b"first");

        let t2 = cache.store(b"second".to_vec());
        assert!(t2.timestamp_millis() > t1.timestamp_millis());
        assert_eq!(cache.latest(), Some(t2));
        assert_eq!(cache.artifact().unwrap().bytes.as_ref(), b"second");
    }

    #[test]
    fn test_timestamps_strictly_increase_in_bursts() {
        let cache = PreviewCache::new();
        let mut last = cache.store(Bytes::from_static(b"0")).timestamp_millis();
        for i in 1..20 {
            let next = cache.store(format!("{}", i).into_bytes()).timestamp_millis();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn test_clones_share_slot() {
        let cache = PreviewCache::new();
        let reader = cache.clone();

        let stored = cache.store(b"pdf".to_vec());
        assert_eq!(reader.latest(), Some(stored));
        assert_eq!(reader.artifact().unwrap().bytes.as_ref(), b"pdf");
    }
}
