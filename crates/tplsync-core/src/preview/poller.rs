//! Client side of the preview polling protocol

use bytes::Bytes;
use reqwest::StatusCode;
use tracing::debug;

use super::server::LatestResponse;
use crate::error::{Error, Result};

/// Decides when a viewer should download the artifact again
///
/// A refetch happens the first time a timestamp is seen and whenever it
/// differs from the previous poll. An absent timestamp never triggers one.
#[derive(Debug, Default, Clone)]
pub struct PreviewPoller {
    last_seen: Option<i64>,
}

impl PreviewPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of a poll; returns whether to refetch
    pub fn observe(&mut self, latest: Option<i64>) -> bool {
        let changed = latest != self.last_seen;
        self.last_seen = latest;
        changed && latest.is_some()
    }

    pub fn last_seen(&self) -> Option<i64> {
        self.last_seen
    }

    /// Forget an observation whose download failed, so the next poll retries
    fn restore(&mut self, last_seen: Option<i64>) {
        self.last_seen = last_seen;
    }
}

/// HTTP client for a running preview server
#[derive(Debug, Clone)]
pub struct PreviewClient {
    client: reqwest::Client,
    base_url: String,
}

impl PreviewClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /latest`
    pub async fn latest(&self) -> Result<Option<i64>> {
        let response = self
            .client
            .get(format!("{}/latest", self.base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Transport {
                status: response.status(),
            });
        }
        let body: LatestResponse = response.json().await?;
        Ok(body.latest)
    }

    /// `GET /preview`
    pub async fn artifact(&self) -> Result<Bytes> {
        let response = self
            .client
            .get(format!("{}/preview", self.base_url))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::ResourceMissing),
            status if !status.is_success() => Err(Error::Transport { status }),
            _ => Ok(response.bytes().await?),
        }
    }

    /// Poll once; returns the new artifact if it changed since the last poll
    ///
    /// A failed download leaves the poller as it was before this poll.
    pub async fn poll(&self, poller: &mut PreviewPoller) -> Result<Option<(i64, Bytes)>> {
        let latest = self.latest().await?;
        let previous = poller.last_seen();
        if !poller.observe(latest) {
            return Ok(None);
        }
        let Some(timestamp) = latest else {
            return Ok(None);
        };
        debug!("Preview changed at {}", timestamp);
        match self.artifact().await {
            Ok(bytes) => Ok(Some((timestamp, bytes))),
            Err(e) => {
                poller.restore(previous);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_to_fetch_before_first_artifact() {
        let mut poller = PreviewPoller::new();
        assert!(!poller.observe(None));
        assert!(!poller.observe(None));
        assert!(poller.last_seen().is_none());
    }

    #[test]
    fn test_refetch_only_on_change() {
        let mut poller = PreviewPoller::new();
        assert!(poller.observe(Some(100)));
        assert!(!poller.observe(Some(100)));
        assert!(!poller.observe(Some(100)));
        assert!(poller.observe(Some(250)));
        assert!(!poller.observe(Some(250)));
        assert_eq!(poller.last_seen(), Some(250));
    }

    #[test]
    fn test_server_restart_resets() {
        let mut poller = PreviewPoller::new();
        assert!(poller.observe(Some(100)));
        assert!(!poller.observe(None));
        assert!(poller.observe(Some(100)));
    }

    #[test]
    fn test_restore_allows_retry() {
        let mut poller = PreviewPoller::new();
        assert!(poller.observe(Some(100)));
        poller.restore(None);
        assert!(poller.observe(Some(100)));
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = PreviewClient::new("http://127.0.0.1:3000/");
        assert_eq!(client.base_url, "http://127.0.0.1:3000");
    }
}
