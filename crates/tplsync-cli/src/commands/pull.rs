//! Pull command handler

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use tplsync_core::preview::{PreviewClient, PreviewPoller};
use tplsync_core::{Config, Error};

use crate::output::Output;

/// Poll a preview server and write each new rendering to `out`
pub async fn pull(config: &Config, url: &str, out: &Path, output: &Output) -> Result<()> {
    let client = PreviewClient::new(url);
    let mut poller = PreviewPoller::new();
    let mut interval = tokio::time::interval(config.poll_interval());

    output.message(&format!("Following {} (Ctrl-C to stop)", url));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = interval.tick() => {
                match client.poll(&mut poller).await {
                    Ok(Some((timestamp, bytes))) => {
                        tokio::fs::write(out, &bytes)
                            .await
                            .with_context(|| format!("Failed to write {}", out.display()))?;
                        debug!("Artifact {} saved", timestamp);
                        output.success(&format!("Updated {}", out.display()));
                    }
                    Ok(None) => {}
                    Err(Error::ResourceMissing) => debug!("No preview yet"),
                    Err(e) => warn!("Poll failed: {}", e),
                }
            }
        }
    }

    Ok(())
}
