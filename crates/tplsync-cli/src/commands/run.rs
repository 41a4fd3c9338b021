//! Run command handler

use anyhow::{Context, Result};
use tokio::sync::oneshot;

use tplsync_core::preview::{self, PreviewCache};
use tplsync_core::{Config, Orchestrator, ReplayEngine};

use crate::output::Output;

/// Watch until Ctrl-C, serving previews when enabled
pub async fn run(config: Config, output: &Output) -> Result<()> {
    let mut engine = ReplayEngine::new(&config).context("Failed to create HTTP client")?;

    let mut server = None;
    if config.preview_enabled {
        let cache = PreviewCache::new();
        engine = engine.with_preview(cache.clone(), config.artifact_path());

        let listener = preview::bind(config.preview_port).await?;
        output.message(&format!("Preview: http://{}", listener.local_addr()?));

        let app = preview::router(
            cache,
            &config.artifact_content_type,
            config.poll_interval(),
        );
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(preview::serve(listener, app, async move {
            let _ = stop_rx.await;
        }));
        server = Some((stop_tx, handle));
    }

    output.message(&format!(
        "Watching {} (Ctrl-C to stop)",
        config.work_dir.display()
    ));
    Orchestrator::new(config, engine).run().await?;

    if let Some((stop_tx, handle)) = server {
        let _ = stop_tx.send(());
        handle.await.context("Preview server task failed")??;
    }

    Ok(())
}
