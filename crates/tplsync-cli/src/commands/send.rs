//! Send command handler

use anyhow::{bail, Context, Result};

use tplsync_core::template::read_text;
use tplsync_core::{Config, PreviewCache, ReplayEngine, RequestTemplate, SendOutcome};

use crate::output::Output;

/// Push the current template once
pub async fn send(config: &Config, output: &Output) -> Result<()> {
    let capture_path = config.capture_path();
    let capture = read_text(&capture_path).await?;
    let template = RequestTemplate::parse(&capture)
        .with_context(|| format!("Invalid capture in {}", capture_path.display()))?;

    let mut engine = ReplayEngine::new(config).context("Failed to create HTTP client")?;
    if config.preview_enabled {
        engine = engine.with_preview(PreviewCache::new(), config.artifact_path());
    }
    engine.set_template(template);

    let content = read_text(&config.template_path()).await?;
    match engine.send(&content).await {
        SendOutcome::Success { preview } => {
            output.success("Template sent");
            if preview.is_some() {
                output.message(&format!(
                    "Preview written to {}",
                    config.artifact_path().display()
                ));
            }
            Ok(())
        }
        SendOutcome::ApplicationError { message } => bail!("Remote service error: {}", message),
        SendOutcome::TransportError(e) => Err(e.into()),
        SendOutcome::NotReady => bail!("No captured request loaded"),
    }
}
