//! Init command handler

use anyhow::Result;

use tplsync_core::template::{ensure_file, DEFAULT_TEMPLATE};
use tplsync_core::Config;

use crate::output::Output;

/// Create the capture and template files if missing
pub async fn init(config: &Config, output: &Output) -> Result<()> {
    let capture_path = config.capture_path();
    let template_path = config.template_path();

    if ensure_file(&capture_path, "").await? {
        output.success(&format!("Created {}", capture_path.display()));
    }

    let default_contents = if config.create_default_template {
        DEFAULT_TEMPLATE
    } else {
        ""
    };
    if ensure_file(&template_path, default_contents).await? {
        output.success(&format!("Created {}", template_path.display()));
    }

    output.message(&format!(
        "Paste a \"Copy as fetch\" of the template save request into {}",
        capture_path.display()
    ));
    Ok(())
}
