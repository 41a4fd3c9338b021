//! Check command handler

use anyhow::{Context, Result};

use tplsync_core::template::read_text;
use tplsync_core::{Config, RequestTemplate};

use crate::output::Output;

/// Parse the capture file and describe the request it holds
pub async fn check(config: &Config, output: &Output) -> Result<()> {
    let capture_path = config.capture_path();
    let content = read_text(&capture_path).await?;

    let template = RequestTemplate::parse(&content)
        .with_context(|| format!("Invalid capture in {}", capture_path.display()))?;
    let invocation = template.invocation(template.base_parameters())?;

    output.print_request(&template, &invocation);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[tokio::test]
    async fn test_check_rejects_capture_without_body() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            work_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        std::fs::write(config.capture_path(), r#"fetch("https://example.com")"#).unwrap();

        let err = check(&config, &Output::new(OutputFormat::Quiet))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid capture"));
    }

    #[tokio::test]
    async fn test_check_accepts_capture() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            work_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        std::fs::write(
            config.capture_path(),
            r#"fetch("https://example.com/save", { "body": "action=SAVE_EDIT", "method": "POST" });"#,
        )
        .unwrap();

        check(&config, &Output::new(OutputFormat::Quiet))
            .await
            .unwrap();
    }
}
