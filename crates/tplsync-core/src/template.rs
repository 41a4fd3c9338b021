//! Local files the engine works on

use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};

/// Minimal BFO report written when no template exists yet
pub const DEFAULT_TEMPLATE: &str = r#"<?xml version="1.0"?>
<!DOCTYPE pdf PUBLIC "-//big.faceless.org//report" "report-1.1.dtd">
<pdfset>
	<pdf>
		<head>
		</head>
		<body size="Letter">
			<h1>Hello World</h1>
		</body>
	</pdf>
</pdfset>"#;

/// Create `path` with `contents` unless it already exists
///
/// Returns whether the file was created.
pub async fn ensure_file(path: &Path, contents: &str) -> Result<bool> {
    if tokio::fs::try_exists(path)
        .await
        .map_err(|e| Error::io(path, e))?
    {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
    }

    tokio::fs::write(path, contents)
        .await
        .map_err(|e| Error::io(path, e))?;
    info!("{} created", path.display());
    Ok(true)
}

/// Read a whole text file
pub async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_file_creates_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("template.html");

        assert!(ensure_file(&path, DEFAULT_TEMPLATE).await.unwrap());
        assert_eq!(read_text(&path).await.unwrap(), DEFAULT_TEMPLATE);

        tokio::fs::write(&path, "edited").await.unwrap();
        assert!(!ensure_file(&path, DEFAULT_TEMPLATE).await.unwrap());
        assert_eq!(read_text(&path).await.unwrap(), "edited");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_text(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_default_template_is_bfo_report() {
        assert!(DEFAULT_TEMPLATE.starts_with("<?xml"));
        assert!(DEFAULT_TEMPLATE.contains("<pdfset>"));
        assert!(DEFAULT_TEMPLATE.contains(r#"<body size="Letter">"#));
    }
}
