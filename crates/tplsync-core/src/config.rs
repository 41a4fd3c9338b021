//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/tplsync/config.toml)
//! 3. Environment variables (TPLSYNC_* prefix)
//!
//! Environment variables take precedence over config file values. The CLI
//! applies its own flags on top of the loaded value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "TPLSYNC";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the capture, template and artifact files live in
    pub work_dir: PathBuf,

    /// Captured browser request, relative to `work_dir`
    pub capture_file: PathBuf,

    /// Template being edited, relative to `work_dir`
    pub template_file: PathBuf,

    /// Last rendered preview, relative to `work_dir`
    pub artifact_file: PathBuf,

    /// Substring that marks the capture file as usable
    pub readiness_marker: String,

    /// Write a skeleton document when the template file is missing
    pub create_default_template: bool,

    /// Fetch a preview after each successful save and serve it
    pub preview_enabled: bool,

    /// Port of the preview HTTP surface (bound on localhost)
    pub preview_port: u16,

    /// How often the viewer polls for a new artifact
    pub poll_interval_ms: u64,

    /// Content type the artifact is served with
    pub artifact_content_type: String,

    /// Parameter value that marks a save request
    pub save_action: String,

    /// Parameter value that replaces `save_action` for previews
    pub preview_action: String,

    /// Quiet period used to coalesce bursts of file events
    pub debounce_ms: u64,

    /// Per-request timeout; transport default when unset
    pub request_timeout_secs: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            capture_file: PathBuf::from(".fetch"),
            template_file: PathBuf::from("template.html"),
            artifact_file: PathBuf::from("generated.pdf"),
            readiness_marker: "fetch".to_string(),
            create_default_template: true,
            preview_enabled: true,
            preview_port: 3000,
            poll_interval_ms: 1000,
            artifact_content_type: "application/pdf".to_string(),
            save_action: "SAVE_EDIT".to_string(),
            preview_action: "PREVIEW".to_string(),
            debounce_ms: 100,
            request_timeout_secs: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TPLSYNC_WORK_DIR, TPLSYNC_PREVIEW_ENABLED, ...)
    /// 2. Config file (~/.config/tplsync/config.toml or TPLSYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path from the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_WORK_DIR", ENV_PREFIX)) {
            if !val.is_empty() {
                self.work_dir = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var(format!("{}_PREVIEW_ENABLED", ENV_PREFIX)) {
            self.preview_enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }

        if let Ok(val) = std::env::var(format!("{}_PREVIEW_PORT", ENV_PREFIX)) {
            if let Ok(port) = val.parse() {
                self.preview_port = port;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TPLSYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tplsync")
            .join("config.toml")
    }

    /// Path of the captured request
    pub fn capture_path(&self) -> PathBuf {
        self.work_dir.join(&self.capture_file)
    }

    /// Path of the template being edited
    pub fn template_path(&self) -> PathBuf {
        self.work_dir.join(&self.template_file)
    }

    /// Path the rendered preview is written to
    pub fn artifact_path(&self) -> PathBuf {
        self.work_dir.join(&self.artifact_file)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
