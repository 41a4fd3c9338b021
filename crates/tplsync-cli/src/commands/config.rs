//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use tplsync_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        OutputFormat::Quiet => {
            println!("{}", config.work_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  work_dir:                {}", config.work_dir.display());
            println!("  capture_file:            {}", config.capture_file.display());
            println!("  template_file:           {}", config.template_file.display());
            println!("  artifact_file:           {}", config.artifact_file.display());
            println!("  readiness_marker:        {}", config.readiness_marker);
            println!("  create_default_template: {}", config.create_default_template);
            println!("  preview_enabled:         {}", config.preview_enabled);
            println!("  preview_port:            {}", config.preview_port);
            println!("  poll_interval_ms:        {}", config.poll_interval_ms);
            println!("  artifact_content_type:   {}", config.artifact_content_type);
            println!("  save_action:             {}", config.save_action);
            println!("  preview_action:          {}", config.preview_action);
            println!("  debounce_ms:             {}", config.debounce_ms);
            println!(
                "  request_timeout_secs:    {}",
                config
                    .request_timeout_secs
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  log_level:               {}", config.log_level);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Print the config file path
pub fn path(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    match output.format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "path": path })),
        _ => println!("{}", path.display()),
    }
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "work_dir" => config.work_dir = value.into(),
        "capture_file" => config.capture_file = value.into(),
        "template_file" => config.template_file = value.into(),
        "artifact_file" => config.artifact_file = value.into(),
        "readiness_marker" => {
            if value.is_empty() {
                bail!("readiness_marker cannot be empty");
            }
            config.readiness_marker = value.to_string();
        }
        "create_default_template" => {
            config.create_default_template = value
                .parse()
                .context("Invalid value for create_default_template. Use 'true' or 'false'.")?;
        }
        "preview_enabled" => {
            config.preview_enabled = value
                .parse()
                .context("Invalid value for preview_enabled. Use 'true' or 'false'.")?;
        }
        "preview_port" => {
            config.preview_port = value.parse().context("Invalid port number")?;
        }
        "poll_interval_ms" => {
            config.poll_interval_ms = value.parse().context("Invalid poll interval")?;
        }
        "artifact_content_type" => config.artifact_content_type = value.to_string(),
        "save_action" => config.save_action = value.to_string(),
        "preview_action" => config.preview_action = value.to_string(),
        "debounce_ms" => {
            config.debounce_ms = value.parse().context("Invalid debounce")?;
        }
        "request_timeout_secs" => {
            config.request_timeout_secs = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.parse().context("Invalid timeout")?)
            };
        }
        "log_level" => config.log_level = value.to_string(),
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: work_dir, capture_file, template_file, artifact_file, \
                 readiness_marker, create_default_template, preview_enabled, preview_port, \
                 poll_interval_ms, artifact_content_type, save_action, preview_action, \
                 debounce_ms, request_timeout_secs, log_level",
                key
            );
        }
    }
    Ok(())
}
