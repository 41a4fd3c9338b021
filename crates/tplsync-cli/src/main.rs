//! tplsync CLI
//!
//! Watches a local template and pushes every save to the remote template
//! editor by replaying a captured browser request.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tplsync_core::Config;

mod commands;
mod logging;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "tplsync")]
#[command(about = "tplsync - push template edits by replaying a captured request")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the capture and template files
    #[arg(short = 'C', long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the template and push every save (default)
    Run {
        /// Do not fetch or serve previews
        #[arg(long)]
        no_preview: bool,
        /// Port for the preview server
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create the capture and template files
    Init,
    /// Parse the capture file and show what will be replayed
    Check,
    /// Push the current template once
    Send,
    /// Follow a running preview server and save each new rendering
    Pull {
        /// Preview server base URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,
        /// File to write renderings to
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
    /// Print the config file path
    Path,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work on the file, not the effective values
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let mut config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    if let Some(dir) = cli.dir {
        config.work_dir = dir;
    }

    logging::init(&config, cli.verbose);

    match cli.command.unwrap_or(Commands::Run {
        no_preview: false,
        port: None,
    }) {
        Commands::Run { no_preview, port } => {
            if no_preview {
                config.preview_enabled = false;
            }
            if let Some(port) = port {
                config.preview_port = port;
            }
            commands::run::run(config, &output).await
        }
        Commands::Init => commands::init::init(&config, &output).await,
        Commands::Check => commands::check::check(&config, &output).await,
        Commands::Send => commands::send::send(&config, &output).await,
        Commands::Pull { url, out } => commands::pull::pull(&config, &url, &out, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
        Some(ConfigCommands::Path) => commands::config::path(config_path, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_args_defaults_to_run() {
        let cli = Cli::try_parse_from(["tplsync"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_run_flags() {
        let cli =
            Cli::try_parse_from(["tplsync", "run", "--no-preview", "--port", "4000"]).unwrap();
        match cli.command {
            Some(Commands::Run { no_preview, port }) => {
                assert!(no_preview);
                assert_eq!(port, Some(4000));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tplsync", "check", "--json", "-C", "/work"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.dir, Some(PathBuf::from("/work")));
        assert!(matches!(cli.command, Some(Commands::Check)));
    }

    #[test]
    fn test_pull_requires_out() {
        assert!(Cli::try_parse_from(["tplsync", "pull"]).is_err());

        let cli = Cli::try_parse_from(["tplsync", "pull", "-o", "out.pdf"]).unwrap();
        match cli.command {
            Some(Commands::Pull { url, out }) => {
                assert_eq!(url, "http://127.0.0.1:3000");
                assert_eq!(out, PathBuf::from("out.pdf"));
            }
            _ => panic!("Expected Pull command"),
        }
    }

    #[test]
    fn test_config_set() {
        let cli =
            Cli::try_parse_from(["tplsync", "config", "set", "preview_port", "8080"]).unwrap();
        match cli.command {
            Some(Commands::Config {
                command: Some(ConfigCommands::Set { key, value }),
            }) => {
                assert_eq!(key, "preview_port");
                assert_eq!(value, "8080");
            }
            _ => panic!("Expected Config Set command"),
        }
    }
}
