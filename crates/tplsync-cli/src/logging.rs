//! Logging setup

use tracing_subscriber::EnvFilter;

use tplsync_core::Config;

/// Install the stderr subscriber
///
/// `RUST_LOG` wins when set; otherwise `--verbose` means debug and the
/// configured `log_level` applies.
pub fn init(config: &Config, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(level)));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn directives(level: &str) -> String {
    format!("tplsync_core={},tplsync={}", level, level)
}
