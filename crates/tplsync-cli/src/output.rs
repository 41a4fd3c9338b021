//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use tplsync_core::capture::{Invocation, RequestTemplate};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print what a parsed capture will replay
    pub fn print_request(&self, template: &RequestTemplate, invocation: &Invocation) {
        let params = template.base_parameters();
        match self.format {
            OutputFormat::Human => {
                println!("URL:        {}", invocation.url);
                println!("Method:     {}", invocation.method);
                if !invocation.headers.is_empty() {
                    let names: Vec<&str> =
                        invocation.headers.iter().map(|(n, _)| n.as_str()).collect();
                    println!("Headers:    {}", names.join(", "));
                }
                println!("Parameters: {}", params.len());
                for (key, value) in params {
                    println!("  {} = {}", key, truncate_line(value, 50));
                }
            }
            OutputFormat::Json => {
                let headers: Vec<&str> =
                    invocation.headers.iter().map(|(n, _)| n.as_str()).collect();
                let keys: Vec<&str> = params.keys().map(String::as_str).collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "url": invocation.url,
                        "method": invocation.method,
                        "headers": headers,
                        "parameters": keys,
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", invocation.url);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ééééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("<?xml?>\n<pdfset>", 20), "<?xml?>");
        assert_eq!(truncate_line("", 20), "");
    }
}
