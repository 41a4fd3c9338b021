//! Error handling
//!
//! Typed errors for capture parsing, request replay and the preview
//! surface. Every runtime error is caught where it happens and logged; the
//! watch loop never stops because of one.

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced by the synchronization engine
#[derive(Error, Debug)]
pub enum Error {
    /// Capture resource could not be turned into a request template
    #[error("Cannot parse capture: {0}")]
    Parse(String),

    /// Remote call did not succeed at the transport level
    #[error("Request failed with status {status}")]
    Transport { status: StatusCode },

    /// Network failure before any status was received
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote service reported an error despite transport success
    #[error("Remote service error: {message}")]
    Application { message: String },

    /// Preview requested before any artifact was rendered
    #[error("No rendered artifact available yet")]
    ResourceMissing,

    /// File system access failed
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Preview HTTP server failure
    #[error("Preview server error: {0}")]
    Server(#[source] io::Error),

    /// File watcher failure
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the operator can fix this by editing an input file
    pub fn is_operator_fixable(&self) -> bool {
        matches!(self, Error::Parse(_) | Error::Application { .. })
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
