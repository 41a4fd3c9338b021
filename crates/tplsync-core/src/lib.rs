//! tplsync Core Library
//!
//! Pushes a locally edited document template to a remote template editor
//! on every save, by replaying a request captured from the browser
//! ("Copy as fetch").
//!
//! # Architecture
//!
//! - **capture**: parses the captured request into a [`RequestTemplate`]
//! - **watch**: path-keyed, idempotent file watches
//! - **orchestrator**: waits for a usable capture, then watches the template
//! - **replay**: rebuilds the body, sends it, classifies the response
//! - **preview**: caches the last rendering and serves it to a polling viewer
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let engine = ReplayEngine::new(&config)?;
//! Orchestrator::new(config, engine).run().await?;
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod preview;
pub mod replay;
pub mod template;
pub mod watch;

pub use capture::{Invocation, Parameters, RequestTemplate};
pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, SyncState};
pub use preview::{PreviewCache, RenderedArtifact};
pub use replay::{ReplayEngine, SendOutcome};
pub use watch::{WatchEvent, WatchManager};
