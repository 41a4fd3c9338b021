//! Live preview
//!
//! After each successful save the replay engine asks the remote service
//! for a rendering and stores it here. A small HTTP surface serves the
//! artifact; viewers poll for a new timestamp instead of being pushed to.

mod cache;
mod poller;
mod server;

pub use cache::{PreviewCache, RenderedArtifact};
pub use poller::{PreviewClient, PreviewPoller};
pub use server::{bind, router, serve, viewer_document, LatestResponse};
