//! Preview HTTP surface
//!
//! - `GET /latest`  → `{"latest": <ms since epoch> | null}`
//! - `GET /preview` → artifact bytes, or 404 before the first preview
//! - anything else  → viewer page that polls the two endpoints above

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, info};

use super::cache::PreviewCache;
use crate::error::{Error, Result};

const VIEWER_TEMPLATE: &str = include_str!("viewer.html");

/// Body of `GET /latest`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestResponse {
    pub latest: Option<i64>,
}

#[derive(Clone)]
struct ServerState {
    cache: PreviewCache,
    content_type: String,
    viewer: String,
}

/// Build the preview routes
pub fn router(cache: PreviewCache, content_type: &str, poll_interval: Duration) -> Router {
    let state = ServerState {
        cache,
        content_type: content_type.to_string(),
        viewer: viewer_document(poll_interval),
    };

    Router::new()
        .route("/latest", get(latest))
        .route("/preview", get(preview))
        .fallback(viewer)
        .with_state(state)
}

/// Viewer page with the polling interval filled in
pub fn viewer_document(poll_interval: Duration) -> String {
    VIEWER_TEMPLATE.replace("__POLL_INTERVAL_MS__", &poll_interval.as_millis().to_string())
}

/// Bind the preview port on localhost
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Config(format!("cannot bind preview server on {}: {}", addr, e)))
}

/// Serve `router` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Preview available at http://{}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(Error::Server)
}

async fn latest(State(state): State<ServerState>) -> Json<LatestResponse> {
    Json(LatestResponse {
        latest: state.cache.latest().map(|t| t.timestamp_millis()),
    })
}

async fn preview(State(state): State<ServerState>) -> Response {
    match state.cache.artifact() {
        Ok(artifact) => (
            [
                (header::CONTENT_TYPE, state.content_type.clone()),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
            artifact.bytes.clone(),
        )
            .into_response(),
        Err(e) => {
            debug!("Preview requested: {}", e);
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

async fn viewer(State(state): State<ServerState>) -> Html<String> {
    Html(state.viewer)
}
