//! Watch orchestration
//!
//! Drives the two file watches through three states:
//!
//! ```text
//! AwaitingCapture ──capture ready──▶ CaptureReady ──parsed──▶ WatchingTemplate
//!        ▲                                │                        │
//!        └────────── parse failed ────────┘    capture changed ────┘ (re-enter CaptureReady)
//! ```
//!
//! File events are handled one at a time on the calling task. Sends are
//! spawned and left to finish on their own, so a slow remote never holds up
//! later events or shutdown. Every handler re-reads the whole file, so after
//! a burst of saves the last write wins.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::capture::RequestTemplate;
use crate::config::Config;
use crate::error::Result;
use crate::replay::{ReplayEngine, SendOutcome};
use crate::template::{ensure_file, read_text, DEFAULT_TEMPLATE};
use crate::watch::{WatchEvent, WatchManager};

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Capture file missing the readiness marker, or never parsed
    AwaitingCapture,
    /// Capture looks usable and is being parsed
    CaptureReady,
    /// Template changes are being pushed
    WatchingTemplate,
}

/// Capture files are usable once they mention the marker
pub fn is_capture_ready(content: &str, marker: &str) -> bool {
    content.contains(marker)
}

/// Resolve once `signal` fires
///
/// If the signal cannot be installed this logs why and never resolves, so
/// the process keeps running and the default signal action still stops it.
async fn wait_for_signal<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(
            "Cannot listen for Ctrl-C ({}), stop the process with a signal instead",
            e
        );
        std::future::pending::<()>().await;
    }
}

pub struct Orchestrator {
    config: Config,
    engine: ReplayEngine,
    watches: WatchManager,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    sends: JoinSet<SendOutcome>,
    state: SyncState,
    capture_key: Option<PathBuf>,
    template_key: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(config: Config, engine: ReplayEngine) -> Self {
        let (watches, events) = WatchManager::new();
        Self {
            config,
            engine,
            watches,
            events,
            sends: JoinSet::new(),
            state: SyncState::AwaitingCapture,
            capture_key: None,
            template_key: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn engine(&self) -> &ReplayEngine {
        &self.engine
    }

    pub fn watches(&self) -> &WatchManager {
        &self.watches
    }

    /// Create and watch the capture file, then act on its current content
    pub async fn start(&mut self) -> Result<()> {
        let capture_path = self.config.capture_path();
        ensure_file(&capture_path, "").await?;

        self.watches.register(&capture_path)?;
        self.capture_key = Some(WatchManager::resolve(&capture_path)?);

        self.on_capture_changed().await;
        if self.state == SyncState::AwaitingCapture {
            info!(
                "Waiting for a captured request in {}",
                capture_path.display()
            );
        }
        Ok(())
    }

    /// Run until Ctrl-C
    pub async fn run(self) -> Result<()> {
        self.run_until(wait_for_signal(tokio::signal::ctrl_c())).await
    }

    /// Start, then handle file events until `shutdown` resolves
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    break;
                }
                Some(finished) = self.sends.join_next() => {
                    report_send(finished);
                }
                event = self.events.recv() => {
                    let Some(event) = event else { break };
                    for path in self.coalesce(event).await {
                        self.handle_event(&path).await;
                    }
                }
            }
        }

        self.stop().await;
        Ok(())
    }

    /// Drop both watches and abandon unfinished sends
    async fn stop(&mut self) {
        for key in [self.template_key.take(), self.capture_key.take()]
            .into_iter()
            .flatten()
        {
            self.watches.unregister(&key);
        }

        if !self.sends.is_empty() {
            warn!("Abandoning {} unfinished send(s)", self.sends.len());
        }
        self.sends.shutdown().await;
    }

    /// Wait out the debounce window, then drain queued events
    ///
    /// Returns each changed path once, capture before template.
    async fn coalesce(&mut self, first: WatchEvent) -> Vec<PathBuf> {
        let debounce = self.config.debounce();
        if !debounce.is_zero() {
            tokio::time::sleep(debounce).await;
        }

        let mut paths = vec![first.path];
        while let Ok(event) = self.events.try_recv() {
            if !paths.contains(&event.path) {
                paths.push(event.path);
            }
        }

        let capture = self.capture_key.clone();
        paths.sort_by_key(|p| Some(p) != capture.as_ref());
        paths
    }

    /// Route a change to the matching handler
    pub async fn handle_event(&mut self, path: &Path) {
        if self.capture_key.as_deref() == Some(path) {
            debug!("Capture file changed");
            self.on_capture_changed().await;
        } else if self.template_key.as_deref() == Some(path) {
            debug!("Template file changed");
            self.on_template_changed().await;
        } else {
            debug!("Ignoring event for {:?}", path);
        }
    }

    async fn on_capture_changed(&mut self) {
        let capture_path = self.config.capture_path();
        let content = match read_text(&capture_path).await {
            Ok(content) => content,
            Err(e) => {
                error!("{}", e);
                return;
            }
        };

        if !is_capture_ready(&content, &self.config.readiness_marker) {
            debug!("Capture file not ready yet");
            return;
        }

        self.enter_capture_ready(&content).await;
    }

    /// Parse the capture and (re)arm the template watch
    ///
    /// On failure a previously armed template watch keeps running with the
    /// last good template; otherwise the orchestrator goes back to waiting.
    async fn enter_capture_ready(&mut self, content: &str) {
        self.state = SyncState::CaptureReady;
        debug!("Capture ready, parsing");

        let result = match RequestTemplate::parse(content) {
            Ok(template) => {
                self.engine.set_template(template);
                self.watch_template().await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("Captured request loaded");
                self.state = SyncState::WatchingTemplate;
            }
            Err(e) => {
                error!("{}", e);
                if e.is_operator_fixable() {
                    info!(
                        "Copy the request as fetch into {} again",
                        self.config.capture_path().display()
                    );
                }
                self.state = if self.template_key.is_some() {
                    warn!("Keeping the previously loaded request");
                    SyncState::WatchingTemplate
                } else {
                    SyncState::AwaitingCapture
                };
            }
        }
    }

    async fn watch_template(&mut self) -> Result<()> {
        let template_path = self.config.template_path();
        let default_contents = if self.config.create_default_template {
            DEFAULT_TEMPLATE
        } else {
            ""
        };
        ensure_file(&template_path, default_contents).await?;

        if self.watches.register(&template_path)? {
            info!("Watching {}", template_path.display());
        }
        self.template_key = Some(WatchManager::resolve(&template_path)?);
        Ok(())
    }

    /// Read the template and start sending it
    async fn on_template_changed(&mut self) {
        if self.state != SyncState::WatchingTemplate {
            return;
        }

        let template_path = self.config.template_path();
        match read_text(&template_path).await {
            Ok(content) => {
                let engine = self.engine.clone();
                self.sends.spawn(async move { engine.send(&content).await });
            }
            Err(e) => error!("{}", e),
        }
    }
}

/// Log a send that finished outside its own handler
fn report_send(finished: std::result::Result<SendOutcome, JoinError>) {
    match finished {
        Ok(outcome) => debug!("Send finished, success: {}", outcome.is_success()),
        Err(e) if e.is_cancelled() => debug!("Send cancelled"),
        Err(e) => error!("Send task failed: {}", e),
    }
}
