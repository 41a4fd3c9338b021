//! Request replay
//!
//! Sends the current template to the remote service by replaying the
//! captured request with a rebuilt body, then classifies the response.
//!
//! The remote service answers a save either with a non-JSON success page or
//! with a JSON envelope; an envelope whose `errorMessage` is non-empty is an
//! application failure even though the HTTP status is a success.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::capture::{Invocation, Parameters, RequestTemplate};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::preview::PreviewCache;

/// Parameter carrying the template source
pub const TEMPLATE_KEY: &str = "template";

/// Parameters that must be sent empty so the service uses `template`
pub const CLEARED_KEYS: [&str; 2] = ["source-template", "wysiwyg-template"];

/// Captured headers that no longer match a rebuilt body
const SKIPPED_HEADERS: [&str; 2] = ["content-length", "host"];

/// Result of one `send`
#[derive(Debug)]
pub enum SendOutcome {
    /// Template accepted; carries the preview timestamp when one was stored
    Success { preview: Option<DateTime<Utc>> },
    /// The request itself failed
    TransportError(Error),
    /// The service rejected the template
    ApplicationError { message: String },
    /// No request template has been installed yet
    NotReady,
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Success { .. })
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

/// Classify a response that arrived
///
/// Non-success statuses are transport errors. A success whose body is a JSON
/// envelope with a non-empty `errorMessage` is an application error.
/// Anything else, including non-JSON bodies, is a success.
pub fn classify(status: StatusCode, body: &[u8]) -> Result<()> {
    if !status.is_success() {
        return Err(Error::Transport { status });
    }

    match serde_json::from_slice::<Envelope>(body) {
        Ok(Envelope {
            error_message: Some(message),
        }) if !message.is_empty() => Err(Error::Application { message }),
        _ => Ok(()),
    }
}

/// Base parameters with the render-time keys forced
///
/// Whatever the capture held for these keys is replaced: the template key
/// gets `content` and the cleared keys get empty strings.
pub fn render_parameters(base: &Parameters, content: &str) -> Parameters {
    let mut params = base.clone();
    params.insert(TEMPLATE_KEY.to_string(), content.to_string());
    for key in CLEARED_KEYS {
        params.insert(key.to_string(), String::new());
    }
    params
}

/// Same parameters with every save-action value swapped for the preview one
pub fn preview_parameters(params: &Parameters, save_action: &str, preview_action: &str) -> Parameters {
    params
        .iter()
        .map(|(key, value)| {
            let value = if value == save_action {
                preview_action.to_string()
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

/// Where previews go after a successful save
#[derive(Debug, Clone)]
struct PreviewTarget {
    cache: PreviewCache,
    artifact_path: PathBuf,
}

/// Replays the captured request for each template change
///
/// Clones share the HTTP client and the installed template, so a clone can
/// be moved into a task for each send.
#[derive(Clone)]
pub struct ReplayEngine {
    client: reqwest::Client,
    template: Option<Arc<RequestTemplate>>,
    preview: Option<PreviewTarget>,
    save_action: String,
    preview_action: String,
}

impl ReplayEngine {
    /// Create an engine without preview
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            template: None,
            preview: None,
            save_action: config.save_action.clone(),
            preview_action: config.preview_action.clone(),
        })
    }

    /// Fetch a preview after each successful save
    pub fn with_preview(mut self, cache: PreviewCache, artifact_path: PathBuf) -> Self {
        self.preview = Some(PreviewTarget {
            cache,
            artifact_path,
        });
        self
    }

    /// Install a freshly parsed template, replacing the previous one
    pub fn set_template(&mut self, template: RequestTemplate) {
        self.template = Some(Arc::new(template));
    }

    pub fn template(&self) -> Option<&RequestTemplate> {
        self.template.as_deref()
    }

    /// Push `content` to the remote service
    ///
    /// Never retries. Failures are logged here and reported in the outcome.
    pub async fn send(&self, content: &str) -> SendOutcome {
        let Some(template) = self.template.as_deref() else {
            warn!("No captured request loaded yet, skipping send");
            return SendOutcome::NotReady;
        };

        let params = render_parameters(template.base_parameters(), content);
        let (status, body) = match self.dispatch(template, &params).await {
            Ok(response) => response,
            Err(e) => {
                error!("Error sending template: {}", e);
                return SendOutcome::TransportError(e);
            }
        };

        match classify(status, &body) {
            Ok(()) => info!("Template sent successfully"),
            Err(Error::Application { message }) => {
                error!("Error sending template: {}", message);
                return SendOutcome::ApplicationError { message };
            }
            Err(e) => {
                error!("Error sending template: {}", e);
                return SendOutcome::TransportError(e);
            }
        }

        let preview = match self.preview.as_ref() {
            Some(target) => match self.fetch_preview(template, &params, target).await {
                Ok(generated_at) => Some(generated_at),
                Err(e) => {
                    warn!("Preview failed: {}", e);
                    None
                }
            },
            None => None,
        };

        SendOutcome::Success { preview }
    }

    async fn fetch_preview(
        &self,
        template: &RequestTemplate,
        params: &Parameters,
        target: &PreviewTarget,
    ) -> Result<DateTime<Utc>> {
        let params = preview_parameters(params, &self.save_action, &self.preview_action);
        let (status, body) = self.dispatch(template, &params).await?;
        classify(status, &body)?;

        if let Err(e) = tokio::fs::write(&target.artifact_path, &body).await {
            warn!(
                "Could not write {}: {}",
                target.artifact_path.display(),
                e
            );
        }

        let generated_at = target.cache.store(body);
        info!("Preview updated");
        Ok(generated_at)
    }

    async fn dispatch(
        &self,
        template: &RequestTemplate,
        params: &Parameters,
    ) -> Result<(StatusCode, Bytes)> {
        let invocation = template.invocation(params)?;
        self.execute(&invocation).await
    }

    async fn execute(&self, invocation: &Invocation) -> Result<(StatusCode, Bytes)> {
        let method = Method::from_bytes(invocation.method.as_bytes())
            .map_err(|_| Error::Parse(format!("invalid method '{}'", invocation.method)))?;
        debug!("{} {}", method, invocation.url);

        let mut request = self.client.request(method, &invocation.url);
        for (name, value) in &invocation.headers {
            if SKIPPED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
                continue;
            }
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => request = request.header(name, value),
                _ => warn!("Skipping invalid captured header '{}'", name),
            }
        }
        if let Some(body) = &invocation.body {
            request = request.body(body.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok((status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{decode_parameters, encode_parameters};

    #[test]
    fn test_classify_envelope() {
        assert!(classify(StatusCode::OK, br#"{"errorMessage":""}"#).is_ok());

        let err = classify(StatusCode::OK, br#"{"errorMessage":"bad xml"}"#).unwrap_err();
        assert!(matches!(err, Error::Application { ref message } if message == "bad xml"));
    }

    #[test]
    fn test_classify_non_json_success() {
        assert!(classify(StatusCode::OK, b"<html>saved</html>").is_ok());
        assert!(classify(StatusCode::OK, b"").is_ok());
        assert!(classify(StatusCode::OK, br#"{"status":"ok"}"#).is_ok());
        assert!(classify(StatusCode::OK, br#"{"errorMessage":null}"#).is_ok());
    }

    #[test]
    fn test_classify_transport_failure() {
        let err = classify(StatusCode::INTERNAL_SERVER_ERROR, br#"{"errorMessage":""}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transport {
                status: StatusCode::INTERNAL_SERVER_ERROR
            }
        ));
    }

    #[test]
    fn test_render_overrides_captured_keys() {
        let base = decode_parameters(
            "action=SAVE_EDIT&template=old&source-template=src&wysiwyg-template=wys&id=7",
        )
        .unwrap();
        let params = render_parameters(&base, "NEW");

        assert_eq!(params[TEMPLATE_KEY], "NEW");
        assert_eq!(params["source-template"], "");
        assert_eq!(params["wysiwyg-template"], "");
        // Captured keys keep their positions
        assert_eq!(
            encode_parameters(&params),
            "action=SAVE_EDIT&template=NEW&source-template=&wysiwyg-template=&id=7"
        );
    }

    #[test]
    fn test_render_appends_missing_keys() {
        let base = decode_parameters("action=SAVE_EDIT&body=template%3Dold").unwrap();
        let body = encode_parameters(&render_parameters(&base, "NEW"));

        assert_eq!(
            body,
            "action=SAVE_EDIT&body=template%3Dold&template=NEW&source-template=&wysiwyg-template="
        );
        assert!(body.contains("template=NEW"));
        assert!(!body.contains("template=old"));
    }

    #[test]
    fn test_preview_parameters_swap_action() {
        let params = decode_parameters("action=SAVE_EDIT&id=7&template=x").unwrap();
        let preview = preview_parameters(&params, "SAVE_EDIT", "PREVIEW");

        assert_eq!(preview["action"], "PREVIEW");
        assert_eq!(preview["id"], "7");
        assert_eq!(preview["template"], "x");
    }

    #[tokio::test]
    async fn test_send_without_template() {
        let engine = ReplayEngine::new(&Config::default()).unwrap();
        assert!(matches!(engine.send("x").await, SendOutcome::NotReady));
    }
}
