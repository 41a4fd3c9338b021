//! Captured request parsing
//!
//! Turns the text of a browser "Copy as fetch" capture into a reusable
//! [`RequestTemplate`]: the capture with its body replaced by a placeholder,
//! plus the decoded form parameters of the original body.
//!
//! ```text
//! fetch("https://example.com/app/pdftemplate.nl?id=12", {
//!   "headers": { "content-type": "application/x-www-form-urlencoded" },
//!   "body": "action=SAVE_EDIT&id=12&template=%3Cpdf%2F%3E",
//!   "method": "POST"
//! });
//! ```

use std::borrow::Cow;
use std::sync::OnceLock;

use indexmap::IndexMap;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Token standing in for the request body inside an invocation template
pub const BODY_PLACEHOLDER: &str = "%BODY%";

/// Form parameters in the order they appeared in the capture
pub type Parameters = IndexMap<String, String>;

/// Characters left alone by browser `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn body_field() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""body"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("body field pattern is valid")
    })
}

fn fetch_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"fetch\s*\(\s*"((?:[^"\\]|\\.)*)"\s*"#).expect("fetch call pattern is valid")
    })
}

/// A captured request ready to be replayed with a new body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    invocation_template: String,
    base_parameters: Parameters,
}

impl RequestTemplate {
    /// Parse raw capture text
    ///
    /// Fails when the capture has no quoted `"body"` field, when the
    /// placeholder token already occurs in it, or when the result does not
    /// describe a `fetch(url, options)` call.
    pub fn parse(raw: &str) -> Result<Self> {
        let caps = body_field()
            .captures(raw)
            .ok_or_else(|| Error::Parse("no \"body\" field found in capture".to_string()))?;
        let Some(value) = caps.get(1) else {
            return Err(Error::Parse("empty \"body\" match".to_string()));
        };

        let invocation_template = format!(
            "{}{}{}",
            &raw[..value.start()],
            BODY_PLACEHOLDER,
            &raw[value.end()..]
        );
        if invocation_template.matches(BODY_PLACEHOLDER).count() != 1 {
            return Err(Error::Parse(format!(
                "capture already contains the {} token",
                BODY_PLACEHOLDER
            )));
        }

        let template = Self {
            invocation_template,
            base_parameters: decode_parameters(value.as_str())?,
        };

        // Surface malformed captures now instead of on every save
        template.invocation(&template.base_parameters)?;

        Ok(template)
    }

    /// Capture text with the body replaced by [`BODY_PLACEHOLDER`]
    pub fn invocation_template(&self) -> &str {
        &self.invocation_template
    }

    /// Form parameters decoded from the captured body
    pub fn base_parameters(&self) -> &Parameters {
        &self.base_parameters
    }

    /// Substitute an encoded body built from `params` into the template
    pub fn render(&self, params: &Parameters) -> String {
        self.invocation_template
            .replacen(BODY_PLACEHOLDER, &encode_parameters(params), 1)
    }

    /// Structured request for `params`
    pub fn invocation(&self, params: &Parameters) -> Result<Invocation> {
        Invocation::from_text(&self.render(params))
    }
}

/// Decode an `&`-joined form body
///
/// Each pair is split on its first `=` only. Keys and values are
/// percent-decoded; `+` is kept literally. A repeated key keeps its first
/// position and takes the last value. Escapes that do not decode to UTF-8
/// are rejected, since re-encoding them would change the body.
pub fn decode_parameters(body: &str) -> Result<Parameters> {
    let mut params = Parameters::new();
    for pair in body.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(decode(key)?, decode(value)?);
    }
    Ok(params)
}

/// Encode parameters as an `&`-joined form body
pub fn encode_parameters(params: &Parameters) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, URI_COMPONENT),
                utf8_percent_encode(value, URI_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn decode(s: &str) -> Result<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| Error::Parse(format!("'{}' does not decode to UTF-8 text", s)))
}

/// Options object of a captured `fetch` call
#[derive(Debug, Default, Deserialize)]
struct FetchOptions {
    #[serde(default)]
    headers: IndexMap<String, String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

/// A concrete request read out of a rendered invocation template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Invocation {
    /// Read a `fetch("<url>", { ... })` description
    ///
    /// Only `headers`, `method` and `body` are used from the options object.
    /// Anything after the closing parenthesis, such as a chained `.then(...)`,
    /// is ignored.
    pub fn from_text(text: &str) -> Result<Self> {
        let caps = fetch_call()
            .captures(text)
            .ok_or_else(|| Error::Parse("capture is not a fetch(...) call".to_string()))?;

        let raw_url = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let url: String = serde_json::from_str(&format!("\"{}\"", raw_url))
            .map_err(|e| Error::Parse(format!("invalid request URL: {}", e)))?;
        if url.is_empty() {
            return Err(Error::Parse("request URL is empty".to_string()));
        }

        let rest = &text[caps.get(0).map_or(0, |m| m.end())..];
        let (options, rest) = match rest.strip_prefix(',') {
            Some(after) => read_options(after.trim_start())?,
            None => (FetchOptions::default(), rest),
        };
        if !rest.trim_start().starts_with(')') {
            return Err(Error::Parse(
                "fetch(...) call is not closed after its options object".to_string(),
            ));
        }

        let method = options
            .method
            .map(|m| m.to_ascii_uppercase())
            .unwrap_or_else(|| {
                if options.body.is_some() {
                    "POST".to_string()
                } else {
                    "GET".to_string()
                }
            });

        Ok(Self {
            url,
            method,
            headers: options.headers.into_iter().collect(),
            body: options.body,
        })
    }
}

/// Parse the options object at the start of `text`, returning the remainder
fn read_options(text: &str) -> Result<(FetchOptions, &str)> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<FetchOptions>();
    let options = match stream.next() {
        Some(Ok(options)) => options,
        Some(Err(e)) => return Err(Error::Parse(format!("invalid fetch options: {}", e))),
        None => return Err(Error::Parse("fetch options are missing".to_string())),
    };
    Ok((options, &text[stream.byte_offset()..]))
}
