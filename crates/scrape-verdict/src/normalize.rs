//! Turns partial, heterogeneous response data into a bounded
//! [`ResponseSnapshot`].
//!
//! Collectors differ in what they can report: an HTTP client knows status and
//! headers, a browser-automation layer may only know the final URL and the
//! rendered HTML. Every missing piece takes a safe default (`0` / empty) and
//! nothing here ever fails.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::DEFAULT_MAX_CONTENT_CHARS;
use crate::types::ResponseSnapshot;

/// Caller-supplied response data. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub status_code: Option<u16>,
    /// Header `(name, value)` pairs in any casing.
    pub headers: Vec<(String, String)>,
    pub content: Option<String>,
    /// Final URL after redirects.
    pub url: Option<String>,
    /// Request duration in seconds.
    pub elapsed: Option<f64>,
}

impl RawResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn elapsed(mut self, seconds: f64) -> Self {
        self.elapsed = Some(seconds);
        self
    }

    /// Leniently read response data from any JSON value.
    ///
    /// Non-object input yields an empty response. Recognised keys:
    /// `status_code` (or `status`), `headers` (object or list of
    /// `[name, value]` pairs), `content` (or `body`), `url` (or `final_url`),
    /// `elapsed` (or `response_time`). Values of the wrong type are ignored.
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let field = |keys: &[&str]| keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()));

        Self {
            status_code: field(&["status_code", "status"]).map(coerce_status),
            headers: field(&["headers"]).map(coerce_headers).unwrap_or_default(),
            content: field(&["content", "body"]).and_then(|v| v.as_str().map(String::from)),
            url: field(&["url", "final_url"]).and_then(|v| v.as_str().map(String::from)),
            elapsed: field(&["elapsed", "response_time"])
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite()),
        }
    }
}

/// Status as JSON number or numeric string; anything out of range is `0`.
fn coerce_status(value: &Value) -> u16 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .and_then(|n| u16::try_from(n).ok())
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<u16>().unwrap_or(0),
        _ => 0,
    }
}

fn coerce_headers(value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), render_header_value(v)))
            .collect(),
        Value::Array(pairs) => pairs
            .iter()
            .filter_map(|pair| match pair.as_array().map(Vec::as_slice) {
                Some([Value::String(name), value]) => Some((name.clone(), render_header_value(value))),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn render_header_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Produces snapshots with lower-cased header names and bounded content.
#[derive(Debug, Clone, Copy)]
pub struct ResponseNormalizer {
    max_content_chars: usize,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTENT_CHARS)
    }
}

impl ResponseNormalizer {
    pub fn new(max_content_chars: usize) -> Self {
        Self { max_content_chars }
    }

    pub fn max_content_chars(&self) -> usize {
        self.max_content_chars
    }

    pub fn normalize(&self, raw: RawResponse) -> ResponseSnapshot {
        let mut headers = BTreeMap::new();
        for (name, value) in raw.headers {
            let name = name.trim().to_ascii_lowercase();
            if !name.is_empty() {
                headers.insert(name, value);
            }
        }

        let content = truncate_chars(raw.content.unwrap_or_default(), self.max_content_chars);

        ResponseSnapshot {
            status_code: raw.status_code.unwrap_or(0),
            headers,
            content,
            url: raw.url.unwrap_or_default(),
            elapsed: raw.elapsed.filter(|v| v.is_finite()),
        }
    }

    /// Shorthand for `normalize(RawResponse::from_json(value))`.
    pub fn normalize_json(&self, value: &Value) -> ResponseSnapshot {
        self.normalize(RawResponse::from_json(value))
    }
}

/// Cut `text` to at most `max` characters, on a char boundary.
fn truncate_chars(mut text: String, max: usize) -> String {
    if let Some((byte_idx, _)) = text.char_indices().nth(max) {
        tracing::debug!(
            "Truncating response content from {} bytes to {max} characters",
            text.len()
        );
        text.truncate(byte_idx);
    }
    text
}
