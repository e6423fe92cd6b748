//! Core data types for scrape verdicts.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Why a scrape attempt was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[default]
    None,
    HttpError,
    Captcha,
    LoginRequired,
    AccessDenied,
    RateLimited,
    GeographicBlock,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::None => "none",
            BlockKind::HttpError => "http_error",
            BlockKind::Captcha => "captcha",
            BlockKind::LoginRequired => "login_required",
            BlockKind::AccessDenied => "access_denied",
            BlockKind::RateLimited => "rate_limited",
            BlockKind::GeographicBlock => "geographic_block",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known anti-bot / edge protection systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotVendor {
    Cloudflare,
    Akamai,
    Perimeterx,
    Incapsula,
    Distil,
    Datadome,
    Fastly,
    CustomSystem,
}

impl BotVendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotVendor::Cloudflare => "cloudflare",
            BotVendor::Akamai => "akamai",
            BotVendor::Perimeterx => "perimeterx",
            BotVendor::Incapsula => "incapsula",
            BotVendor::Distil => "distil",
            BotVendor::Datadome => "datadome",
            BotVendor::Fastly => "fastly",
            BotVendor::CustomSystem => "custom_system",
        }
    }
}

impl fmt::Display for BotVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized, bounded view of one fetch attempt.
///
/// Only [`crate::normalize::ResponseNormalizer`] builds snapshots, so the
/// content bound and lower-cased header names always hold.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    pub(crate) status_code: u16,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) content: String,
    pub(crate) url: String,
    pub(crate) elapsed: Option<f64>,
}

impl ResponseSnapshot {
    /// HTTP status code, `0` when unknown.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// All headers, keyed by lower-cased name.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Final URL after redirects.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request duration in seconds, if the collector measured it.
    pub fn elapsed(&self) -> Option<f64> {
        self.elapsed
    }
}

/// One extracted item: field name to JSON value.
///
/// Extra fields are carried along untouched; scoring only looks at the
/// canonical product fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScrapedRecord(Map<String, Value>);

impl ScrapedRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Get a field value. JSON `null` counts as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for ScrapedRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ScrapedRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Completeness of one canonical field across all records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldCompleteness {
    pub completeness: f64,
    pub count: usize,
}

/// The five weighted quality factors (title is split in two, as is price).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityFactors {
    pub title_completeness: f64,
    pub title_quality: f64,
    pub price_completeness: f64,
    pub price_validity: f64,
    pub field_diversity: f64,
    pub consistency: f64,
}

/// Statistics gathered while scoring extracted records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityStats {
    pub total_items: usize,
    /// Per canonical field, in canonical order.
    pub field_completeness: Vec<(String, FieldCompleteness)>,
    /// Present only when scoring got past the required-field gate.
    pub factors: Option<QualityFactors>,
    pub quality_score: f64,
}

/// Introspection data attached to every verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerdictMetadata {
    pub block_kind: BlockKind,
    pub block_confidence: f64,
    pub bot_confidence: Option<f64>,
    pub bot_indicators: Vec<String>,
    pub quality: Option<QualityStats>,
}

/// Aggregated verdict for one scrape attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_successful: bool,
    pub is_blocked: bool,
    pub bot_vendor: Option<BotVendor>,
    /// Overall trust in this verdict, in `[0.0, 1.0]`.
    pub confidence: f64,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub metadata: VerdictMetadata,
}

impl ValidationResult {
    /// Verdict for a validation run that hit an internal fault.
    pub fn failed(error: &VerdictError) -> Self {
        Self {
            is_successful: false,
            is_blocked: false,
            bot_vendor: None,
            confidence: 0.0,
            issues: vec![format!("Validation failed: {error}")],
            warnings: Vec::new(),
            metadata: VerdictMetadata::default(),
        }
    }

    pub fn block_kind(&self) -> BlockKind {
        self.metadata.block_kind
    }
}

/// Errors that can occur in the verdict engine.
#[derive(thiserror::Error, Debug)]
pub enum VerdictError {
    #[error("Signature pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Signature document error: {0}")]
    Signatures(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Non-finite score produced by {stage}")]
    NonFiniteScore { stage: &'static str },
}

/// Convenience result type.
pub type VerdictResult<T> = Result<T, VerdictError>;
