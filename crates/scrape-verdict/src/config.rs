//! Validator configuration: thresholds, required fields, content bound and
//! quality factor weights.

use serde::{Deserialize, Serialize};

use crate::types::{VerdictError, VerdictResult};

/// Default minimum quality score for a successful verdict.
pub const DEFAULT_MIN_QUALITY_SCORE: f64 = 0.7;

/// Default bound on inspected response content, in characters.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 10_000;

/// Environment variable overriding [`ValidatorConfig::min_quality_score`].
pub const ENV_MIN_QUALITY_SCORE: &str = "SCRAPER_MIN_DATA_QUALITY_SCORE";

/// Environment variable overriding [`ValidatorConfig::required_fields`]
/// (comma-separated).
pub const ENV_REQUIRED_FIELDS: &str = "SCRAPER_MIN_REQUIRED_FIELDS";

/// Environment variable overriding [`ValidatorConfig::max_content_chars`].
pub const ENV_MAX_CONTENT_SIZE: &str = "SCRAPER_MAX_CONTENT_SIZE";

/// Weights of the quality factors. Must be non-negative and sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub title_completeness: f64,
    pub title_quality: f64,
    pub price_completeness: f64,
    pub price_validity: f64,
    pub field_diversity: f64,
    pub consistency: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            title_completeness: 0.3,
            title_quality: 0.2,
            price_completeness: 0.2,
            price_validity: 0.1,
            field_diversity: 0.1,
            consistency: 0.1,
        }
    }
}

impl QualityWeights {
    fn as_array(&self) -> [f64; 6] {
        [
            self.title_completeness,
            self.title_quality,
            self.price_completeness,
            self.price_validity,
            self.field_diversity,
            self.consistency,
        ]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

/// Configuration for a [`crate::Validator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub min_quality_score: f64,
    pub required_fields: Vec<String>,
    pub max_content_chars: usize,
    pub weights: QualityWeights,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_quality_score: DEFAULT_MIN_QUALITY_SCORE,
            required_fields: vec!["title".to_string()],
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            weights: QualityWeights::default(),
        }
    }
}

impl ValidatorConfig {
    /// Defaults overridden by `SCRAPER_*` environment variables, then
    /// sanitized.
    pub fn from_env() -> Self {
        Self::default()
            .with_overrides(|key| std::env::var(key).ok())
            .sanitized()
    }

    /// Apply string overrides from any key lookup (environment, CLI flags).
    /// Unparsable values are ignored with a warning.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MIN_QUALITY_SCORE) {
            match raw.trim().parse::<f64>() {
                Ok(v) => self.min_quality_score = v,
                Err(_) => tracing::warn!("Ignoring unparsable {ENV_MIN_QUALITY_SCORE}={raw}"),
            }
        }

        if let Some(raw) = lookup(ENV_REQUIRED_FIELDS) {
            self.required_fields = split_fields(&raw);
        }

        if let Some(raw) = lookup(ENV_MAX_CONTENT_SIZE) {
            match raw.trim().parse::<usize>() {
                Ok(v) => self.max_content_chars = v,
                Err(_) => tracing::warn!("Ignoring unparsable {ENV_MAX_CONTENT_SIZE}={raw}"),
            }
        }

        self
    }

    /// Replace out-of-range values with their defaults, logging each fallback.
    pub fn sanitized(mut self) -> Self {
        if !(0.0..=1.0).contains(&self.min_quality_score) {
            tracing::warn!(
                "Invalid min_quality_score {}, using default {DEFAULT_MIN_QUALITY_SCORE}",
                self.min_quality_score
            );
            self.min_quality_score = DEFAULT_MIN_QUALITY_SCORE;
        }

        self.required_fields = self
            .required_fields
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        if self.required_fields.is_empty() {
            tracing::warn!("No required fields specified, using default [\"title\"]");
            self.required_fields = vec!["title".to_string()];
        }

        if self.max_content_chars == 0 {
            tracing::warn!(
                "Invalid max_content_chars 0, using default {DEFAULT_MAX_CONTENT_CHARS}"
            );
            self.max_content_chars = DEFAULT_MAX_CONTENT_CHARS;
        }

        if self.validate_weights().is_err() {
            tracing::warn!("Invalid quality weights {:?}, using defaults", self.weights);
            self.weights = QualityWeights::default();
        }

        self
    }

    /// Strict check used at engine construction.
    pub fn validate(&self) -> VerdictResult<()> {
        if !(0.0..=1.0).contains(&self.min_quality_score) {
            return Err(VerdictError::InvalidConfig(format!(
                "min_quality_score must be in [0, 1], got {}",
                self.min_quality_score
            )));
        }
        if self.max_content_chars == 0 {
            return Err(VerdictError::InvalidConfig(
                "max_content_chars must be positive".into(),
            ));
        }
        self.validate_weights()
    }

    fn validate_weights(&self) -> VerdictResult<()> {
        let weights = self.weights.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(VerdictError::InvalidConfig(
                "quality weights must be finite and non-negative".into(),
            ));
        }
        let total = self.weights.total();
        if (total - 1.0).abs() > 1e-6 {
            return Err(VerdictError::InvalidConfig(format!(
                "quality weights must sum to 1.0, got {total}"
            )));
        }
        Ok(())
    }
}

/// Split a comma-separated field list, dropping blanks.
pub fn split_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}
