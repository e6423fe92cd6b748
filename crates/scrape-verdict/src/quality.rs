//! Weighted data-quality scoring for extracted records.
//!
//! Five factors feed the score: title completeness and title quality, price
//! completeness and price validity, field diversity, and cross-record
//! consistency. Weights come from [`QualityWeights`] and sum to 1.0, so the
//! score stays in `[0.0, 1.0]`.
//!
//! Two gates run before any weighting: an empty record list and a required
//! field that is never filled both fail immediately, without a score.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::config::{QualityWeights, ValidatorConfig};
use crate::types::{
    FieldCompleteness, QualityFactors, QualityStats, ScrapedRecord, VerdictError, VerdictResult,
};

/// Fields every product record is expected to carry.
pub const CANONICAL_FIELDS: [&str; 6] = [
    "title",
    "price",
    "description",
    "image_url",
    "stock_availability",
    "sku",
];

/// Values that mean "nothing was extracted".
const PLACEHOLDER_VALUES: [&str; 4] = ["", "None", "null", "N/A"];

/// Consistency when neither image domains nor price types can be compared.
const DEFAULT_CONSISTENCY: f64 = 0.8;

/// Result of scoring one batch of records.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityAssessment {
    pub is_valid: bool,
    pub quality_score: f64,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: QualityStats,
}

impl QualityAssessment {
    fn rejected(issue: String, stats: QualityStats) -> Self {
        Self {
            is_valid: false,
            quality_score: 0.0,
            issues: vec![issue],
            warnings: Vec::new(),
            stats,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DataQualityScorer<'a> {
    required_fields: &'a [String],
    min_quality_score: f64,
    weights: QualityWeights,
}

impl<'a> DataQualityScorer<'a> {
    pub fn new(config: &'a ValidatorConfig) -> Self {
        Self {
            required_fields: &config.required_fields,
            min_quality_score: config.min_quality_score,
            weights: config.weights,
        }
    }

    pub fn score(&self, records: &[ScrapedRecord]) -> VerdictResult<QualityAssessment> {
        if records.is_empty() {
            return Ok(QualityAssessment::rejected(
                "No scraped data provided for validation".to_string(),
                QualityStats::default(),
            ));
        }

        let field_completeness: Vec<(String, FieldCompleteness)> = CANONICAL_FIELDS
            .iter()
            .map(|field| (field.to_string(), completeness(records, field)))
            .collect();
        let lookup = |field: &str| {
            field_completeness
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, c)| *c)
                .unwrap_or_else(|| completeness(records, field))
        };

        let mut stats = QualityStats {
            total_items: records.len(),
            field_completeness: field_completeness.clone(),
            factors: None,
            quality_score: 0.0,
        };

        let missing: Vec<&str> = self
            .required_fields
            .iter()
            .map(String::as_str)
            .filter(|field| lookup(*field).count == 0)
            .collect();
        if !missing.is_empty() {
            return Ok(QualityAssessment::rejected(
                format!("Missing required fields: {missing:?}"),
                stats,
            ));
        }

        let factors = QualityFactors {
            title_completeness: lookup("title").completeness,
            title_quality: title_quality(records),
            price_completeness: lookup("price").completeness,
            price_validity: price_validity(records),
            field_diversity: field_completeness
                .iter()
                .filter(|(_, c)| c.completeness > 0.0)
                .count() as f64
                / CANONICAL_FIELDS.len() as f64,
            consistency: consistency(records),
        };

        let w = &self.weights;
        let raw_score = factors.title_completeness * w.title_completeness
            + factors.title_quality * w.title_quality
            + factors.price_completeness * w.price_completeness
            + factors.price_validity * w.price_validity
            + factors.field_diversity * w.field_diversity
            + factors.consistency * w.consistency;
        if !raw_score.is_finite() {
            return Err(VerdictError::NonFiniteScore {
                stage: "data quality",
            });
        }
        let quality_score = raw_score.clamp(0.0, 1.0);

        stats.factors = Some(factors);
        stats.quality_score = quality_score;

        let is_valid = quality_score >= self.min_quality_score;
        let mut issues = Vec::new();
        if !is_valid {
            issues.push(format!(
                "Data quality score {quality_score:.2} is below threshold {:.2}",
                self.min_quality_score
            ));
        }

        let mut warnings = Vec::new();
        if quality_score < 0.9 {
            warnings.push(format!("Data quality score is moderate: {quality_score:.2}"));
        }
        if factors.title_completeness < 0.8 {
            warnings.push(format!(
                "Title completeness is low: {:.2}",
                factors.title_completeness
            ));
        }
        if factors.price_completeness < 0.5 {
            warnings.push(format!(
                "Price completeness is low: {:.2}",
                factors.price_completeness
            ));
        }

        tracing::debug!(
            "Scored {} records: {quality_score:.3} (valid: {is_valid})",
            records.len()
        );

        Ok(QualityAssessment {
            is_valid,
            quality_score,
            issues,
            warnings,
            stats,
        })
    }
}

// ── Field helpers ────────────────────────────────────────────────────────────

/// Render a JSON value the way it would appear in a CSV cell.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_filled(value: &Value) -> bool {
    let text = value_text(value);
    !PLACEHOLDER_VALUES.contains(&text.trim())
}

fn completeness(records: &[ScrapedRecord], field: &str) -> FieldCompleteness {
    let count = records
        .iter()
        .filter(|r| r.get(field).is_some_and(is_filled))
        .count();
    FieldCompleteness {
        completeness: count as f64 / records.len() as f64,
        count,
    }
}

// ── Title quality ────────────────────────────────────────────────────────────

fn is_placeholder_title(lowered: &str) -> bool {
    lowered.is_empty()
        || matches!(lowered, "title" | "product" | "item")
        || ["loading", "undefined", "null", "none"]
            .iter()
            .any(|p| lowered.starts_with(p))
        || lowered.chars().all(|c| c.is_ascii_digit())
}

/// 0.5 × share of real titles + 0.3 × length score + 0.2 × distinctness.
fn title_quality(records: &[ScrapedRecord]) -> f64 {
    let titles: Vec<String> = records
        .iter()
        .filter_map(|r| r.get("title"))
        .map(value_text)
        .filter(|t| !t.is_empty())
        .collect();
    if titles.is_empty() {
        return 0.0;
    }
    let total = titles.len() as f64;

    let normalized: Vec<String> = titles.iter().map(|t| t.trim().to_lowercase()).collect();

    let real = normalized
        .iter()
        .filter(|t| !is_placeholder_title(t) && t.chars().count() > 3)
        .count() as f64;
    let basic_quality = real / total;

    let avg_length = titles.iter().map(|t| t.chars().count()).sum::<usize>() as f64 / total;
    let length_quality = ((avg_length - 5.0) / 50.0).clamp(0.0, 1.0);

    let diversity_quality = if titles.len() > 1 {
        normalized.iter().collect::<HashSet<_>>().len() as f64 / total
    } else {
        1.0
    };

    basic_quality * 0.5 + length_quality * 0.3 + diversity_quality * 0.2
}

// ── Price validity ───────────────────────────────────────────────────────────

/// Parse a price string, stripping currency symbols, thousands separators and
/// whitespace. Handles both `1,234.56` and `1.234,56`.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let (negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    if unsigned.contains('-') || !unsigned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    // Both present: the last one is the decimal separator.
    let normalized = if unsigned.contains(',') && unsigned.contains('.') {
        if unsigned.rfind(',') > unsigned.rfind('.') {
            unsigned.replace('.', "").replace(',', ".")
        } else {
            unsigned.replace(',', "")
        }
    } else if unsigned.contains(',') {
        let after_comma = unsigned.split(',').next_back().unwrap_or("");
        if after_comma.len() <= 2 {
            unsigned.replace(',', ".")
        } else {
            unsigned.replace(',', "")
        }
    } else {
        unsigned.to_string()
    };

    let value = normalized.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if negative { -value } else { value })
}

fn is_valid_price(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64().is_some_and(|v| v.is_finite() && v >= 0.0),
        Value::String(s) => parse_price_text(s).is_some_and(|v| v >= 0.0),
        _ => false,
    }
}

fn price_validity(records: &[ScrapedRecord]) -> f64 {
    let prices: Vec<&Value> = records.iter().filter_map(|r| r.get("price")).collect();
    if prices.is_empty() {
        return 0.0;
    }
    prices.iter().filter(|p| is_valid_price(p)).count() as f64 / prices.len() as f64
}

// ── Consistency ──────────────────────────────────────────────────────────────

fn image_domain(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let parsed = if raw.starts_with("//") {
        url::Url::parse(&format!("https:{raw}"))
    } else {
        url::Url::parse(raw)
    };
    parsed
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

fn most_common_share<I>(keys: I, total: usize) -> Option<f64>
where
    I: IntoIterator,
    I::Item: Ord,
{
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0usize) += 1;
    }
    let top = counts.values().copied().max()?;
    Some(top as f64 / total as f64)
}

fn price_representation(value: &Value) -> &'static str {
    match value {
        Value::Number(_) => "numeric",
        Value::String(_) => "text",
        _ => "other",
    }
}

/// Average of image-domain and price-type agreement across records.
fn consistency(records: &[ScrapedRecord]) -> f64 {
    if records.len() < 2 {
        return 1.0;
    }

    let mut factors = Vec::with_capacity(2);

    let image_urls: Vec<String> = records
        .iter()
        .filter_map(|r| r.get("image_url"))
        .filter(|v| is_filled(v))
        .map(value_text)
        .collect();
    if !image_urls.is_empty() {
        let domains = image_urls.iter().filter_map(|u| image_domain(u));
        if let Some(share) = most_common_share(domains, image_urls.len()) {
            factors.push(share);
        }
    }

    let prices: Vec<&Value> = records.iter().filter_map(|r| r.get("price")).collect();
    if prices.len() > 1 {
        let kinds = prices.iter().map(|p| price_representation(p));
        if let Some(share) = most_common_share(kinds, prices.len()) {
            factors.push(share);
        }
    }

    if factors.is_empty() {
        DEFAULT_CONSISTENCY
    } else {
        factors.iter().sum::<f64>() / factors.len() as f64
    }
}
