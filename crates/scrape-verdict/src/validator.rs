//! The verdict engine: runs block detection, vendor identification and
//! data-quality scoring over one scrape attempt and folds them into a single
//! [`ValidationResult`].

use std::sync::Arc;

use crate::block::{BlockAnalysis, BlockDetector};
use crate::bot::{BotDetection, BotSystemIdentifier};
use crate::config::ValidatorConfig;
use crate::normalize::{RawResponse, ResponseNormalizer};
use crate::quality::{DataQualityScorer, QualityAssessment};
use crate::registry::SignatureRegistry;
use crate::types::{
    ResponseSnapshot, ScrapedRecord, ValidationResult, VerdictError, VerdictMetadata,
    VerdictResult,
};

/// Stateless between calls; safe to share across threads.
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidatorConfig,
    registry: Arc<SignatureRegistry>,
    normalizer: ResponseNormalizer,
}

impl Validator {
    /// Build a validator over the process-wide built-in signatures.
    pub fn new(config: ValidatorConfig) -> VerdictResult<Self> {
        Self::with_registry(config, SignatureRegistry::shared()?)
    }

    pub fn with_registry(
        config: ValidatorConfig,
        registry: Arc<SignatureRegistry>,
    ) -> VerdictResult<Self> {
        config.validate()?;
        let normalizer = ResponseNormalizer::new(config.max_content_chars);
        Ok(Self {
            config,
            registry,
            normalizer,
        })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &SignatureRegistry {
        &self.registry
    }

    /// The normalizer bounded by this validator's `max_content_chars`.
    pub fn normalizer(&self) -> &ResponseNormalizer {
        &self.normalizer
    }

    /// Validate one scrape attempt. Never fails: an internal fault becomes an
    /// unsuccessful verdict with zero confidence.
    pub fn validate(&self, snapshot: &ResponseSnapshot, records: &[ScrapedRecord]) -> ValidationResult {
        match self.try_validate(snapshot, records) {
            Ok(result) => {
                tracing::info!(
                    "Validation complete: success={}, blocked={}, bot_vendor={}, confidence={:.2}",
                    result.is_successful,
                    result.is_blocked,
                    result.bot_vendor.map_or("none", |v| v.as_str()),
                    result.confidence
                );
                result
            }
            Err(e) => {
                tracing::error!("Validation error: {e}");
                ValidationResult::failed(&e)
            }
        }
    }

    /// Normalize `raw` with this validator's content bound, then validate.
    pub fn validate_raw(&self, raw: RawResponse, records: &[ScrapedRecord]) -> ValidationResult {
        let snapshot = self.normalizer.normalize(raw);
        self.validate(&snapshot, records)
    }

    /// Blocking verdict only; vendor identification and scoring are skipped.
    pub fn quick_block_check<I, K, V>(&self, status_code: u16, headers: I, content: &str) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let raw = headers
            .into_iter()
            .fold(RawResponse::new().status(status_code).content(content), |raw, (k, v)| {
                raw.header(k, v)
            });
        let snapshot = self.normalizer.normalize(raw);
        BlockDetector::new(&self.registry).analyze(&snapshot).is_blocked
    }

    fn try_validate(
        &self,
        snapshot: &ResponseSnapshot,
        records: &[ScrapedRecord],
    ) -> VerdictResult<ValidationResult> {
        let block = BlockDetector::new(&self.registry).analyze(snapshot);
        let bot = BotSystemIdentifier::new(&self.registry).identify(snapshot);

        let quality = if block.is_blocked {
            None
        } else {
            Some(DataQualityScorer::new(&self.config).score(records)?)
        };

        aggregate(snapshot.status_code(), block, bot, quality)
    }
}

/// HTTP-class contribution to overall confidence.
fn status_confidence(status_code: u16) -> f64 {
    match status_code {
        200..=299 => 0.9,
        400..=499 => 0.8,
        _ => 0.6,
    }
}

/// Fold the stage outputs into one verdict. Overall confidence is the mean of
/// the HTTP-class estimate, the vendor confidence (when one was identified),
/// the consistency factor (when quality factors exist) and an issue-count
/// penalty.
fn aggregate(
    status_code: u16,
    block: BlockAnalysis,
    bot: BotDetection,
    quality: Option<QualityAssessment>,
) -> VerdictResult<ValidationResult> {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let mut is_successful = false;
    let mut quality_stats = None;

    if block.is_blocked {
        issues.extend(block.issues);
    } else if let Some(assessment) = quality {
        is_successful = assessment.is_valid;
        issues.extend(assessment.issues);
        warnings.extend(assessment.warnings);
        quality_stats = Some(assessment.stats);
    }

    let mut factors = vec![status_confidence(status_code)];
    if bot.vendor.is_some() {
        factors.push(bot.confidence);
    }
    if let Some(f) = quality_stats.as_ref().and_then(|s| s.factors) {
        factors.push(f.consistency);
    }
    factors.push((1.0 - 0.1 * issues.len() as f64).max(0.0));

    let mean = factors.iter().sum::<f64>() / factors.len() as f64;
    if !mean.is_finite() {
        return Err(VerdictError::NonFiniteScore {
            stage: "confidence aggregation",
        });
    }

    Ok(ValidationResult {
        is_successful,
        is_blocked: block.is_blocked,
        bot_vendor: bot.vendor,
        confidence: mean.clamp(0.0, 1.0),
        issues,
        warnings,
        metadata: VerdictMetadata {
            block_kind: block.block_kind,
            block_confidence: block.confidence,
            bot_confidence: bot.vendor.map(|_| bot.confidence),
            bot_indicators: bot.indicators,
            quality: quality_stats,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockKind, BotVendor};

    fn validator() -> Validator {
        Validator::new(ValidatorConfig::default()).unwrap()
    }

    fn widgets() -> Vec<ScrapedRecord> {
        vec![
            ScrapedRecord::new().with("title", "Widget A").with("price", 9.99),
            ScrapedRecord::new().with("title", "Widget B").with("price", 19.99),
        ]
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ValidatorConfig {
            min_quality_score: 1.5,
            ..ValidatorConfig::default()
        };
        assert!(matches!(
            Validator::new(config),
            Err(VerdictError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_successful_scrape() {
        let v = validator();
        let result = v.validate_raw(
            RawResponse::new().status(200).content("<html>ok</html>"),
            &widgets(),
        );
        assert!(result.is_successful);
        assert!(!result.is_blocked);
        assert_eq!(result.bot_vendor, None);
        assert_eq!(result.block_kind(), BlockKind::None);
        assert!(result.issues.is_empty());
        // mean of 0.9 (2xx), 1.0 (consistency), 1.0 (no issues)
        assert!((result.confidence - 2.9 / 3.0).abs() < 1e-9);
        assert!(result.metadata.quality.is_some());
    }

    #[test]
    fn test_blocked_skips_quality() {
        let v = validator();
        let result = v.validate_raw(RawResponse::new().status(503), &widgets());
        assert!(result.is_blocked);
        assert!(!result.is_successful);
        assert_eq!(result.block_kind(), BlockKind::HttpError);
        assert!(result.metadata.quality.is_none());
        assert!(result.warnings.is_empty());
        // mean of 0.6 (5xx) and 0.9 (one issue)
        assert!((result.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_bot_confidence_joins_mean() {
        let v = validator();
        let result = v.validate_raw(
            RawResponse::new()
                .status(200)
                .header("cf-ray", "8a1b")
                .content("<html>ok</html>"),
            &widgets(),
        );
        assert_eq!(result.bot_vendor, Some(BotVendor::Cloudflare));
        assert_eq!(result.metadata.bot_confidence, Some(0.9));
        // cf-ray alone never blocks, so its header issue stays out.
        assert!(result.is_successful);
        assert!(result.issues.is_empty());
        assert!((result.confidence - (0.9 + 0.9 + 1.0 + 1.0) / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_records_fail() {
        let v = validator();
        let result = v.validate_raw(RawResponse::new().status(200), &[]);
        assert!(!result.is_successful);
        assert!(!result.is_blocked);
        assert_eq!(result.issues, vec!["No scraped data provided for validation"]);
        assert!((result.confidence - (0.9 + 0.9) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_quick_block_check() {
        let v = validator();
        assert!(v.quick_block_check(429, Vec::<(String, String)>::new(), ""));
        assert!(v.quick_block_check(200, [("X-Foo", "1")], "Please complete the CAPTCHA"));
        assert!(!v.quick_block_check(200, [("Content-Type", "text/html")], "<html>ok</html>"));
    }

    #[test]
    fn test_content_bound_applies() {
        let config = ValidatorConfig {
            max_content_chars: 20,
            ..ValidatorConfig::default()
        };
        let v = Validator::new(config).unwrap();
        let content = format!("{}captcha", "a ".repeat(50));
        let result = v.validate_raw(RawResponse::new().status(200).content(content), &widgets());
        assert!(!result.is_blocked);
    }

    #[test]
    fn test_status_confidence_classes() {
        assert_eq!(status_confidence(204), 0.9);
        assert_eq!(status_confidence(404), 0.8);
        assert_eq!(status_confidence(0), 0.6);
        assert_eq!(status_confidence(302), 0.6);
    }
}
