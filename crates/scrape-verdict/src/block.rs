//! Multi-signal block detection.
//!
//! Five evidence sources are evaluated in a fixed priority order: status
//! code, content phrase categories, high-confidence content patterns, URL
//! shape, suspicious headers. Phrases and content patterns see only the
//! visible page text, never the raw markup. Each source can only raise the
//! running confidence. The reported [`BlockKind`] comes from the single
//! highest-confidence rule that fired; on equal confidence the earlier source
//! wins, so no result depends on the order of categories inside a source.

use scraper::Html;

use crate::registry::SignatureRegistry;
use crate::types::{BlockKind, ResponseSnapshot};

/// Outcome of block detection for one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAnalysis {
    pub is_blocked: bool,
    /// `BlockKind::None` whenever `is_blocked` is false.
    pub block_kind: BlockKind,
    pub issues: Vec<String>,
    pub confidence: f64,
}

/// Running evidence while the detector walks its sources.
#[derive(Debug, Default)]
struct Evidence {
    is_blocked: bool,
    confidence: f64,
    best: Option<(f64, BlockKind)>,
    issues: Vec<String>,
}

impl Evidence {
    fn raise(&mut self, confidence: f64) {
        self.confidence = self.confidence.max(confidence);
    }

    /// Strictly-greater keeps the earlier rule on ties.
    fn propose(&mut self, kind: BlockKind, confidence: f64) {
        if self.best.map_or(true, |(c, _)| confidence > c) {
            self.best = Some((confidence, kind));
        }
    }

    fn block(&mut self, kind: BlockKind, confidence: f64, issue: String) {
        self.is_blocked = true;
        self.raise(confidence);
        self.propose(kind, confidence);
        self.issues.push(issue);
    }

    fn finish(self) -> BlockAnalysis {
        let block_kind = if self.is_blocked {
            self.best.map(|(_, k)| k).unwrap_or(BlockKind::HttpError)
        } else {
            BlockKind::None
        };
        BlockAnalysis {
            is_blocked: self.is_blocked,
            block_kind,
            issues: self.issues,
            confidence: self.confidence,
        }
    }
}

/// Decides whether, and why, a scrape attempt was blocked.
#[derive(Debug, Clone, Copy)]
pub struct BlockDetector<'a> {
    registry: &'a SignatureRegistry,
}

impl<'a> BlockDetector<'a> {
    pub fn new(registry: &'a SignatureRegistry) -> Self {
        Self { registry }
    }

    pub fn analyze(&self, snapshot: &ResponseSnapshot) -> BlockAnalysis {
        let mut evidence = Evidence::default();

        // A classified status code is definitive; nothing else can outrank it.
        if let Some(status) = self.registry.status(snapshot.status_code()) {
            evidence.block(
                status.kind,
                status.confidence,
                format!("HTTP {}: {}", status.code, status.message),
            );
            tracing::debug!("Blocked by status {} ({})", status.code, status.kind);
            return evidence.finish();
        }

        if !snapshot.content().is_empty() {
            let text = visible_text(snapshot.content()).to_lowercase();
            self.scan_phrase_categories(&text, &mut evidence);
            self.scan_content_patterns(&text, &mut evidence);
        }

        self.scan_url(snapshot.url(), &mut evidence);
        self.scan_headers(snapshot, &mut evidence);

        let analysis = evidence.finish();
        if analysis.is_blocked {
            tracing::debug!(
                "Blocked ({}) with confidence {:.2}: {:?}",
                analysis.block_kind,
                analysis.confidence,
                analysis.issues
            );
        }
        analysis
    }

    /// Every category is scanned; within a category the first matching
    /// phrase is reported.
    fn scan_phrase_categories(&self, lowered: &str, evidence: &mut Evidence) {
        for category in self.registry.phrase_categories() {
            if let Some(hit) = category.phrases.iter().find(|p| p.regex.is_match(lowered)) {
                evidence.block(
                    category.kind,
                    category.confidence,
                    format!("Content blocking detected: \"{}\"", hit.phrase),
                );
            }
        }
    }

    fn scan_content_patterns(&self, lowered: &str, evidence: &mut Evidence) {
        for rule in self.registry.content_patterns() {
            if rule.regex.is_match(lowered) {
                evidence.block(
                    rule.kind,
                    rule.confidence,
                    format!("Blocking pattern matched ({}): {}", rule.kind, rule.pattern),
                );
            }
        }
    }

    fn scan_url(&self, url: &str, evidence: &mut Evidence) {
        if url.is_empty() {
            return;
        }
        let path = blocking_path(url);
        let mut matched = false;
        for rule in self.registry.url_patterns() {
            if rule.regex.is_match(&path) {
                evidence.is_blocked = true;
                evidence.raise(rule.confidence);
                evidence.propose(rule.kind, rule.confidence);
                matched = true;
            }
        }
        if matched {
            evidence.issues.push(format!("Redirected to blocking page: {url}"));
        }
    }

    /// Headers are supporting evidence only and never block on their own.
    fn scan_headers(&self, snapshot: &ResponseSnapshot, evidence: &mut Evidence) {
        for indicator in self.registry.suspicious_headers() {
            if snapshot.header(&indicator.name).is_some() {
                evidence.issues.push(indicator.message.clone());
                evidence.raise(indicator.confidence);
                if let Some(kind) = indicator.kind {
                    evidence.propose(kind, indicator.confidence);
                }
            }
        }
    }
}

/// Elements whose text never renders as page copy.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Text a visitor would read: every text node, `<title>` included, outside
/// script-like elements. Markup, attributes and embedded widget URLs are
/// dropped.
fn visible_text(content: &str) -> String {
    let document = Html::parse_document(content);
    let mut text = String::with_capacity(content.len());
    for node in document.tree.root().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(|a| a.value().as_element())
            .any(|e| HIDDEN_ELEMENTS.contains(&e.name()));
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }
    text
}

/// The part of a URL that blocking-page shapes are matched against: the path
/// when the URL parses, otherwise the raw text.
fn blocking_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{RawResponse, ResponseNormalizer};

    fn analyze(raw: RawResponse) -> BlockAnalysis {
        let registry = SignatureRegistry::builtin().unwrap();
        let snapshot = ResponseNormalizer::default().normalize(raw);
        BlockDetector::new(&registry).analyze(&snapshot)
    }

    #[test]
    fn test_status_403_access_denied() {
        let a = analyze(RawResponse::new().status(403));
        assert!(a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::AccessDenied);
        assert!(a.confidence >= 0.9);
        assert_eq!(a.issues, vec!["HTTP 403: Access forbidden"]);
    }

    #[test]
    fn test_status_429_rate_limited() {
        let a = analyze(RawResponse::new().status(429));
        assert_eq!(a.block_kind, BlockKind::RateLimited);
        assert!(a.confidence >= 0.95);
    }

    #[test]
    fn test_status_short_circuits_content() {
        let a = analyze(
            RawResponse::new()
                .status(503)
                .content("please complete the captcha")
                .url("https://example.com/login"),
        );
        assert_eq!(a.block_kind, BlockKind::HttpError);
        assert_eq!(a.issues.len(), 1);
        assert_eq!(a.confidence, 0.8);
    }

    #[test]
    fn test_captcha_content_any_case() {
        let a = analyze(RawResponse::new().status(200).content("<h1>Please solve the CAPTCHA</h1>"));
        assert!(a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::Captcha);
        assert!(a.confidence >= 0.8);
    }

    #[test]
    fn test_all_categories_scanned_max_confidence_wins() {
        // Rate-limit phrase appears alongside a captcha widget; the captcha
        // pattern carries the highest confidence regardless of category order.
        let a = analyze(
            RawResponse::new()
                .status(200)
                .content("Too many requests. Try again later or solve the hCaptcha below."),
        );
        assert!(a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::Captcha);
        assert_eq!(a.confidence, 0.95);
        assert!(a.issues.iter().any(|i| i.contains("too many requests")));
        assert!(a.issues.iter().any(|i| i.contains("hcaptcha")));
    }

    #[test]
    fn test_phrase_only_match() {
        let a = analyze(RawResponse::new().status(200).content("Access Denied for this resource"));
        assert_eq!(a.block_kind, BlockKind::AccessDenied);
        assert_eq!(a.confidence, 0.85);
    }

    #[test]
    fn test_url_does_not_downgrade_content_kind() {
        let a = analyze(
            RawResponse::new()
                .status(200)
                .content("please log in to see prices")
                .url("https://example.com/error"),
        );
        assert_eq!(a.block_kind, BlockKind::LoginRequired);
        assert!(a.issues.iter().any(|i| i.starts_with("Redirected to blocking page")));
    }

    #[test]
    fn test_url_alone_blocks() {
        let a = analyze(RawResponse::new().status(200).url("https://example.com/account/signin?next=/p/1"));
        assert!(a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::LoginRequired);
        assert_eq!(a.confidence, 0.7);
        assert_eq!(a.issues.len(), 1);
    }

    #[test]
    fn test_url_match_is_path_only() {
        let a = analyze(RawResponse::new().status(200).url("https://login.example.com/products/author"));
        assert!(!a.is_blocked);
    }

    #[test]
    fn test_headers_never_block_alone() {
        let a = analyze(RawResponse::new().status(200).header("X-Blocked-By", "waf"));
        assert!(!a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::None);
        assert_eq!(a.confidence, 0.9);
        assert_eq!(a.issues, vec!["Explicit blocking header"]);
    }

    #[test]
    fn test_header_raises_confidence_of_url_block() {
        let a = analyze(
            RawResponse::new()
                .status(200)
                .url("https://example.com/blocked")
                .header("cf-ray", "8a1b2c3d4e5f6a7b-LHR")
                .header("x-access-denied", "1"),
        );
        assert!(a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::AccessDenied);
        assert_eq!(a.confidence, 0.9);
        assert_eq!(a.issues.len(), 3);
    }

    const RECAPTCHA_PRODUCT_PAGE: &str = r#"<html><head><title>Acme Kettle</title>
<script src="https://www.google.com/recaptcha/api.js" async defer></script></head>
<body><h1>Acme Kettle</h1><p class="price">$24.99</p>
<form action="/newsletter"><div class="g-recaptcha" data-sitekey="6LcX"></div>
<button>Subscribe</button></form>
<script>window.onload = function () { grecaptcha.render("recaptcha"); };</script>
<noscript><iframe src="https://www.google.com/recaptcha/api/fallback"></iframe></noscript>
</body></html>"#;

    #[test]
    fn test_embedded_recaptcha_widget_not_blocked() {
        let a = analyze(RawResponse::new().status(200).content(RECAPTCHA_PRODUCT_PAGE));
        assert!(!a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::None);
        assert!(a.issues.is_empty());
    }

    #[test]
    fn test_visible_captcha_text_still_blocks() {
        let page = RECAPTCHA_PRODUCT_PAGE.replace(
            "<h1>Acme Kettle</h1>",
            "<h1>Please complete the CAPTCHA to continue</h1>",
        );
        let a = analyze(RawResponse::new().status(200).content(page));
        assert!(a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::Captcha);
        assert_eq!(a.confidence, 0.95);
    }

    #[test]
    fn test_title_text_is_scanned() {
        let a = analyze(
            RawResponse::new()
                .status(200)
                .content("<html><head><title>Access Denied</title></head><body></body></html>"),
        );
        assert!(a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::AccessDenied);
    }

    #[test]
    fn test_phrase_beats_pattern_on_equal_confidence() {
        // access_denied phrase (0.85) and the captcha "checking your
        // browser" pattern (0.85) both fire; phrases come first.
        let a = analyze(
            RawResponse::new()
                .status(200)
                .content("<p>Access denied.</p><p>Checking your browser before you continue.</p>"),
        );
        assert!(a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::AccessDenied);
        assert_eq!(a.confidence, 0.85);
        assert_eq!(a.issues.len(), 2);
    }

    #[test]
    fn test_header_does_not_override_equal_confidence_pattern() {
        // rate-limit pattern (0.9) and x-blocked-by (0.9, access_denied).
        let a = analyze(
            RawResponse::new()
                .status(200)
                .content("Too many requests")
                .header("X-Blocked-By", "waf"),
        );
        assert!(a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::RateLimited);
        assert_eq!(a.confidence, 0.9);
        assert_eq!(a.issues.len(), 3);
    }

    #[test]
    fn test_clean_page_not_blocked() {
        let a = analyze(RawResponse::new().status(200).content("<html>ok</html>"));
        assert!(!a.is_blocked);
        assert_eq!(a.block_kind, BlockKind::None);
        assert_eq!(a.confidence, 0.0);
        assert!(a.issues.is_empty());
    }
}
