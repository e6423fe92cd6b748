//! Immutable knowledge base of blocking indicators and anti-bot vendor
//! signatures.
//!
//! The built-in signature set ships as `signatures.json`, embedded at compile
//! time so there is no runtime file I/O. Every pattern is compiled exactly
//! once when a [`SignatureRegistry`] is constructed; after that the registry
//! is read-only and can be shared across threads behind an [`Arc`].
//!
//! # Confidence model
//!
//! Every rule carries a base confidence in `[0.0, 1.0]`. Status codes are the
//! most authoritative signal (0.8 to 0.95), phrase categories and explicit
//! challenge wording come next (0.85 to 0.95), URL shapes are weaker (0.7),
//! and a bare CDN header is the weakest evidence (0.6).

use std::sync::{Arc, OnceLock};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::types::{BlockKind, BotVendor, VerdictError, VerdictResult};

// ── Compile-time signature configuration ─────────────────────────────────────

/// Raw JSON content of the built-in signature set.
const SIGNATURES_JSON: &str = include_str!("signatures.json");

// ── Signature document (serde view of the JSON) ──────────────────────────────

/// Uncompiled signature set as it appears on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureDocument {
    pub status_codes: Vec<StatusSignature>,
    pub phrase_categories: Vec<PhraseCategorySignature>,
    pub content_patterns: Vec<PatternSignature>,
    pub url_patterns: Vec<PatternSignature>,
    pub suspicious_headers: Vec<HeaderIndicator>,
    pub vendors: Vec<VendorSignatureSet>,
}

/// HTTP status code classified as blocking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSignature {
    pub code: u16,
    pub message: String,
    pub kind: BlockKind,
    pub confidence: f64,
}

/// A named list of phrases that all map to the same [`BlockKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseCategorySignature {
    pub category: String,
    pub kind: BlockKind,
    pub confidence: f64,
    pub phrases: Vec<String>,
}

/// A regex rule mapping to a [`BlockKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSignature {
    pub pattern: String,
    pub kind: BlockKind,
    pub confidence: f64,
}

/// A header whose presence is evidence of blocking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderIndicator {
    /// Exact header name, matched case-insensitively.
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub kind: Option<BlockKind>,
    pub confidence: f64,
}

/// All signatures belonging to one vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorSignatureSet {
    pub vendor: BotVendor,
    #[serde(default)]
    pub headers: Vec<HeaderSignatureSpec>,
    #[serde(default)]
    pub content: Vec<ContentSignatureSpec>,
}

/// Header-name pattern, optionally constrained by a header-value pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderSignatureSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSignatureSpec {
    pub pattern: String,
    pub confidence: f64,
}

// ── Compiled registry ────────────────────────────────────────────────────────

/// One phrase and its word-bounded matcher.
#[derive(Debug)]
pub struct PhraseMatcher {
    pub phrase: String,
    pub regex: Regex,
}

#[derive(Debug)]
pub struct PhraseCategory {
    pub name: String,
    pub kind: BlockKind,
    pub confidence: f64,
    pub phrases: Vec<PhraseMatcher>,
}

#[derive(Debug)]
pub struct PatternRule {
    pub pattern: String,
    pub regex: Regex,
    pub kind: BlockKind,
    pub confidence: f64,
}

#[derive(Debug)]
pub struct HeaderSignature {
    pub name_pattern: String,
    pub name: Regex,
    pub value: Option<Regex>,
    pub confidence: f64,
}

impl HeaderSignature {
    /// Whether a (lower-cased name, value) header pair matches.
    pub fn matches(&self, name: &str, value: &str) -> bool {
        self.name.is_match(name) && self.value.as_ref().map_or(true, |v| v.is_match(value))
    }
}

#[derive(Debug)]
pub struct ContentSignature {
    pub pattern: String,
    pub regex: Regex,
    pub confidence: f64,
}

#[derive(Debug)]
pub struct VendorSignatures {
    pub vendor: BotVendor,
    pub headers: Vec<HeaderSignature>,
    pub content: Vec<ContentSignature>,
}

/// Compiled, read-only signature knowledge base.
#[derive(Debug)]
pub struct SignatureRegistry {
    document: SignatureDocument,
    phrase_categories: Vec<PhraseCategory>,
    content_patterns: Vec<PatternRule>,
    url_patterns: Vec<PatternRule>,
    vendors: Vec<VendorSignatures>,
}

impl SignatureRegistry {
    /// Compile the embedded signature set.
    pub fn builtin() -> VerdictResult<Self> {
        Self::from_json(SIGNATURES_JSON)
    }

    /// Process-wide built-in registry, compiled at most once.
    pub fn shared() -> VerdictResult<Arc<Self>> {
        static SHARED: OnceLock<Arc<SignatureRegistry>> = OnceLock::new();
        if let Some(registry) = SHARED.get() {
            return Ok(Arc::clone(registry));
        }
        let compiled = Arc::new(Self::builtin()?);
        Ok(Arc::clone(SHARED.get_or_init(|| compiled)))
    }

    /// Compile a signature set from its JSON representation.
    pub fn from_json(json: &str) -> VerdictResult<Self> {
        let document: SignatureDocument = serde_json::from_str(json)?;
        Self::compile(document)
    }

    /// Compile an already-parsed signature document.
    pub fn compile(document: SignatureDocument) -> VerdictResult<Self> {
        for status in &document.status_codes {
            check_confidence(status.confidence, &format!("status {}", status.code))?;
        }
        for header in &document.suspicious_headers {
            check_confidence(header.confidence, &header.name)?;
        }

        let phrase_categories = document
            .phrase_categories
            .iter()
            .map(|cat| -> VerdictResult<PhraseCategory> {
                check_confidence(cat.confidence, &cat.category)?;
                let phrases = cat
                    .phrases
                    .iter()
                    .map(|phrase| -> VerdictResult<PhraseMatcher> {
                        let phrase = phrase.to_lowercase();
                        let regex = case_insensitive(&format!(r"\b{}\b", regex::escape(&phrase)))?;
                        Ok(PhraseMatcher { phrase, regex })
                    })
                    .collect::<VerdictResult<Vec<_>>>()?;
                Ok(PhraseCategory {
                    name: cat.category.clone(),
                    kind: cat.kind,
                    confidence: cat.confidence,
                    phrases,
                })
            })
            .collect::<VerdictResult<Vec<_>>>()?;

        let content_patterns = compile_rules(&document.content_patterns)?;
        let url_patterns = compile_rules(&document.url_patterns)?;

        let vendors = document
            .vendors
            .iter()
            .map(|set| -> VerdictResult<VendorSignatures> {
                let headers = set
                    .headers
                    .iter()
                    .map(|h| -> VerdictResult<HeaderSignature> {
                        check_confidence(h.confidence, &h.name)?;
                        Ok(HeaderSignature {
                            name_pattern: h.name.clone(),
                            name: case_insensitive(&h.name)?,
                            value: h.value.as_deref().map(case_insensitive).transpose()?,
                            confidence: h.confidence,
                        })
                    })
                    .collect::<VerdictResult<Vec<_>>>()?;
                let content = set
                    .content
                    .iter()
                    .map(|c| -> VerdictResult<ContentSignature> {
                        check_confidence(c.confidence, &c.pattern)?;
                        Ok(ContentSignature {
                            pattern: c.pattern.clone(),
                            regex: case_insensitive(&c.pattern)?,
                            confidence: c.confidence,
                        })
                    })
                    .collect::<VerdictResult<Vec<_>>>()?;
                Ok(VendorSignatures {
                    vendor: set.vendor,
                    headers,
                    content,
                })
            })
            .collect::<VerdictResult<Vec<_>>>()?;

        tracing::debug!(
            "Compiled signature registry: {} status codes, {} phrase categories, {} vendors",
            document.status_codes.len(),
            phrase_categories.len(),
            vendors.len()
        );

        Ok(Self {
            document,
            phrase_categories,
            content_patterns,
            url_patterns,
            vendors,
        })
    }

    /// The uncompiled signature set this registry was built from.
    pub fn document(&self) -> &SignatureDocument {
        &self.document
    }

    /// Look up a blocking status code.
    pub fn status(&self, code: u16) -> Option<&StatusSignature> {
        self.document.status_codes.iter().find(|s| s.code == code)
    }

    pub fn phrase_categories(&self) -> &[PhraseCategory] {
        &self.phrase_categories
    }

    pub fn content_patterns(&self) -> &[PatternRule] {
        &self.content_patterns
    }

    pub fn url_patterns(&self) -> &[PatternRule] {
        &self.url_patterns
    }

    pub fn suspicious_headers(&self) -> &[HeaderIndicator] {
        &self.document.suspicious_headers
    }

    /// Vendor signatures in registry order.
    pub fn vendors(&self) -> &[VendorSignatures] {
        &self.vendors
    }
}

fn compile_rules(specs: &[PatternSignature]) -> VerdictResult<Vec<PatternRule>> {
    specs
        .iter()
        .map(|spec| -> VerdictResult<PatternRule> {
            check_confidence(spec.confidence, &spec.pattern)?;
            Ok(PatternRule {
                pattern: spec.pattern.clone(),
                regex: case_insensitive(&spec.pattern)?,
                kind: spec.kind,
                confidence: spec.confidence,
            })
        })
        .collect()
}

fn case_insensitive(pattern: &str) -> VerdictResult<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

fn check_confidence(confidence: f64, what: &str) -> VerdictResult<()> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(VerdictError::InvalidConfig(format!(
            "signature confidence for {what} must be in [0, 1], got {confidence}"
        )))
    }
}
