//! Anti-bot vendor identification from header and content signatures.

use crate::registry::SignatureRegistry;
use crate::types::{BotVendor, ResponseSnapshot};

/// Which protection system (if any) fronts the response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotDetection {
    pub vendor: Option<BotVendor>,
    pub confidence: f64,
    /// Every signature that matched, winning or not.
    pub indicators: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct BotSystemIdentifier<'a> {
    registry: &'a SignatureRegistry,
}

impl<'a> BotSystemIdentifier<'a> {
    pub fn new(registry: &'a SignatureRegistry) -> Self {
        Self { registry }
    }

    /// Walk vendors in registry order, headers before content. The strictly
    /// highest confidence wins, so ties keep the first vendor found.
    pub fn identify(&self, snapshot: &ResponseSnapshot) -> BotDetection {
        let mut detection = BotDetection::default();
        let content = snapshot.content();

        for set in self.registry.vendors() {
            for signature in &set.headers {
                for (name, value) in snapshot.headers() {
                    if signature.matches(name, value) {
                        detection.record(set.vendor, signature.confidence, format!("Header: {name}"));
                    }
                }
            }

            if content.is_empty() {
                continue;
            }
            for signature in &set.content {
                if signature.regex.is_match(content) {
                    detection.record(
                        set.vendor,
                        signature.confidence,
                        format!("Content pattern: {}", signature.pattern),
                    );
                }
            }
        }

        if let Some(vendor) = detection.vendor {
            tracing::debug!(
                "Identified {vendor} with confidence {:.2} from {} indicator(s)",
                detection.confidence,
                detection.indicators.len()
            );
        }
        detection
    }
}

impl BotDetection {
    fn record(&mut self, vendor: BotVendor, confidence: f64, indicator: String) {
        if confidence > self.confidence {
            self.vendor = Some(vendor);
            self.confidence = confidence;
        }
        self.indicators.push(indicator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{RawResponse, ResponseNormalizer};

    fn identify(raw: RawResponse) -> BotDetection {
        let registry = SignatureRegistry::builtin().unwrap();
        let snapshot = ResponseNormalizer::default().normalize(raw);
        BotSystemIdentifier::new(&registry).identify(&snapshot)
    }

    #[test]
    fn test_cf_ray_header_alone() {
        let d = identify(RawResponse::new().header("CF-RAY", "8a1b2c3d4e5f6a7b-LHR"));
        assert_eq!(d.vendor, Some(BotVendor::Cloudflare));
        assert!(d.confidence >= 0.6);
        assert_eq!(d.indicators, vec!["Header: cf-ray"]);
    }

    #[test]
    fn test_cf_ray_plus_checking_browser() {
        let d = identify(
            RawResponse::new()
                .header("cf-ray", "8a1b")
                .content("Checking your browser before accessing example.com"),
        );
        assert_eq!(d.vendor, Some(BotVendor::Cloudflare));
        assert!(d.confidence >= 0.9);
        assert!(d
            .indicators
            .iter()
            .any(|i| i == "Content pattern: checking.your.browser"));
    }

    #[test]
    fn test_server_value_signature() {
        let d = identify(RawResponse::new().header("Server", "cloudflare"));
        assert_eq!(d.vendor, Some(BotVendor::Cloudflare));
        assert_eq!(d.confidence, 0.9);

        let d = identify(RawResponse::new().header("Server", "nginx"));
        assert_eq!(d.vendor, None);
    }

    #[test]
    fn test_highest_confidence_across_vendors() {
        // Cloudflare wording in the body (0.6) loses to a DataDome header (0.9).
        let d = identify(
            RawResponse::new()
                .header("x-datadome", "protected")
                .content("performance & security by cloudflare"),
        );
        assert_eq!(d.vendor, Some(BotVendor::Datadome));
        assert_eq!(d.confidence, 0.9);
        assert_eq!(d.indicators.len(), 2);
    }

    #[test]
    fn test_tie_keeps_first_vendor() {
        // cf-ray (cloudflare, 0.9) and x-iinfo (incapsula, 0.9): cloudflare
        // comes first in registry order.
        let d = identify(RawResponse::new().header("x-iinfo", "1").header("cf-ray", "2"));
        assert_eq!(d.vendor, Some(BotVendor::Cloudflare));
    }

    #[test]
    fn test_custom_system_content() {
        let d = identify(RawResponse::new().content("Please verify you are human to continue"));
        assert_eq!(d.vendor, Some(BotVendor::CustomSystem));
        assert_eq!(d.confidence, 0.7);
    }

    #[test]
    fn test_no_matches() {
        let d = identify(
            RawResponse::new()
                .header("Content-Type", "text/html")
                .content("<html>ok</html>"),
        );
        assert_eq!(d, BotDetection::default());
    }
}
