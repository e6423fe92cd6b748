//! One-line human-readable rendering of a verdict.

use crate::types::ValidationResult;

/// Render `result` as a single `" | "`-joined line, e.g.
/// `✗ Scraping failed | ⚠ Blocked (captcha) | Confidence: 75% | Issues: 1 | Warnings: 0`.
pub fn summarize(result: &ValidationResult) -> String {
    let mut parts = Vec::with_capacity(6);

    parts.push(if result.is_successful {
        "✓ Scraping successful".to_string()
    } else {
        "✗ Scraping failed".to_string()
    });

    if result.is_blocked {
        parts.push(format!("⚠ Blocked ({})", result.block_kind()));
    }

    if let Some(vendor) = result.bot_vendor {
        parts.push(format!("🛡 Bot detection: {vendor}"));
    }

    parts.push(format!("Confidence: {:.0}%", result.confidence * 100.0));
    parts.push(format!("Issues: {}", result.issues.len()));
    parts.push(format!("Warnings: {}", result.warnings.len()));

    parts.join(" | ")
}
