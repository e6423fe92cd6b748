//! Output rendering and exit codes.

use scrape_verdict::{summarize, ValidationResult};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_QUALITY_FAILURE: i32 = 1;
pub const EXIT_BLOCKED: i32 = 2;
pub const EXIT_TOOL_ERROR: i32 = 3;

/// How `check` prints its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// One-line summary.
    #[default]
    Summary,
    /// Multi-section human-readable report.
    Report,
    /// The full verdict as pretty-printed JSON.
    Json,
}

/// Process exit code for a verdict.
pub fn exit_code(result: &ValidationResult) -> i32 {
    if result.is_blocked {
        EXIT_BLOCKED
    } else if result.is_successful {
        EXIT_SUCCESS
    } else {
        EXIT_QUALITY_FAILURE
    }
}

pub fn render(result: &ValidationResult, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Summary => Ok(summarize(result)),
        OutputFormat::Report => Ok(detailed_report(result)),
        OutputFormat::Json => serde_json::to_string_pretty(result),
    }
}

/// Suggested next step for the operator, derived from the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    ChangeStrategy,
    ImproveExtraction,
    MonitorBotDetection,
    KeepApproach,
}

impl Recommendation {
    pub fn for_result(result: &ValidationResult) -> Self {
        if result.is_blocked {
            Self::ChangeStrategy
        } else if !result.is_successful {
            Self::ImproveExtraction
        } else if result.bot_vendor.is_some() {
            Self::MonitorBotDetection
        } else {
            Self::KeepApproach
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Self::ChangeStrategy => "BLOCKING DETECTED - change collection strategy:",
            Self::ImproveExtraction => "DATA QUALITY ISSUES - improve extraction:",
            Self::MonitorBotDetection => "BOT DETECTION PRESENT - monitor for future issues:",
            Self::KeepApproach => "EXCELLENT RESULTS:",
        }
    }

    pub fn steps(&self) -> &'static [&'static str] {
        match self {
            Self::ChangeStrategy => &[
                "Render the page with a browser-automation collector",
                "Slow down and spread requests over time",
                "Check robots.txt compliance",
                "Consider different user agents or proxies",
            ],
            Self::ImproveExtraction => &[
                "Review the extraction selectors",
                "Check whether the site structure has changed",
                "Use browser automation for dynamic content",
                "Verify the target elements exist on the page",
            ],
            Self::MonitorBotDetection => &[
                "Scraping succeeded but a protection system was identified",
                "Consider rotating user agents or using proxies",
                "Watch for rate limiting on later runs",
            ],
            Self::KeepApproach => &[
                "Scraping succeeded with good data quality",
                "No blocking or bot detection identified",
                "Continue with the current approach",
            ],
        }
    }
}

fn completeness_marker(completeness: f64) -> &'static str {
    if completeness > 0.8 {
        "✅"
    } else if completeness > 0.5 {
        "⚠️ "
    } else {
        "❌"
    }
}

/// Multi-section report: summary, status, blocking, bot detection, quality
/// metrics, issues, warnings and a recommendation.
pub fn detailed_report(result: &ValidationResult) -> String {
    let rule = "=".repeat(60);
    let mut lines = vec![
        rule.clone(),
        "🔍 SCRAPING VALIDATION REPORT".to_string(),
        rule.clone(),
        format!("\n📋 SUMMARY: {}", summarize(result)),
    ];

    if result.is_successful {
        lines.push("\n✅ SCRAPING STATUS: SUCCESSFUL".into());
        lines.push("   Data quality meets validation standards".into());
    } else {
        lines.push("\n❌ SCRAPING STATUS: FAILED".into());
    }

    if result.is_blocked {
        lines.push(format!("\n🚫 BLOCKING DETECTED: {}", result.block_kind()));
        lines.push(format!(
            "   Block confidence: {:.2}",
            result.metadata.block_confidence
        ));
    } else {
        lines.push("\n✅ NO BLOCKING DETECTED".into());
    }

    match result.bot_vendor {
        Some(vendor) => {
            lines.push(format!(
                "\n🛡️  BOT DETECTION SYSTEM: {}",
                vendor.as_str().to_uppercase()
            ));
            if !result.metadata.bot_indicators.is_empty() {
                lines.push("   Indicators found:".into());
                for indicator in &result.metadata.bot_indicators {
                    lines.push(format!("   - {indicator}"));
                }
            }
        }
        None => lines.push("\n⭕ NO BOT DETECTION SYSTEM IDENTIFIED".into()),
    }

    if let Some(stats) = &result.metadata.quality {
        lines.push("\n📊 DATA QUALITY METRICS:".into());
        lines.push(format!("   Total items: {}", stats.total_items));
        if stats.factors.is_some() {
            lines.push(format!("   Quality score: {:.2}", stats.quality_score));
        }
        if !stats.field_completeness.is_empty() {
            lines.push("   Field completeness:".into());
            for (field, c) in &stats.field_completeness {
                lines.push(format!(
                    "     {} {field}: {:.1}% ({} items)",
                    completeness_marker(c.completeness),
                    c.completeness * 100.0,
                    c.count
                ));
            }
        }
    }

    if !result.issues.is_empty() {
        lines.push("\n❌ ISSUES DETECTED:".into());
        for (i, issue) in result.issues.iter().enumerate() {
            lines.push(format!("   {}. {issue}", i + 1));
        }
    }

    if !result.warnings.is_empty() {
        lines.push("\n⚠️  WARNINGS:".into());
        for (i, warning) in result.warnings.iter().enumerate() {
            lines.push(format!("   {}. {warning}", i + 1));
        }
    }

    let recommendation = Recommendation::for_result(result);
    lines.push("\n💡 RECOMMENDATIONS:".into());
    lines.push(format!("   {}", recommendation.headline()));
    for step in recommendation.steps() {
        lines.push(format!("      • {step}"));
    }

    lines.push(format!("\n{rule}"));
    lines.join("\n")
}
