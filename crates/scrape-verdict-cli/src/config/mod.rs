//! Configuration loading and resolution.

use scrape_verdict::config::split_fields;
use scrape_verdict::ValidatorConfig;

/// Values given on the command line. `None` keeps the environment or
/// default value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub min_quality: Option<f64>,
    /// Comma-separated field names.
    pub required_fields: Option<String>,
    pub max_content_chars: Option<usize>,
}

/// Resolve the validator configuration: defaults, then `SCRAPER_*`
/// environment variables, then command-line flags.
pub fn resolve_config(overrides: &ConfigOverrides) -> ValidatorConfig {
    resolve_config_with(overrides, |key| std::env::var(key).ok())
}

/// Same as [`resolve_config`] with an explicit environment lookup.
pub fn resolve_config_with<F>(overrides: &ConfigOverrides, env: F) -> ValidatorConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ValidatorConfig::default().with_overrides(env);

    if let Some(score) = overrides.min_quality {
        config.min_quality_score = score;
    }
    if let Some(raw) = &overrides.required_fields {
        config.required_fields = split_fields(raw);
    }
    if let Some(max) = overrides.max_content_chars {
        config.max_content_chars = max;
    }

    config.sanitized()
}
