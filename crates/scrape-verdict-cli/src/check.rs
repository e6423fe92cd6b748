//! The `check` command: validate one scrape run from files on disk.

use std::path::PathBuf;

use anyhow::Context;

use scrape_verdict::{ValidationResult, Validator};

use crate::config::{resolve_config, ConfigOverrides};
use crate::input::{load_records, load_response};
use crate::report::{exit_code, render, OutputFormat};

#[derive(Debug, Clone, clap::Args)]
pub struct CheckArgs {
    /// JSON response document (status_code, headers, content, url, elapsed).
    #[arg(short, long)]
    pub response: PathBuf,

    /// Extracted records: a JSON array of objects, or a `.csv` file with a
    /// header row.
    #[arg(long)]
    pub records: Option<PathBuf>,

    /// Final URL; overrides the response document's `url`.
    #[arg(long)]
    pub url: Option<String>,

    /// Minimum data-quality score for success, in [0, 1].
    #[arg(long)]
    pub min_quality: Option<f64>,

    /// Comma-separated required fields.
    #[arg(long)]
    pub required_fields: Option<String>,

    /// Maximum characters of response content inspected.
    #[arg(long)]
    pub max_content_chars: Option<usize>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
    pub format: OutputFormat,

    /// Write the output here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CheckArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            min_quality: self.min_quality,
            required_fields: self.required_fields.clone(),
            max_content_chars: self.max_content_chars,
        }
    }
}

/// Load inputs and validate them.
pub fn evaluate(args: &CheckArgs, validator: &Validator) -> anyhow::Result<ValidationResult> {
    let mut raw = load_response(&args.response)
        .with_context(|| format!("Failed to load response {}", args.response.display()))?;
    if let Some(url) = &args.url {
        raw.url = Some(url.clone());
    }

    let records = match &args.records {
        Some(path) => load_records(path)
            .with_context(|| format!("Failed to load records {}", path.display()))?,
        None => Vec::new(),
    };

    Ok(validator.validate_raw(raw, &records))
}

/// Run `check` end to end and return the process exit code.
pub fn run(args: &CheckArgs) -> anyhow::Result<i32> {
    let config = resolve_config(&args.overrides());
    let validator = Validator::new(config).context("Failed to build validator")?;

    let result = evaluate(args, &validator)?;
    let rendered = render(&result, args.format).context("Failed to render verdict")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Report saved to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(exit_code(&result))
}
