//! scrape-verdict: classifies the outcome of a web-data-extraction attempt:
//! blocking detection, anti-bot vendor identification and data-quality
//! scoring, combined into one confidence-scored verdict.

pub mod block;
pub mod bot;
pub mod config;
pub mod normalize;
pub mod quality;
pub mod registry;
pub mod summary;
pub mod types;
pub mod validator;

pub use block::{BlockAnalysis, BlockDetector};
pub use bot::{BotDetection, BotSystemIdentifier};
pub use config::{QualityWeights, ValidatorConfig};
pub use normalize::{RawResponse, ResponseNormalizer};
pub use quality::{DataQualityScorer, QualityAssessment, CANONICAL_FIELDS};
pub use registry::SignatureRegistry;
pub use summary::summarize;
pub use types::*;
pub use validator::Validator;
