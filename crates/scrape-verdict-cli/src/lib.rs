//! scrape-verdict command line: checks a scrape run's response and records
//! from disk.

pub mod check;
pub mod config;
pub mod input;
pub mod report;

pub use check::CheckArgs;
pub use config::{resolve_config, ConfigOverrides};
pub use input::InputError;
pub use report::{exit_code, OutputFormat};
