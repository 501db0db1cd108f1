mod formatters;

pub use formatters::{JsonFormatter, TextFormatter};

use crate::orchestrators::{Plan, RunReport};
use crate::state::StateFile;
use anyhow::Result;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn from_string(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Unknown output format: {} (expected text or json)", s),
        }
    }
}

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    fn format_plan(&self, plan: &Plan) -> Result<String>;

    fn format_report(&self, command: &str, report: &RunReport) -> Result<String>;

    fn format_state(&self, state: &StateFile) -> Result<String>;
}

/// Create a formatter based on output format
pub fn create_formatter(format: OutputFormat, use_color: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(use_color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
