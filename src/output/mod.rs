//! Output formatters for lint results

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::{OutputConfig, OutputFormat};
use crate::diagnostic::Diagnostic;
use crate::engine::LintResult;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the entire lint result
    fn format(&self, result: &LintResult) -> String;

    /// Format a single diagnostic
    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String;
}

/// Formatter for the configured output settings
pub fn formatter_for(config: &OutputConfig, colored: bool) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => {
            let mut formatter = TextFormatter::new();
            if !colored {
                formatter = formatter.without_color();
            }
            formatter.show_stats = config.statistics;
            formatter.show_timings = config.verbose;
            Box::new(formatter)
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new();
            Box::new(if config.verbose {
                formatter.pretty()
            } else {
                formatter
            })
        }
    }
}
