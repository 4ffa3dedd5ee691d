//! Output formatting module for CLI

pub mod json;
mod markdown;
mod terminal;

pub use json::JsonOutput;
pub use markdown::MarkdownReport;
pub use terminal::TerminalOutput;

use crate::config::OutputFormat;
use crate::error::PveAuditError;
use crate::rules::AuditReport;

/// Trait for rendering report output
pub trait ReportRenderer {
    fn render_report(&self, report: &AuditReport) -> Result<String, PveAuditError>;
}

/// Renderer for an output format
pub fn renderer(format: OutputFormat, show_passed: bool) -> Box<dyn ReportRenderer> {
    match format {
        OutputFormat::Terminal => Box::new(TerminalOutput::new(show_passed)),
        OutputFormat::Json => Box::new(JsonOutput::new()),
        OutputFormat::Markdown => Box::new(MarkdownReport::new(show_passed)),
    }
}
