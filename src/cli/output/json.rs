//! JSON output formatting

use crate::error::PveAuditError;
use serde::Serialize;

use super::ReportRenderer;
use crate::rules::{AuditReport, Severity};

pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    version: &'static str,
    summary: Summary,
    #[serde(flatten)]
    report: &'a AuditReport,
}

#[derive(Serialize)]
struct Summary {
    rules: usize,
    passed: usize,
    critical_count: usize,
    high_count: usize,
    medium_count: usize,
    info_count: usize,
}

impl ReportRenderer for JsonOutput {
    fn render_report(&self, report: &AuditReport) -> Result<String, PveAuditError> {
        let failed = report.failed().count();
        let output = ReportOutput {
            version: env!("CARGO_PKG_VERSION"),
            summary: Summary {
                rules: report.findings.len(),
                passed: report.findings.len() - failed,
                critical_count: report.count_failed_by_severity(Severity::Critical),
                high_count: report.count_failed_by_severity(Severity::High),
                medium_count: report.count_failed_by_severity(Severity::Medium),
                info_count: report.count_failed_by_severity(Severity::Info),
            },
            report,
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }
}
