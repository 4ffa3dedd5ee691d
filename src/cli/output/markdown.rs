//! Markdown report output

use crate::error::PveAuditError;

use super::ReportRenderer;
use crate::parsers::FileType;
use crate::rules::{AuditReport, Finding, Severity};

pub struct MarkdownReport {
    show_passed: bool,
}

impl MarkdownReport {
    pub fn new(show_passed: bool) -> Self {
        Self { show_passed }
    }

    fn format_finding(&self, finding: &Finding) -> String {
        let rule = finding.rule;
        let mut output = format!(
            "### `{}` {}\n\n**Severity:** {} | **Category:** {}\n\n{}\n\n**Evidence:** {}\n\n",
            rule.id,
            rule.title,
            rule.severity,
            rule.category,
            rule.description,
            finding.result.evidence
        );

        if let Some(details) = &finding.result.details {
            output.push_str(&format!("> {details}\n\n"));
        }
        output.push_str(&format!("**Remediation:** {}\n\n", rule.remediation));
        output.push_str(&format!("```sh\n{}\n```\n\n", rule.remediation_script));
        if let Some(reference) = rule.reference {
            output.push_str(&format!("_Reference: {reference}_\n\n"));
        }

        output
    }
}

impl ReportRenderer for MarkdownReport {
    fn render_report(&self, report: &AuditReport) -> Result<String, PveAuditError> {
        let mut md = String::new();

        md.push_str("# Proxmox VE Security Audit\n\n");
        md.push_str(&format!(
            "**Generated:** {}  \n**Score:** {}/100  \n**Grade:** {}  \n**Files analyzed:** {}\n\n",
            report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            report.overall_score,
            report.grade,
            if report.files_analyzed.is_empty() {
                "none".to_string()
            } else {
                report
                    .files_analyzed
                    .iter()
                    .map(FileType::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        ));

        md.push_str("## Scores\n\n| Category | Weight | Score | Failed |\n|----------|--------|-------|--------|\n");
        for category in &report.categories {
            md.push_str(&format!(
                "| {} | {} | {}/{} | {} |\n",
                category.category.title(),
                category.category.weight(),
                category.score,
                category.max_score,
                category.failed().count()
            ));
        }
        md.push('\n');

        md.push_str("## Summary\n\n| Severity | Failed |\n|----------|--------|\n");
        for severity in Severity::ALL {
            md.push_str(&format!(
                "| {} | {} |\n",
                severity,
                report.count_failed_by_severity(severity)
            ));
        }
        md.push('\n');

        md.push_str("## Findings\n\n");
        if report.is_clean() {
            md.push_str("All rules passed.\n\n");
        }
        for finding in report.failed() {
            md.push_str(&self.format_finding(finding));
        }

        if self.show_passed {
            md.push_str("## Passed Rules\n\n| Rule | Evidence |\n|------|----------|\n");
            for finding in report.findings.iter().filter(|f| f.passed()) {
                md.push_str(&format!(
                    "| `{}` | {} |\n",
                    finding.rule.id,
                    finding.result.evidence.replace('|', "\\|")
                ));
            }
            md.push('\n');
        }

        md.push_str("---\n\n*Generated by pveaudit*\n");

        Ok(md)
    }
}
