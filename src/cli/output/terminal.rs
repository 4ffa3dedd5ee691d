//! Terminal output formatting with colors

use crate::error::PveAuditError;
use colored::{ColoredString, Colorize};

use super::ReportRenderer;
use crate::parsers::FileType;
use crate::rules::{AuditReport, CategoryScore, Finding, Grade, Severity};

pub struct TerminalOutput {
    show_passed: bool,
}

impl TerminalOutput {
    pub fn new(show_passed: bool) -> Self {
        Self { show_passed }
    }

    fn format_header(&self, report: &AuditReport) -> String {
        let files = if report.files_analyzed.is_empty() {
            "none".to_string()
        } else {
            report
                .files_analyzed
                .iter()
                .map(FileType::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            r#"
{} v{}

{} {}
{} {}
"#,
            "pveaudit".cyan().bold(),
            env!("CARGO_PKG_VERSION"),
            "Audited:".dimmed(),
            report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            "Files:".dimmed(),
            files.white().bold()
        )
    }

    fn format_scores(&self, report: &AuditReport) -> String {
        let mut output = format!(
            "\n{}\n{}\n\n",
            "━".repeat(50).dimmed(),
            "  SCORES".bold()
        );

        for category in &report.categories {
            output.push_str(&format!(
                "  {:<22} {:>3}/{}  {}\n",
                category.category.title(),
                category.score,
                category.max_score,
                format!("(weight {})", category.category.weight()).dimmed()
            ));
        }

        output.push_str(&format!(
            "\n  {} {}/100  {} {}\n",
            "Overall:".bold(),
            report.overall_score.to_string().bold(),
            "Grade:".bold(),
            grade_label(report.grade)
        ));

        output
    }

    fn format_findings(&self, report: &AuditReport) -> String {
        let mut output = format!(
            "\n{}\n{}\n\n",
            "━".repeat(50).dimmed(),
            "  AUDIT RESULTS".bold()
        );

        if report.is_clean() {
            output.push_str(&format!("  {}\n", "All rules passed.".green()));
        }

        for category in &report.categories {
            output.push_str(&self.format_category(category));
        }

        output
    }

    fn format_category(&self, category: &CategoryScore) -> String {
        let failed: Vec<&Finding> = category.failed().collect();
        let passed: Vec<&Finding> = category.findings.iter().filter(|f| f.passed()).collect();

        if failed.is_empty() && !self.show_passed {
            return String::new();
        }

        let mut output = format!(
            "{} ({}/{})\n",
            category.category.title().bold(),
            category.score,
            category.max_score
        );

        for finding in failed {
            output.push_str(&self.format_failed(finding));
        }
        if self.show_passed {
            for finding in passed {
                output.push_str(&self.format_passed(finding));
            }
        }
        output.push('\n');

        output
    }

    fn format_failed(&self, finding: &Finding) -> String {
        let rule = finding.rule;
        let mut output = format!(
            "  {} {} [{}] {}\n",
            "✗".red(),
            severity_label(rule.severity),
            rule.id.cyan(),
            rule.title
        );
        output.push_str(&format!(
            "    {} {}\n",
            "└─".dimmed(),
            finding.result.evidence
        ));
        if let Some(details) = &finding.result.details {
            output.push_str(&format!("       {}\n", details.dimmed()));
        }
        output.push_str(&format!(
            "    {} {}\n",
            "Fix:".green(),
            rule.remediation
        ));
        for line in rule.remediation_script.lines() {
            output.push_str(&format!("      {}\n", line.dimmed()));
        }

        output
    }

    fn format_passed(&self, finding: &Finding) -> String {
        format!(
            "  {} [{}] {} {}\n",
            "✓".green(),
            finding.rule.id.cyan(),
            finding.rule.title,
            format!("({})", finding.result.evidence).dimmed()
        )
    }

    fn format_summary(&self, report: &AuditReport) -> String {
        let mut output = format!(
            "{}\n{}\n\n",
            "━".repeat(50).dimmed(),
            "  SUMMARY".bold()
        );

        let critical = report.count_failed_by_severity(Severity::Critical);
        let high = report.count_failed_by_severity(Severity::High);
        let medium = report.count_failed_by_severity(Severity::Medium);
        let info = report.count_failed_by_severity(Severity::Info);

        output.push_str(&format!(
            "Critical: {} │ High: {} │ Medium: {} │ Info: {}\n",
            critical.to_string().red().bold(),
            high.to_string().yellow().bold(),
            medium.to_string().yellow(),
            info.to_string().blue()
        ));

        let passed = report.findings.len() - report.failed().count();
        output.push_str(&format!(
            "{} of {} rules passed\n",
            passed,
            report.findings.len()
        ));

        if critical > 0 {
            output.push_str(&format!(
                "\n{} {} critical issue(s) must be fixed.\n",
                "⚠️ ".yellow(),
                critical
            ));
        }

        output
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    let label = severity.as_str().to_uppercase();
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Info => label.blue(),
    }
}

fn grade_label(grade: Grade) -> ColoredString {
    match grade {
        Grade::A => grade.as_str().green().bold(),
        Grade::B => grade.as_str().green(),
        Grade::C => grade.as_str().yellow(),
        Grade::D => grade.as_str().red(),
        Grade::F => grade.as_str().red().bold(),
    }
}

impl ReportRenderer for TerminalOutput {
    fn render_report(&self, report: &AuditReport) -> Result<String, PveAuditError> {
        let mut output = String::new();

        output.push_str(&self.format_header(report));
        output.push_str(&self.format_scores(report));
        output.push_str(&self.format_findings(report));
        output.push_str(&self.format_summary(report));

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::audit_sources;
    use std::collections::BTreeMap;

    fn insecure_report() -> AuditReport {
        let mut sources = BTreeMap::new();
        sources.insert(
            FileType::SshdConfig,
            "PermitRootLogin yes\nPasswordAuthentication yes\nPort 22\nMaxAuthTries 10\n"
                .to_string(),
        );
        audit_sources(&sources)
    }

    fn render(output: &TerminalOutput, report: &AuditReport) -> String {
        colored::control::set_override(false);
        output.render_report(report).unwrap()
    }

    #[test]
    fn test_render_report_lists_failures() {
        let rendered = render(&TerminalOutput::new(false), &insecure_report());

        assert!(rendered.contains("Files: sshd_config"));
        assert!(rendered.contains("[root-ssh-password]"));
        assert!(rendered.contains("PermitRootLogin=yes, PasswordAuthentication=yes"));
        assert!(rendered.contains("SSH (15/100)"));
        assert!(rendered.contains("Critical: 1 │ High: 1 │ Medium: 2 │ Info: 0"));
        assert!(rendered.contains("12 of 16 rules passed"));
        assert!(!rendered.contains("✓"));
    }

    #[test]
    fn test_render_report_shows_remediation_script() {
        let rendered = render(&TerminalOutput::new(false), &insecure_report());
        assert!(rendered.contains("Fix:"));
        assert!(rendered.contains("sshd -t && systemctl reload ssh"));
    }

    #[test]
    fn test_show_passed() {
        let rendered = render(&TerminalOutput::new(true), &insecure_report());
        assert!(rendered.contains("✓ [firewall-disabled]"));
    }

    #[test]
    fn test_clean_report() {
        let report = audit_sources(&BTreeMap::new());
        let rendered = render(&TerminalOutput::new(false), &report);

        assert!(rendered.contains("Files: none"));
        assert!(rendered.contains("All rules passed."));
        assert!(rendered.contains("Overall: 100/100  Grade: A"));
        assert!(!rendered.contains("critical issue(s) must be fixed"));
    }
}
