//! Exit codes for the CLI
//!
//! Standard exit codes used by the pveaudit CLI for scripting and CI.
//!
//! # Exit Code Reference
//!
//! | Code | Constant | Meaning | Example |
//! |------|----------|---------|---------|
//! | 0 | `SUCCESS` | Success | Every rule passed |
//! | 1 | `CRITICAL_ISSUES` | Critical issues | Root SSH password login, firewall disabled, score below `--fail-under` |
//! | 2 | `WARNINGS` | Warnings | High, medium or info rules failed |
//! | 3 | `ERROR` | Runtime error | Input file not found, invalid config |
//! | 4 | `INVALID_ARGS` | Invalid arguments | Unknown output format |
//!
//! # Usage
//!
//! ```rust,ignore
//! use pveaudit::cli::exit_codes;
//!
//! std::process::exit(exit_codes::CRITICAL_ISSUES);
//! ```

use crate::rules::AuditReport;

/// Success - every rule passed or the command completed normally.
pub const SUCCESS: i32 = 0;

/// Critical issues detected.
///
/// Used when:
/// - A critical rule failed
/// - The overall score is below the `--fail-under` threshold
pub const CRITICAL_ISSUES: i32 = 1;

/// Non-critical rules failed.
pub const WARNINGS: i32 = 2;

/// Runtime error (unreadable input, invalid configuration, write failure).
pub const ERROR: i32 = 3;

/// Invalid arguments.
pub const INVALID_ARGS: i32 = 4;

/// Exit code for a finished audit
pub fn for_report(report: &AuditReport, fail_under: u32) -> i32 {
    if report.has_critical_failure() || report.overall_score < fail_under {
        CRITICAL_ISSUES
    } else if !report.is_clean() {
        WARNINGS
    } else {
        SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::FileType;
    use crate::rules::audit_sources;
    use std::collections::BTreeMap;

    fn report(file_type: FileType, content: &str) -> AuditReport {
        let mut sources = BTreeMap::new();
        sources.insert(file_type, content.to_string());
        audit_sources(&sources)
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [SUCCESS, CRITICAL_ISSUES, WARNINGS, ERROR, INVALID_ARGS];
        for i in 0..codes.len() {
            for j in (i + 1)..codes.len() {
                assert_ne!(
                    codes[i], codes[j],
                    "Exit codes should be unique: {} and {} are both {}",
                    i, j, codes[i]
                );
            }
        }
    }

    #[test]
    fn test_exit_codes_values() {
        assert_eq!(SUCCESS, 0);
        assert_eq!(CRITICAL_ISSUES, 1);
        assert_eq!(WARNINGS, 2);
        assert_eq!(ERROR, 3);
        assert_eq!(INVALID_ARGS, 4);
    }

    #[test]
    fn test_for_report() {
        let clean = audit_sources(&BTreeMap::new());
        assert_eq!(for_report(&clean, 0), SUCCESS);
        assert_eq!(for_report(&clean, 100), SUCCESS);

        let critical = report(FileType::ClusterFw, "[OPTIONS]\nenable: 0\n[RULES]\nIN ACCEPT -p tcp -dport 22\n");
        assert_eq!(for_report(&critical, 0), CRITICAL_ISSUES);

        // Port 22 only: a medium failure
        let medium = report(
            FileType::SshdConfig,
            "PermitRootLogin no\nPasswordAuthentication no\nPort 22\n",
        );
        assert_eq!(for_report(&medium, 0), WARNINGS);
        assert_eq!(for_report(&medium, 99), CRITICAL_ISSUES);
    }
}
