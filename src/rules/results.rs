//! # Audit Results Structures
//!
//! This module defines the data structures produced by an audit run.
//!
//! ## Overview
//!
//! - [`Severity`] - Rule severity levels and their score deductions
//! - [`Category`] - The six security domains and their weights
//! - [`RuleResult`] - Outcome of evaluating one rule
//! - [`Finding`] - A catalog rule paired with its result
//! - [`CategoryScore`] - Score of one category
//! - [`Grade`] - Letter grade of the overall score
//! - [`AuditReport`] - Complete, serializable result of an audit run
//!
//! ## Examples
//!
//! ```rust
//! use pveaudit::rules::{RuleResult, Severity};
//!
//! let result = RuleResult::fail("PermitRootLogin=yes")
//!     .with_details("Root may log in over SSH with a password");
//! assert!(!result.passed);
//! assert_eq!(Severity::Critical.deduction(), 40);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::catalog::SecurityRule;
use crate::parsers::FileType;

/// Severity levels for security rules.
///
/// Each failed finding subtracts the severity's deduction from its category
/// score:
///
/// | Severity | Deduction |
/// |----------|-----------|
/// | Critical | 40 |
/// | High | 25 |
/// | Medium | 10 |
/// | Info | 5 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Direct path to host compromise
    Critical,
    /// Significant weakening of the security posture
    High,
    /// Hardening recommendation
    Medium,
    /// Informational
    Info,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Info,
    ];

    /// Points subtracted from the category score per failed finding
    pub fn deduction(&self) -> u32 {
        match self {
            Severity::Critical => 40,
            Severity::High => 25,
            Severity::Medium => 10,
            Severity::Info => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security domains used for grouping and weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ssh,
    Firewall,
    Auth,
    Container,
    Storage,
    Api,
}

impl Category {
    /// Report order
    pub const ALL: [Category; 6] = [
        Category::Ssh,
        Category::Firewall,
        Category::Auth,
        Category::Container,
        Category::Storage,
        Category::Api,
    ];

    /// Weight of the category in the overall score; the weights sum to 100
    pub fn weight(&self) -> u32 {
        match self {
            Category::Ssh => 25,
            Category::Auth => 20,
            Category::Firewall => 25,
            Category::Container => 15,
            Category::Storage => 10,
            Category::Api => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ssh => "ssh",
            Category::Firewall => "firewall",
            Category::Auth => "auth",
            Category::Container => "container",
            Category::Storage => "storage",
            Category::Api => "api",
        }
    }

    /// Human readable title
    pub fn title(&self) -> &'static str {
        match self {
            Category::Ssh => "SSH",
            Category::Firewall => "Firewall",
            Category::Auth => "Authentication",
            Category::Container => "Containers",
            Category::Storage => "Storage",
            Category::Api => "API Tokens",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one rule.
///
/// `evidence` always states what was observed, not just whether the rule
/// passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    pub passed: bool,
    pub evidence: String,
    pub details: Option<String>,
}

impl RuleResult {
    pub fn pass(evidence: impl Into<String>) -> Self {
        Self {
            passed: true,
            evidence: evidence.into(),
            details: None,
        }
    }

    pub fn fail(evidence: impl Into<String>) -> Self {
        Self {
            passed: false,
            evidence: evidence.into(),
            details: None,
        }
    }

    /// Passing result for a rule whose input file was not supplied
    pub fn not_provided(file_type: FileType) -> Self {
        Self::pass(format!("{file_type} not provided; nothing to evaluate"))
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// A catalog rule paired with its result for one audit run
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub rule: &'static SecurityRule,
    pub result: RuleResult,
}

impl Finding {
    pub fn new(rule: &'static SecurityRule, result: RuleResult) -> Self {
        Self { rule, result }
    }

    pub fn passed(&self) -> bool {
        self.result.passed
    }

    pub fn severity(&self) -> Severity {
        self.rule.severity
    }

    pub fn category(&self) -> Category {
        self.rule.category
    }
}

/// Score of a single category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryScore {
    pub category: Category,
    /// 0..=100
    pub score: u32,
    pub max_score: u32,
    pub findings: Vec<Finding>,
}

impl CategoryScore {
    pub fn failed(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.passed())
    }
}

/// Letter grade of an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Map a 0..=100 score to a grade; lower bounds are inclusive
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete result of an audit run.
///
/// Every catalog rule appears exactly once in `findings`, and `categories`
/// always holds all six categories in [`Category::ALL`] order.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub timestamp: DateTime<Utc>,
    pub grade: Grade,
    pub overall_score: u32,
    pub categories: Vec<CategoryScore>,
    pub findings: Vec<Finding>,
    /// File types that had non-empty input
    pub files_analyzed: Vec<FileType>,
}

impl AuditReport {
    pub fn finding(&self, rule_id: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.rule.id == rule_id)
    }

    pub fn category(&self, category: Category) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn failed(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.passed())
    }

    pub fn count_failed_by_severity(&self, severity: Severity) -> usize {
        self.failed().filter(|f| f.severity() == severity).count()
    }

    pub fn has_critical_failure(&self) -> bool {
        self.count_failed_by_severity(Severity::Critical) > 0
    }

    pub fn is_clean(&self) -> bool {
        self.failed().next().is_none()
    }
}
