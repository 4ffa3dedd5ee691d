//! Rules evaluation and scoring engine

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info, span, Level};

use super::catalog::{catalog, SecurityRule};
use super::results::{AuditReport, Category, CategoryScore, Finding, Grade, Severity};
use crate::parsers::{FileType, ParsedConfig};

/// Score every category starts from
pub const MAX_SCORE: u32 = 100;

/// Trait for rule categories
pub trait RuleCategory: Send + Sync {
    /// The category every rule of this provider belongs to
    fn category(&self) -> Category;

    /// The rules of this category, in report order
    fn rules(&self) -> Vec<SecurityRule>;
}

/// Evaluate every catalog rule against a parsed configuration.
///
/// All rules run, each exactly once, in catalog order.
pub fn evaluate(config: &ParsedConfig) -> Vec<Finding> {
    catalog()
        .iter()
        .map(|rule| {
            let span = span!(Level::DEBUG, "rule", id = rule.id, category = %rule.category);
            let _guard = span.enter();

            let result = rule.evaluate(config);
            debug!(passed = result.passed, evidence = %result.evidence, "Rule evaluated");
            Finding::new(rule, result)
        })
        .collect()
}

/// Score one category: 100 minus the deduction of every failed finding, floored at 0
pub fn score_category(category: Category, findings: Vec<Finding>) -> CategoryScore {
    let deductions: u32 = findings
        .iter()
        .filter(|f| !f.passed())
        .map(|f| f.severity().deduction())
        .sum();

    CategoryScore {
        category,
        score: MAX_SCORE.saturating_sub(deductions),
        max_score: MAX_SCORE,
        findings,
    }
}

/// Weighted average of the category scores, rounded half up.
///
/// Returns 0 when the weights sum to zero.
pub fn overall_score(categories: &[CategoryScore]) -> u32 {
    let total_weight: u32 = categories.iter().map(|c| c.category.weight()).sum();
    if total_weight == 0 {
        return 0;
    }

    let weighted: u32 = categories
        .iter()
        .map(|c| c.score * c.category.weight())
        .sum();

    // Integer form of round(weighted / total_weight) with halves rounding up
    (2 * weighted + total_weight) / (2 * total_weight)
}

/// Map a 0..=100 score to a letter grade
pub fn score_to_grade(score: u32) -> Grade {
    Grade::from_score(score)
}

/// Group findings by category and score the whole run
pub fn score(findings: Vec<Finding>, files_analyzed: Vec<FileType>) -> AuditReport {
    let mut grouped: BTreeMap<Category, Vec<Finding>> =
        Category::ALL.into_iter().map(|c| (c, Vec::new())).collect();
    for finding in &findings {
        grouped
            .entry(finding.category())
            .or_default()
            .push(finding.clone());
    }

    let categories: Vec<CategoryScore> = Category::ALL
        .into_iter()
        .map(|c| score_category(c, grouped.remove(&c).unwrap_or_default()))
        .collect();

    for category in &categories {
        debug!(
            category = %category.category,
            score = category.score,
            failed = category.failed().count(),
            "Category scored"
        );
    }

    let overall = overall_score(&categories);

    AuditReport {
        timestamp: Utc::now(),
        grade: score_to_grade(overall),
        overall_score: overall,
        categories,
        findings,
        files_analyzed,
    }
}

/// Run a full audit over parsed inputs
pub fn audit(config: &ParsedConfig) -> AuditReport {
    let files = config.provided_files();
    info!(
        files = files.len(),
        rules = catalog().len(),
        "Starting audit"
    );

    let report = score(evaluate(config), files);

    info!(
        "Audit complete: score {} (grade {}), {} critical, {} high, {} medium, {} info failures",
        report.overall_score,
        report.grade,
        report.count_failed_by_severity(Severity::Critical),
        report.count_failed_by_severity(Severity::High),
        report.count_failed_by_severity(Severity::Medium),
        report.count_failed_by_severity(Severity::Info),
    );

    report
}

/// Parse raw inputs and audit them
pub fn audit_sources(sources: &BTreeMap<FileType, String>) -> AuditReport {
    audit(&ParsedConfig::from_sources(sources))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::catalog::rule;
    use crate::rules::results::RuleResult;
    use std::collections::HashSet;

    fn finding(id: &str, passed: bool) -> Finding {
        let result = if passed {
            RuleResult::pass("ok")
        } else {
            RuleResult::fail("not ok")
        };
        Finding::new(rule(id).unwrap(), result)
    }

    fn category_score(category: Category, score: u32) -> CategoryScore {
        CategoryScore {
            category,
            score,
            max_score: MAX_SCORE,
            findings: Vec::new(),
        }
    }

    #[test]
    fn test_empty_config_scores_100() {
        let report = audit(&ParsedConfig::default());

        assert_eq!(report.overall_score, 100);
        assert_eq!(report.grade, Grade::A);
        assert_eq!(report.categories.len(), 6);
        assert!(report.categories.iter().all(|c| c.score == 100));
        assert!(report.files_analyzed.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn test_every_rule_reported_exactly_once() {
        let report = audit(&ParsedConfig::default());

        assert_eq!(report.findings.len(), catalog().len());
        let ids: HashSet<_> = report.findings.iter().map(|f| f.rule.id).collect();
        assert_eq!(ids.len(), catalog().len());
        assert!(catalog().iter().all(|r| ids.contains(r.id)));

        let grouped: usize = report.categories.iter().map(|c| c.findings.len()).sum();
        assert_eq!(grouped, catalog().len());
    }

    #[test]
    fn test_score_category_deductions() {
        let score = score_category(
            Category::Ssh,
            vec![
                finding("root-ssh-password", false),
                finding("ssh-default-port", false),
                finding("password-auth-enabled", false),
                finding("high-max-auth-tries", false),
            ],
        );
        assert_eq!(score.score, 15);
        assert_eq!(score.max_score, 100);
    }

    #[test]
    fn test_score_category_floors_at_zero() {
        let score = score_category(
            Category::Firewall,
            vec![
                finding("firewall-disabled", false),
                finding("firewall-disabled", false),
                finding("default-accept-input", false),
            ],
        );
        assert_eq!(score.score, 0);
    }

    #[test]
    fn test_category_score_is_monotonic() {
        let mut findings = vec![finding("privileged-containers", true)];
        let mut previous = score_category(Category::Container, findings.clone()).score;

        for id in ["privileged-containers", "container-nesting", "privileged-containers"] {
            findings.push(finding(id, false));
            let current = score_category(Category::Container, findings.clone()).score;
            assert!(current <= previous);
            previous = current;
        }
    }

    #[test]
    fn test_removing_only_failure_restores_100() {
        let failing = score_category(
            Category::Storage,
            vec![finding("nfs-no-root-squash", false), finding("cifs-world-readable", true)],
        );
        assert_eq!(failing.score, 75);

        let fixed = score_category(
            Category::Storage,
            vec![finding("nfs-no-root-squash", true), finding("cifs-world-readable", true)],
        );
        assert_eq!(fixed.score, 100);
    }

    #[test]
    fn test_overall_score_weighted_average() {
        let categories: Vec<_> = Category::ALL
            .into_iter()
            .map(|c| category_score(c, if c == Category::Ssh { 15 } else { 100 }))
            .collect();

        // (15 * 25 + 100 * 75) / 100 = 78.75
        assert_eq!(overall_score(&categories), 79);
    }

    #[test]
    fn test_overall_score_rounds_half_up() {
        let categories = vec![
            category_score(Category::Api, 1),
            category_score(Category::Api, 0),
        ];
        // (5 + 0) / 10 = 0.5
        assert_eq!(overall_score(&categories), 1);
    }

    #[test]
    fn test_overall_score_without_weight_is_zero() {
        assert_eq!(overall_score(&[]), 0);
    }

    #[test]
    fn test_score_to_grade_table() {
        for score in 0..=100 {
            let expected = match score {
                s if s >= 90 => Grade::A,
                s if s >= 80 => Grade::B,
                s if s >= 70 => Grade::C,
                s if s >= 60 => Grade::D,
                _ => Grade::F,
            };
            assert_eq!(score_to_grade(score), expected, "score {score}");
        }
    }

    #[test]
    fn test_rule_categories_match_catalog_order() {
        let order: Vec<Category> = crate::rules::catalog::rule_categories()
            .iter()
            .map(|c| c.category())
            .collect();
        assert_eq!(order, Category::ALL.to_vec());
    }
}
