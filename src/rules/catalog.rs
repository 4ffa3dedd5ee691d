//! The fixed security rule catalog
//!
//! Rules are plain data plus a pure evaluation function. The catalog is built
//! once, on first access, from the rule categories in report order.

use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashSet;

use super::categories::{
    api::ApiRules, auth::AuthRules, container::ContainerRules, firewall::FirewallRules,
    ssh::SshRules, storage::StorageRules,
};
use super::engine::RuleCategory;
use super::results::{Category, RuleResult, Severity};
use crate::parsers::ParsedConfig;

/// Signature of a rule's evaluation function
pub type Evaluate = fn(&ParsedConfig) -> RuleResult;

/// A single entry of the rule catalog
#[derive(Debug, Clone, Serialize)]
pub struct SecurityRule {
    /// Stable, globally unique identifier (e.g. `root-ssh-password`)
    pub id: &'static str,
    pub category: Category,
    pub severity: Severity,
    pub title: &'static str,
    pub description: &'static str,
    pub remediation: &'static str,
    /// Shell commands that fix the issue when the rule fails
    pub remediation_script: &'static str,
    /// External standard the rule maps to, if any
    pub reference: Option<&'static str>,
    #[serde(skip)]
    pub evaluate: Evaluate,
}

impl SecurityRule {
    pub fn evaluate(&self, config: &ParsedConfig) -> RuleResult {
        (self.evaluate)(config)
    }
}

lazy_static! {
    static ref CATALOG: Vec<SecurityRule> = build_catalog();
}

/// Every rule, in evaluation and report order
pub fn catalog() -> &'static [SecurityRule] {
    &CATALOG
}

/// Look up a rule by id
pub fn rule(id: &str) -> Option<&'static SecurityRule> {
    CATALOG.iter().find(|r| r.id == id)
}

/// Rule categories in report order
pub(crate) fn rule_categories() -> Vec<Box<dyn RuleCategory>> {
    vec![
        Box::new(SshRules),
        Box::new(FirewallRules),
        Box::new(AuthRules),
        Box::new(ContainerRules),
        Box::new(StorageRules),
        Box::new(ApiRules),
    ]
}

fn build_catalog() -> Vec<SecurityRule> {
    let mut rules = Vec::new();
    let mut seen = HashSet::new();

    for category in rule_categories() {
        for rule in category.rules() {
            // The catalog is static: a mismatch here is a programming error
            assert_eq!(
                rule.category,
                category.category(),
                "rule '{}' is registered under the wrong category",
                rule.id
            );
            assert!(seen.insert(rule.id), "duplicate rule id '{}'", rule.id);
            rules.push(rule);
        }
    }

    rules
}
