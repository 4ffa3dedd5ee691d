//! API token rules
//!
//! Tokens are read from the API view derived from `user.cfg`. Role lookups for
//! a token owner go through the full ACL list, including group grants.

use super::join;
use crate::parsers::{FileType, ParsedConfig, PveToken, TriState};
use crate::rules::catalog::SecurityRule;
use crate::rules::engine::RuleCategory;
use crate::rules::results::{Category, RuleResult, Severity};

/// Roles that make a token owner an administrator
pub const ADMIN_ROLES: &[&str] = &["Administrator", "PVEAdmin"];

pub struct ApiRules;

impl RuleCategory for ApiRules {
    fn category(&self) -> Category {
        Category::Api
    }

    fn rules(&self) -> Vec<SecurityRule> {
        vec![
            SecurityRule {
                id: "api-token-privsep",
                category: Category::Api,
                severity: Severity::High,
                title: "Admin API tokens without privilege separation",
                description: "Tokens with privilege separation disabled carry every permission of \
                              their owner. For an administrator this is full cluster control behind \
                              a single static secret.",
                remediation: "Recreate the token with privilege separation enabled and grant it \
                              only the roles it needs.",
                remediation_script: r#"# For each listed token <user>!<name>:
pveum user token remove <user> <name>
pveum user token add <user> <name> --privsep 1
pveum acl modify / --tokens '<user>!<name>' --roles PVEAuditor"#,
                reference: Some("Proxmox VE Administration Guide: API Tokens"),
                evaluate: check_token_privsep,
            },
            SecurityRule {
                id: "api-token-no-expiry",
                category: Category::Api,
                severity: Severity::Medium,
                title: "API tokens without expiry",
                description: "Tokens that never expire stay valid indefinitely if leaked.",
                remediation: "Set an expiration date on every API token and rotate tokens before \
                              they expire.",
                remediation_script: r#"# For each listed token <user>!<name>, expire in 90 days:
pveum user token modify <user> <name> --expire $(date -d '+90 days' +%s)"#,
                reference: None,
                evaluate: check_token_expiry,
            },
        ]
    }
}

/// api-token-privsep
pub fn check_token_privsep(config: &ParsedConfig) -> RuleResult {
    let (Some(api), Some(auth)) = (&config.api, &config.auth) else {
        return RuleResult::not_provided(FileType::UserCfg);
    };
    if api.tokens.is_empty() {
        return RuleResult::pass("No API tokens defined");
    }

    let is_admin = |token: &PveToken| {
        auth.roles_of(&token.user_id)
            .iter()
            .any(|role| ADMIN_ROLES.contains(role))
    };

    let unrestricted: Vec<String> = api
        .tokens
        .iter()
        .filter(|t| t.privsep != TriState::Yes && is_admin(t))
        .map(|t| format!("{} (privsep {})", t.full_id(), t.privsep))
        .collect();

    if unrestricted.is_empty() {
        RuleResult::pass(format!(
            "{} token(s), none unrestricted with admin rights",
            api.tokens.len()
        ))
    } else {
        RuleResult::fail(format!(
            "Admin tokens without privilege separation: {}",
            join(&unrestricted)
        ))
    }
}

/// api-token-no-expiry
pub fn check_token_expiry(config: &ParsedConfig) -> RuleResult {
    let Some(api) = &config.api else {
        return RuleResult::not_provided(FileType::UserCfg);
    };
    if api.tokens.is_empty() {
        return RuleResult::pass("No API tokens defined");
    }

    let eternal: Vec<String> = api
        .tokens
        .iter()
        .filter(|t| t.never_expires())
        .map(PveToken::full_id)
        .collect();

    if eternal.is_empty() {
        RuleResult::pass(format!("All {} token(s) have an expiry", api.tokens.len()))
    } else {
        RuleResult::fail(format!(
            "{} of {} token(s) never expire: {}",
            eternal.len(),
            api.tokens.len(),
            join(&eternal)
        ))
    }
}
