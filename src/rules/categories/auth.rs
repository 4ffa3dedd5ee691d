//! Authentication and authorization rules (`user.cfg`)

use super::join;
use crate::parsers::{FileType, ParsedAuth, ParsedConfig};
use crate::rules::catalog::SecurityRule;
use crate::rules::engine::RuleCategory;
use crate::rules::results::{Category, RuleResult, Severity};

/// The built-in superuser
pub const ROOT_USER: &str = "root@pam";

/// Role granting every privilege on its path
pub const ADMINISTRATOR_ROLE: &str = "Administrator";

pub struct AuthRules;

impl RuleCategory for AuthRules {
    fn category(&self) -> Category {
        Category::Auth
    }

    fn rules(&self) -> Vec<SecurityRule> {
        vec![
            SecurityRule {
                id: "no-2fa-users",
                category: Category::Auth,
                severity: Severity::High,
                title: "Users without two-factor authentication",
                description: "Enabled accounts can log in to the web UI and API with a password \
                              alone.",
                remediation: "Enroll a TOTP or WebAuthn second factor for every enabled user, \
                              starting with root@pam (Datacenter > Permissions > Two Factor).",
                remediation_script: r#"# List enabled users without a second factor, then enroll one per user
pveum user list --output-format json | jq -r '.[] | select(.enable != 0) | .userid'
pveum user tfa list
# Interactive enrollment is done per user in the web UI or with:
# pveum user tfa add <userid> --type totp"#,
                reference: Some("Proxmox VE Administration Guide: Two-Factor Authentication"),
                evaluate: check_two_factor,
            },
            SecurityRule {
                id: "root-api-tokens",
                category: Category::Auth,
                severity: Severity::High,
                title: "API tokens owned by root@pam",
                description: "Tokens of the superuser inherit unrestricted access to the whole \
                              cluster and are not bound to a second factor.",
                remediation: "Create a dedicated service user with only the required roles, issue \
                              tokens for it, and delete the root@pam tokens.",
                remediation_script: r#"pveum user add automation@pve --comment 'API automation'
pveum user token add automation@pve automation --privsep 1
# Review, then remove every root@pam token:
pveum user token list root@pam
# pveum user token remove root@pam <tokenid>"#,
                reference: None,
                evaluate: check_root_tokens,
            },
            SecurityRule {
                id: "overpermissive-roles",
                category: Category::Auth,
                severity: Severity::Medium,
                title: "Administrator role granted to non-root subjects",
                description: "Users, groups or tokens other than root@pam hold the Administrator \
                              role, which grants every privilege on its path.",
                remediation: "Replace Administrator grants with the narrowest built-in or custom \
                              role that covers the task (e.g. PVEVMAdmin, PVEAuditor).",
                remediation_script: r#"pveum acl list
# For each non-root Administrator grant:
# pveum acl delete <path> --users <subject> --roles Administrator
# pveum acl modify <path> --users <subject> --roles PVEVMAdmin"#,
                reference: Some("Proxmox VE Administration Guide: User Management, Permissions"),
                evaluate: check_administrator_grants,
            },
        ]
    }
}

fn with_auth(config: &ParsedConfig, check: impl FnOnce(&ParsedAuth) -> RuleResult) -> RuleResult {
    match &config.auth {
        Some(auth) => check(auth),
        None => RuleResult::not_provided(FileType::UserCfg),
    }
}

/// no-2fa-users
pub fn check_two_factor(config: &ParsedConfig) -> RuleResult {
    with_auth(config, |auth| {
        let enabled: Vec<_> = auth.users.iter().filter(|u| u.is_enabled()).collect();
        let without: Vec<String> = enabled
            .iter()
            .filter(|u| u.id != ROOT_USER && !u.has_tfa())
            .map(|u| u.id.clone())
            .collect();
        let root_without = enabled
            .iter()
            .any(|u| u.id == ROOT_USER && !u.has_tfa());

        if without.is_empty() && !root_without {
            return RuleResult::pass(format!(
                "All {} enabled user(s) have a second factor",
                enabled.len()
            ));
        }

        let mut parts = Vec::new();
        if root_without {
            parts.push(format!("{ROOT_USER} has no second factor"));
        }
        if !without.is_empty() {
            parts.push(format!(
                "{} enabled user(s) without a second factor: {}",
                without.len(),
                join(&without)
            ));
        }
        RuleResult::fail(parts.join("; "))
    })
}

/// root-api-tokens
pub fn check_root_tokens(config: &ParsedConfig) -> RuleResult {
    with_auth(config, |auth| {
        let root_tokens: Vec<String> = auth
            .tokens
            .iter()
            .filter(|t| t.user_id == ROOT_USER)
            .map(|t| t.full_id())
            .collect();

        if root_tokens.is_empty() {
            RuleResult::pass(format!(
                "No API tokens owned by {ROOT_USER} ({} token(s) total)",
                auth.tokens.len()
            ))
        } else {
            RuleResult::fail(format!("Tokens owned by {ROOT_USER}: {}", join(&root_tokens)))
        }
    })
}

/// overpermissive-roles
pub fn check_administrator_grants(config: &ParsedConfig) -> RuleResult {
    with_auth(config, |auth| {
        let grants: Vec<String> = auth
            .acls
            .iter()
            .filter(|acl| acl.role == ADMINISTRATOR_ROLE && acl.subject != ROOT_USER)
            .map(|acl| format!("{} on {}", acl.subject, acl.path))
            .collect();

        if grants.is_empty() {
            RuleResult::pass(format!(
                "No {ADMINISTRATOR_ROLE} grants to subjects other than {ROOT_USER}"
            ))
        } else {
            RuleResult::fail(format!("{ADMINISTRATOR_ROLE} granted to: {}", join(&grants)))
        }
    })
}
