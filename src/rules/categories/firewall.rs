//! Firewall rules
//!
//! Evaluated against the cluster firewall (`cluster.fw`) and, where the
//! cluster file says nothing about the input policy, the host packet filter
//! dump. An explicit cluster `policy_in` always takes precedence over the
//! packet filter.

use crate::parsers::{FileType, ParsedConfig, TriState};
use crate::rules::catalog::SecurityRule;
use crate::rules::engine::RuleCategory;
use crate::rules::results::{Category, RuleResult, Severity};

/// Proxmox VE default for `policy_in`
pub const DEFAULT_POLICY_IN: &str = "DROP";

pub struct FirewallRules;

impl RuleCategory for FirewallRules {
    fn category(&self) -> Category {
        Category::Firewall
    }

    fn rules(&self) -> Vec<SecurityRule> {
        vec![
            SecurityRule {
                id: "firewall-disabled",
                category: Category::Firewall,
                severity: Severity::Critical,
                title: "Cluster firewall is disabled",
                description: "The datacenter-level firewall is not enabled, so no host or guest \
                              firewall rules are enforced.",
                remediation: "Enable the firewall under Datacenter > Firewall > Options (make sure \
                              rules allowing SSH and port 8006 from your management network exist \
                              first).",
                remediation_script: r#"grep -q '^\[OPTIONS\]' /etc/pve/firewall/cluster.fw || printf '[OPTIONS]\n' >> /etc/pve/firewall/cluster.fw
sed -i -E 's/^enable:\s*0/enable: 1/' /etc/pve/firewall/cluster.fw
grep -qE '^enable:' /etc/pve/firewall/cluster.fw || sed -i '/^\[OPTIONS\]/a enable: 1' /etc/pve/firewall/cluster.fw
pve-firewall compile >/dev/null && pve-firewall restart"#,
                reference: Some("Proxmox VE Administration Guide: Firewall"),
                evaluate: check_firewall_enabled,
            },
            SecurityRule {
                id: "default-accept-input",
                category: Category::Firewall,
                severity: Severity::High,
                title: "Inbound traffic is accepted by default",
                description: "The default input policy is ACCEPT, so any service listening on the \
                              host is reachable unless a rule explicitly blocks it.",
                remediation: "Set 'policy_in: DROP' in the cluster firewall options and allow only \
                              the required services.",
                remediation_script: r#"sed -i -E 's/^policy_in:\s*ACCEPT/policy_in: DROP/I' /etc/pve/firewall/cluster.fw
grep -qE '^policy_in:' /etc/pve/firewall/cluster.fw || sed -i '/^\[OPTIONS\]/a policy_in: DROP' /etc/pve/firewall/cluster.fw
pve-firewall compile >/dev/null && pve-firewall restart"#,
                reference: Some("Proxmox VE Administration Guide: Firewall"),
                evaluate: check_default_input_policy,
            },
            SecurityRule {
                id: "no-firewall-rules",
                category: Category::Firewall,
                severity: Severity::Medium,
                title: "Cluster firewall has no rules",
                description: "The cluster firewall configuration defines no rules, so only the \
                              default policies decide what traffic is allowed.",
                remediation: "Add explicit rules for the management services (SSH, web UI on \
                              8006) restricted to trusted networks.",
                remediation_script: r#"grep -q '^\[RULES\]' /etc/pve/firewall/cluster.fw || printf '\n[RULES]\n' >> /etc/pve/firewall/cluster.fw
cat >> /etc/pve/firewall/cluster.fw <<'EOF'
IN ACCEPT -source +management -p tcp -dport 8006 # web UI
IN ACCEPT -source +management -p tcp -dport 22 # SSH
EOF
pve-firewall compile >/dev/null && pve-firewall restart"#,
                reference: None,
                evaluate: check_firewall_rules_present,
            },
        ]
    }
}

/// firewall-disabled
pub fn check_firewall_enabled(config: &ParsedConfig) -> RuleResult {
    let Some(firewall) = &config.firewall else {
        return RuleResult::not_provided(FileType::ClusterFw);
    };

    if firewall.is_empty() {
        return RuleResult::fail("cluster.fw contains no recognisable firewall configuration")
            .with_details("no [OPTIONS], [RULES], [IPSET] or [ALIASES] content could be parsed");
    }

    let raw = firewall
        .options
        .get("enable")
        .map(String::as_str)
        .unwrap_or("not set");
    let evidence = format!("enable: {raw}");

    match firewall.enabled {
        TriState::Yes => RuleResult::pass(evidence),
        TriState::No => RuleResult::fail(evidence),
        TriState::Unspecified => {
            RuleResult::fail(evidence).with_details("the cluster firewall is disabled by default")
        }
    }
}

/// default-accept-input
pub fn check_default_input_policy(config: &ParsedConfig) -> RuleResult {
    let chain_policy = config
        .iptables
        .as_ref()
        .and_then(|i| i.filter_chain("INPUT"))
        .map(|c| c.policy.to_ascii_uppercase());

    let cluster_policy = config.firewall.as_ref().and_then(|f| f.policy_in.as_deref());

    if let Some(policy) = cluster_policy {
        let evidence = format!("policy_in: {policy}");
        if policy == "ACCEPT" {
            return RuleResult::fail(evidence);
        }
        let result = RuleResult::pass(evidence);
        return match chain_policy.as_deref() {
            Some("ACCEPT") => result.with_details(
                "iptables INPUT chain policy is ACCEPT; the cluster firewall policy takes precedence",
            ),
            _ => result,
        };
    }

    let cluster_note = if config.firewall.is_some() {
        format!("policy_in not set in cluster.fw (default {DEFAULT_POLICY_IN})")
    } else {
        format!("cluster.fw not provided (default policy_in {DEFAULT_POLICY_IN})")
    };

    match chain_policy {
        Some(policy) if policy == "ACCEPT" => {
            RuleResult::fail(format!("{cluster_note}; iptables INPUT chain policy ACCEPT"))
        }
        Some(policy) => {
            RuleResult::pass(format!("{cluster_note}; iptables INPUT chain policy {policy}"))
        }
        None => RuleResult::pass(cluster_note),
    }
}

/// no-firewall-rules
pub fn check_firewall_rules_present(config: &ParsedConfig) -> RuleResult {
    let Some(firewall) = &config.firewall else {
        return RuleResult::not_provided(FileType::ClusterFw);
    };

    let total = firewall.rules.len();
    if total == 0 {
        return RuleResult::fail("cluster.fw defines 0 firewall rules");
    }

    let enabled = firewall.enabled_rules().count();
    RuleResult::pass(format!(
        "cluster.fw defines {total} firewall rule(s), {enabled} enabled"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config(entries: &[(FileType, &str)]) -> ParsedConfig {
        let sources: BTreeMap<_, _> = entries.iter().map(|(t, s)| (*t, s.to_string())).collect();
        ParsedConfig::from_sources(&sources)
    }

    const SECURE_FW: &str = "[OPTIONS]\nenable: 1\npolicy_in: DROP\n[RULES]\nIN ACCEPT -p tcp -dport 22\n";

    #[test]
    fn test_rules_pass_without_input() {
        let empty = ParsedConfig::default();
        for rule in FirewallRules.rules() {
            assert!(rule.evaluate(&empty).passed, "{}", rule.id);
        }
    }

    #[test]
    fn test_secure_cluster_firewall_passes() {
        let config = config(&[(FileType::ClusterFw, SECURE_FW)]);

        assert!(check_firewall_enabled(&config).passed);
        assert!(check_default_input_policy(&config).passed);
        let rules = check_firewall_rules_present(&config);
        assert!(rules.passed);
        assert_eq!(rules.evidence, "cluster.fw defines 1 firewall rule(s), 1 enabled");
    }

    #[test]
    fn test_disabled_and_unset_firewall_fail() {
        let disabled = config(&[(FileType::ClusterFw, "[OPTIONS]\nenable: 0\n")]);
        let result = check_firewall_enabled(&disabled);
        assert!(!result.passed);
        assert_eq!(result.evidence, "enable: 0");

        let unset = config(&[(FileType::ClusterFw, "[OPTIONS]\npolicy_in: DROP\n")]);
        let result = check_firewall_enabled(&unset);
        assert!(!result.passed);
        assert_eq!(result.evidence, "enable: not set");
    }

    #[test]
    fn test_unparseable_firewall_fails() {
        let config = config(&[(FileType::ClusterFw, "garbage without sections\n")]);
        assert!(!check_firewall_enabled(&config).passed);
        assert!(!check_firewall_rules_present(&config).passed);
    }

    #[test]
    fn test_accept_policy_fails() {
        let config = config(&[(FileType::ClusterFw, "[OPTIONS]\nenable: 1\npolicy_in: accept\n")]);

        let result = check_default_input_policy(&config);
        assert!(!result.passed);
        assert_eq!(result.evidence, "policy_in: ACCEPT");
    }

    #[test]
    fn test_iptables_consulted_when_cluster_policy_unset() {
        let config = config(&[
            (FileType::ClusterFw, "[OPTIONS]\nenable: 1\n"),
            (FileType::Iptables, "*filter\n:INPUT ACCEPT [0:0]\nCOMMIT\n"),
        ]);

        let result = check_default_input_policy(&config);
        assert!(!result.passed);
        assert!(result.evidence.contains("iptables INPUT chain policy ACCEPT"));
    }

    #[test]
    fn test_iptables_only() {
        let accept = config(&[(FileType::Iptables, "Chain INPUT (policy ACCEPT)\ntarget prot opt source destination\n")]);
        assert!(!check_default_input_policy(&accept).passed);

        let drop = config(&[(FileType::Iptables, "Chain INPUT (policy DROP)\n")]);
        assert!(check_default_input_policy(&drop).passed);
    }

    #[test]
    fn test_cluster_policy_takes_precedence_over_iptables() {
        let config = config(&[
            (FileType::ClusterFw, SECURE_FW),
            (FileType::Iptables, "*filter\n:INPUT ACCEPT [0:0]\nCOMMIT\n"),
        ]);

        let result = check_default_input_policy(&config);
        assert!(result.passed);
        assert!(result.details.unwrap().contains("takes precedence"));
    }

    #[test]
    fn test_no_policy_anywhere_defaults_to_drop() {
        let config = config(&[(FileType::ClusterFw, "[OPTIONS]\nenable: 1\n")]);

        let result = check_default_input_policy(&config);
        assert!(result.passed);
        assert_eq!(result.evidence, "policy_in not set in cluster.fw (default DROP)");
    }

    #[test]
    fn test_empty_rule_list_fails() {
        let config = config(&[(FileType::ClusterFw, "[OPTIONS]\nenable: 1\n[RULES]\n")]);

        let result = check_firewall_rules_present(&config);
        assert!(!result.passed);
        assert_eq!(result.evidence, "cluster.fw defines 0 firewall rules");
    }
}
