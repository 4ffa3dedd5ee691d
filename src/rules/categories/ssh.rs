//! SSH daemon rules
//!
//! Evaluated against the global scope of `sshd_config`. Directives missing
//! from a provided file take the OpenSSH defaults.

use super::setting;
use crate::parsers::{FileType, ParsedConfig, ParsedSsh};
use crate::rules::catalog::SecurityRule;
use crate::rules::engine::RuleCategory;
use crate::rules::results::{Category, RuleResult, Severity};

/// OpenSSH default for `MaxAuthTries`
pub const DEFAULT_MAX_AUTH_TRIES: u32 = 6;

/// OpenSSH default for `Port`
pub const DEFAULT_PORT: u16 = 22;

pub struct SshRules;

impl RuleCategory for SshRules {
    fn category(&self) -> Category {
        Category::Ssh
    }

    fn rules(&self) -> Vec<SecurityRule> {
        vec![
            SecurityRule {
                id: "root-ssh-password",
                category: Category::Ssh,
                severity: Severity::Critical,
                title: "Root can log in over SSH with a password",
                description: "PermitRootLogin allows root and PasswordAuthentication is not disabled, \
                              so the root account of the hypervisor is exposed to password guessing.",
                remediation: "Set 'PermitRootLogin prohibit-password' (or 'no') and \
                              'PasswordAuthentication no' in /etc/ssh/sshd_config, then reload sshd.",
                remediation_script: r#"sed -i -E 's/^#?\s*PermitRootLogin\s+.*/PermitRootLogin prohibit-password/' /etc/ssh/sshd_config
grep -qE '^PermitRootLogin' /etc/ssh/sshd_config || echo 'PermitRootLogin prohibit-password' >> /etc/ssh/sshd_config
sed -i -E 's/^#?\s*PasswordAuthentication\s+.*/PasswordAuthentication no/' /etc/ssh/sshd_config
grep -qE '^PasswordAuthentication' /etc/ssh/sshd_config || echo 'PasswordAuthentication no' >> /etc/ssh/sshd_config
sshd -t && systemctl reload ssh"#,
                reference: Some("CIS Benchmark 5.2 (SSH Server Configuration): disable root login"),
                evaluate: check_root_password_login,
            },
            SecurityRule {
                id: "ssh-default-port",
                category: Category::Ssh,
                severity: Severity::Medium,
                title: "SSH listens on the default port",
                description: "sshd listens on port 22, the first target of automated scanners and \
                              brute-force campaigns.",
                remediation: "Move sshd to a non-standard port and restrict access with the Proxmox \
                              firewall.",
                remediation_script: r#"sed -i -E 's/^#?\s*Port\s+.*/Port 2222/' /etc/ssh/sshd_config
grep -qE '^Port' /etc/ssh/sshd_config || echo 'Port 2222' >> /etc/ssh/sshd_config
sshd -t && systemctl reload ssh"#,
                reference: None,
                evaluate: check_default_port,
            },
            SecurityRule {
                id: "password-auth-enabled",
                category: Category::Ssh,
                severity: Severity::High,
                title: "SSH password authentication is enabled",
                description: "PasswordAuthentication is not set to 'no', so every account with a \
                              password can be attacked over SSH.",
                remediation: "Distribute SSH keys to administrators and set \
                              'PasswordAuthentication no' in /etc/ssh/sshd_config.",
                remediation_script: r#"sed -i -E 's/^#?\s*PasswordAuthentication\s+.*/PasswordAuthentication no/' /etc/ssh/sshd_config
grep -qE '^PasswordAuthentication' /etc/ssh/sshd_config || echo 'PasswordAuthentication no' >> /etc/ssh/sshd_config
sshd -t && systemctl reload ssh"#,
                reference: Some("CIS Benchmark 5.2 (SSH Server Configuration)"),
                evaluate: check_password_authentication,
            },
            SecurityRule {
                id: "high-max-auth-tries",
                category: Category::Ssh,
                severity: Severity::Medium,
                title: "SSH allows too many authentication attempts",
                description: "MaxAuthTries is above the OpenSSH default of 6, giving attackers more \
                              guesses per connection.",
                remediation: "Set 'MaxAuthTries 4' or lower in /etc/ssh/sshd_config.",
                remediation_script: r#"sed -i -E 's/^#?\s*MaxAuthTries\s+.*/MaxAuthTries 4/' /etc/ssh/sshd_config
grep -qE '^MaxAuthTries' /etc/ssh/sshd_config || echo 'MaxAuthTries 4' >> /etc/ssh/sshd_config
sshd -t && systemctl reload ssh"#,
                reference: Some("CIS Benchmark 5.2 (SSH Server Configuration): MaxAuthTries"),
                evaluate: check_max_auth_tries,
            },
        ]
    }
}

fn is_no(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("no"))
}

fn with_ssh(config: &ParsedConfig, check: impl FnOnce(&ParsedSsh) -> RuleResult) -> RuleResult {
    match &config.ssh {
        Some(ssh) => check(ssh),
        None => RuleResult::not_provided(FileType::SshdConfig),
    }
}

/// root-ssh-password
pub fn check_root_password_login(config: &ParsedConfig) -> RuleResult {
    with_ssh(config, |ssh| {
        let root = ssh.permit_root_login.as_deref();
        let password = ssh.password_authentication.as_deref();

        let root_allowed = root.map_or(true, |v| v.eq_ignore_ascii_case("yes"));
        let password_enabled = !is_no(password);

        let evidence = format!(
            "PermitRootLogin={}, PasswordAuthentication={}",
            setting(root, "yes"),
            setting(password, "yes")
        );

        if root_allowed && password_enabled {
            RuleResult::fail(evidence)
                .with_details("root can authenticate over SSH with a password")
        } else {
            RuleResult::pass(evidence)
        }
    })
}

/// ssh-default-port
pub fn check_default_port(config: &ParsedConfig) -> RuleResult {
    with_ssh(config, |ssh| match ssh.port {
        Some(port) if port != DEFAULT_PORT => RuleResult::pass(format!("Port={port}")),
        Some(port) => RuleResult::fail(format!("Port={port}")),
        None => RuleResult::fail(format!("Port={}", setting(ssh.directive("Port"), "22"))),
    })
}

/// password-auth-enabled
pub fn check_password_authentication(config: &ParsedConfig) -> RuleResult {
    with_ssh(config, |ssh| {
        let value = ssh.password_authentication.as_deref();
        let evidence = format!("PasswordAuthentication={}", setting(value, "yes"));

        if is_no(value) {
            RuleResult::pass(evidence)
        } else {
            RuleResult::fail(evidence)
        }
    })
}

/// high-max-auth-tries
pub fn check_max_auth_tries(config: &ParsedConfig) -> RuleResult {
    with_ssh(config, |ssh| match ssh.max_auth_tries {
        Some(tries) if tries > DEFAULT_MAX_AUTH_TRIES => RuleResult::fail(format!(
            "MaxAuthTries={tries} (maximum recommended {DEFAULT_MAX_AUTH_TRIES})"
        )),
        Some(tries) => RuleResult::pass(format!("MaxAuthTries={tries}")),
        None => RuleResult::pass(format!(
            "MaxAuthTries={}",
            setting(None, &DEFAULT_MAX_AUTH_TRIES.to_string())
        )),
    })
}
