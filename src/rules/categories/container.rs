//! LXC container rules

use super::join;
use crate::parsers::{ContainerConfig, FileType, ParsedConfig, ParsedContainers, TriState};
use crate::rules::catalog::SecurityRule;
use crate::rules::engine::RuleCategory;
use crate::rules::results::{Category, RuleResult, Severity};

pub struct ContainerRules;

impl RuleCategory for ContainerRules {
    fn category(&self) -> Category {
        Category::Container
    }

    fn rules(&self) -> Vec<SecurityRule> {
        vec![
            SecurityRule {
                id: "privileged-containers",
                category: Category::Container,
                severity: Severity::High,
                title: "Privileged containers",
                description: "Containers without 'unprivileged: 1' run with root in the container \
                              mapped to root on the host, so a container escape compromises the \
                              hypervisor.",
                remediation: "Recreate the container as unprivileged (backup, then restore with \
                              --unprivileged 1). Set 'unprivileged: 1' explicitly on new \
                              containers.",
                remediation_script: r#"# For each privileged container <id>:
vzdump <id> --mode stop --storage local --compress zstd
# pct restore <newid> /var/lib/vz/dump/vzdump-lxc-<id>-*.tar.zst --unprivileged 1
# pct destroy <id>"#,
                reference: Some("Proxmox VE Administration Guide: Unprivileged Containers"),
                evaluate: check_privileged,
            },
            SecurityRule {
                id: "container-nesting",
                category: Category::Container,
                severity: Severity::Medium,
                title: "Container nesting enabled",
                description: "The nesting feature exposes procfs and sysfs of the host to the \
                              container, widening the attack surface for an escape.",
                remediation: "Disable 'nesting' in the container features unless the container \
                              runs Docker or systemd services that require it.",
                remediation_script: r#"# For each container <id> with nesting enabled:
pct set <id> --features nesting=0
pct reboot <id>"#,
                reference: None,
                evaluate: check_nesting,
            },
        ]
    }
}

fn with_containers(
    config: &ParsedConfig,
    check: impl FnOnce(&ParsedContainers) -> RuleResult,
) -> RuleResult {
    match &config.containers {
        Some(containers) => check(containers),
        None => RuleResult::not_provided(FileType::LxcConf),
    }
}

fn labels<'a>(containers: impl Iterator<Item = &'a ContainerConfig>) -> Vec<String> {
    containers.map(ContainerConfig::label).collect()
}

/// privileged-containers
pub fn check_privileged(config: &ParsedConfig) -> RuleResult {
    with_containers(config, |parsed| {
        let total = parsed.containers.len();
        let privileged = labels(parsed.containers.iter().filter(|c| c.is_privileged()));

        if privileged.is_empty() {
            return RuleResult::pass(format!("All {total} container(s) are unprivileged"));
        }

        let evidence = format!(
            "{} of {total} container(s) privileged: {}",
            privileged.len(),
            join(&privileged)
        );
        let unset = labels(
            parsed
                .containers
                .iter()
                .filter(|c| c.unprivileged == TriState::Unspecified),
        );

        if unset.is_empty() {
            RuleResult::fail(evidence)
        } else {
            RuleResult::fail(evidence).with_details(format!(
                "'unprivileged' not set (privileged by default): {}",
                join(&unset)
            ))
        }
    })
}

/// container-nesting
pub fn check_nesting(config: &ParsedConfig) -> RuleResult {
    with_containers(config, |parsed| {
        let nested = labels(parsed.containers.iter().filter(|c| c.nesting));

        if nested.is_empty() {
            RuleResult::pass(format!(
                "Nesting disabled on all {} container(s)",
                parsed.containers.len()
            ))
        } else {
            RuleResult::fail(format!("Nesting enabled on: {}", join(&nested)))
        }
    })
}
