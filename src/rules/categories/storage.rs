//! Storage backend rules (`storage.cfg`)
//!
//! Patterns are matched as literal, case-sensitive substrings of the full
//! option text of an entry, which includes identity directives such as
//! `username` and `share`.

use lazy_static::lazy_static;

use super::join;
use crate::parsers::{FileType, ParsedConfig, ParsedStorage, StorageEntry};
use crate::rules::catalog::SecurityRule;
use crate::rules::engine::RuleCategory;
use crate::rules::results::{Category, RuleResult, Severity};

lazy_static! {
    /// Option fragments that make a CIFS mount broadly accessible
    static ref CIFS_BROAD_PERMISSIONS: Vec<&'static str> = vec![
        "0777",
        "0666",
        "file_mode=0777",
        "dir_mode=0777",
        "guest",
        "sec=none",
    ];
}

pub struct StorageRules;

impl RuleCategory for StorageRules {
    fn category(&self) -> Category {
        Category::Storage
    }

    fn rules(&self) -> Vec<SecurityRule> {
        vec![
            SecurityRule {
                id: "nfs-no-root-squash",
                category: Category::Storage,
                severity: Severity::High,
                title: "NFS storage mounted with no_root_squash",
                description: "With no_root_squash, root on any client (including a compromised \
                              guest with access to the share) acts as root on the exported files.",
                remediation: "Remove no_root_squash from the storage options and from the export \
                              on the NFS server (use root_squash or all_squash).",
                remediation_script: r#"sed -i -E 's/,?no_root_squash//' /etc/pve/storage.cfg
# On the NFS server, replace no_root_squash in /etc/exports, then:
# exportfs -ra"#,
                reference: Some("exports(5): User ID Mapping"),
                evaluate: check_nfs_root_squash,
            },
            SecurityRule {
                id: "cifs-world-readable",
                category: Category::Storage,
                severity: Severity::Medium,
                title: "CIFS storage with broad permissions",
                description: "The CIFS mount uses world-writable modes, guest access or no \
                              authentication, so any local process can read backup and image \
                              data.",
                remediation: "Mount CIFS shares with authenticated credentials and restrictive \
                              file_mode/dir_mode (e.g. 0640/0750).",
                remediation_script: r#"sed -i -E 's/file_mode=0[67][67][67]/file_mode=0640/; s/dir_mode=0777/dir_mode=0750/; s/,?guest//; s/,?sec=none//' /etc/pve/storage.cfg
# Then provide credentials for the share:
# pvesm set <storage> --username <user> --password"#,
                reference: None,
                evaluate: check_cifs_permissions,
            },
        ]
    }
}

fn with_storage(config: &ParsedConfig, check: impl FnOnce(&ParsedStorage) -> RuleResult) -> RuleResult {
    match &config.storage {
        Some(storage) => check(storage),
        None => RuleResult::not_provided(FileType::StorageCfg),
    }
}

/// nfs-no-root-squash
pub fn check_nfs_root_squash(config: &ParsedConfig) -> RuleResult {
    with_storage(config, |storage| {
        let nfs: Vec<&StorageEntry> = storage.of_type("nfs").collect();
        if nfs.is_empty() {
            return RuleResult::pass("No NFS storage backends configured");
        }

        let offending: Vec<String> = nfs
            .iter()
            .filter(|e| e.option_text().contains("no_root_squash"))
            .map(|e| e.id.clone())
            .collect();

        if offending.is_empty() {
            RuleResult::pass(format!(
                "{} NFS backend(s), none with no_root_squash",
                nfs.len()
            ))
        } else {
            RuleResult::fail(format!("no_root_squash set on NFS storage: {}", join(&offending)))
        }
    })
}

/// cifs-world-readable
pub fn check_cifs_permissions(config: &ParsedConfig) -> RuleResult {
    with_storage(config, |storage| {
        let cifs: Vec<&StorageEntry> = storage.of_type("cifs").collect();
        if cifs.is_empty() {
            return RuleResult::pass("No CIFS storage backends configured");
        }

        let offending: Vec<String> = cifs
            .iter()
            .filter_map(|entry| {
                let options = entry.option_text();
                let matched: Vec<&str> = CIFS_BROAD_PERMISSIONS
                    .iter()
                    .copied()
                    .filter(|pattern| options.contains(pattern))
                    .collect();
                (!matched.is_empty()).then(|| format!("{} ({})", entry.id, matched.join(", ")))
            })
            .collect();

        if offending.is_empty() {
            RuleResult::pass(format!(
                "{} CIFS backend(s), none with broad permissions",
                cifs.len()
            ))
        } else {
            RuleResult::fail(format!(
                "Broad permissions on CIFS storage: {}",
                join(&offending)
            ))
        }
    })
}
