//! # Configuration Parsers
//!
//! One parser per supported file type, plus the aggregation of their results
//! into a single [`ParsedConfig`].
//!
//! | File type | Module | Sub-model |
//! |-----------|--------|-----------|
//! | `sshd_config` | [`ssh`] | [`ParsedSsh`] |
//! | `user.cfg` | [`auth`] | [`ParsedAuth`] |
//! | `cluster.fw` | [`firewall`] | [`ParsedFirewall`] |
//! | `iptables` | [`iptables`] | [`ParsedIptables`] |
//! | `lxc.conf` | [`containers`] | [`ParsedContainers`] |
//! | `storage.cfg` | [`storage`] | [`ParsedStorage`] |
//!
//! Every parser is a pure function of its input. Empty input yields the
//! default sub-model, and lines that cannot be understood are skipped.
//!
//! ## Examples
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use pveaudit::parsers::{FileType, ParsedConfig};
//!
//! let mut sources = BTreeMap::new();
//! sources.insert(FileType::SshdConfig, "PermitRootLogin no\n".to_string());
//!
//! let config = ParsedConfig::from_sources(&sources);
//! assert!(config.ssh.is_some());
//! assert!(config.firewall.is_none());
//! ```

pub mod auth;
pub mod containers;
pub mod firewall;
pub mod iptables;
pub mod ssh;
pub mod storage;

pub use auth::{ParsedAuth, PveAcl, PveGroup, PveToken, PveUser};
pub use containers::{ContainerConfig, ParsedContainers};
pub use firewall::{Direction, FirewallRule, ParsedFirewall};
pub use iptables::{IptablesChain, IptablesRule, ParsedIptables};
pub use ssh::ParsedSsh;
pub use storage::{ParsedStorage, StorageEntry};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// The six configuration files understood by the auditor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileType {
    #[serde(rename = "sshd_config")]
    SshdConfig,
    #[serde(rename = "user.cfg")]
    UserCfg,
    #[serde(rename = "cluster.fw")]
    ClusterFw,
    #[serde(rename = "iptables")]
    Iptables,
    #[serde(rename = "lxc.conf")]
    LxcConf,
    #[serde(rename = "storage.cfg")]
    StorageCfg,
}

impl FileType {
    pub const ALL: [FileType; 6] = [
        FileType::SshdConfig,
        FileType::UserCfg,
        FileType::ClusterFw,
        FileType::Iptables,
        FileType::LxcConf,
        FileType::StorageCfg,
    ];

    /// Identifier of the file type, which is also its conventional file name
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::SshdConfig => "sshd_config",
            FileType::UserCfg => "user.cfg",
            FileType::ClusterFw => "cluster.fw",
            FileType::Iptables => "iptables",
            FileType::LxcConf => "lxc.conf",
            FileType::StorageCfg => "storage.cfg",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown file type '{s}'"))
    }
}

/// A flag that may be affirmed, denied, or absent from the input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriState {
    Yes,
    No,
    #[default]
    Unspecified,
}

impl TriState {
    /// Interpret a present flag value (`1`, `true`, `yes`, `on` affirm it)
    pub fn from_flag(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => TriState::Yes,
            _ => TriState::No,
        }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriState::Yes => "yes",
            TriState::No => "no",
            TriState::Unspecified => "not set",
        };
        f.write_str(s)
    }
}

/// API token view derived from `user.cfg`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedApi {
    pub tokens: Vec<PveToken>,
    /// ACLs granted to token owners or to tokens themselves
    pub acls: Vec<PveAcl>,
}

impl ParsedApi {
    pub fn from_auth(auth: &ParsedAuth) -> Self {
        let acls = auth
            .acls
            .iter()
            .filter(|acl| {
                acl.subject.contains('!') || auth.tokens.iter().any(|t| t.user_id == acl.subject)
            })
            .cloned()
            .collect();

        Self {
            tokens: auth.tokens.clone(),
            acls,
        }
    }
}

/// Everything parsed from one set of inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedConfig {
    pub ssh: Option<ParsedSsh>,
    pub firewall: Option<ParsedFirewall>,
    pub auth: Option<ParsedAuth>,
    pub containers: Option<ParsedContainers>,
    pub api: Option<ParsedApi>,
    pub storage: Option<ParsedStorage>,
    pub iptables: Option<ParsedIptables>,
    /// Raw text per file type, empty when not provided
    pub raw: BTreeMap<FileType, String>,
}

impl ParsedConfig {
    /// Parse every provided input; missing file types stay `None`
    pub fn from_sources(sources: &BTreeMap<FileType, String>) -> Self {
        let raw: BTreeMap<FileType, String> = FileType::ALL
            .into_iter()
            .map(|t| (t, sources.get(&t).cloned().unwrap_or_default()))
            .collect();

        let provided = |t: FileType| raw.get(&t).map(String::as_str).filter(|s| !s.trim().is_empty());

        let ssh = provided(FileType::SshdConfig).map(ssh::parse);
        let auth = provided(FileType::UserCfg).map(auth::parse);
        let firewall = provided(FileType::ClusterFw).map(firewall::parse);
        let iptables = provided(FileType::Iptables).map(iptables::parse);
        let containers = provided(FileType::LxcConf).map(containers::parse);
        let storage = provided(FileType::StorageCfg).map(storage::parse);
        let api = auth.as_ref().map(ParsedApi::from_auth);

        debug!(
            ssh_directives = ssh.as_ref().map_or(0, |s| s.directives.len()),
            users = auth.as_ref().map_or(0, |a| a.users.len()),
            tokens = auth.as_ref().map_or(0, |a| a.tokens.len()),
            firewall_rules = firewall.as_ref().map_or(0, |f| f.rules.len()),
            iptables_chains = iptables.as_ref().map_or(0, |i| i.chains.len()),
            containers = containers.as_ref().map_or(0, |c| c.containers.len()),
            storage_entries = storage.as_ref().map_or(0, |s| s.entries.len()),
            "Parsed configuration inputs"
        );

        Self {
            ssh,
            firewall,
            auth,
            containers,
            api,
            storage,
            iptables,
            raw,
        }
    }

    /// Like [`ParsedConfig::from_sources`], keyed by file type identifier.
    /// Unknown identifiers are ignored.
    pub fn from_named_sources(sources: &HashMap<String, String>) -> Self {
        let mut typed = BTreeMap::new();
        for (name, content) in sources {
            match name.parse::<FileType>() {
                Ok(file_type) => {
                    typed.insert(file_type, content.clone());
                }
                Err(e) => warn!(error = %e, "Ignoring input"),
            }
        }
        Self::from_sources(&typed)
    }

    /// File types that had non-empty input
    pub fn provided_files(&self) -> Vec<FileType> {
        self.raw
            .iter()
            .filter(|(_, content)| !content.trim().is_empty())
            .map(|(file_type, _)| *file_type)
            .collect()
    }
}
