//! Configuration module
//!
//! `.pveaudit.toml` names the files to audit and the report defaults. Every
//! field is optional; an absent file or table falls back to [`Config::default`].

pub mod loader;

pub use loader::{Config, CONFIG_FILENAME};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::parsers::FileType;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
    Markdown,
}

/// Location of each input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPaths {
    #[serde(default)]
    pub sshd_config: Option<PathBuf>,
    #[serde(default)]
    pub user_cfg: Option<PathBuf>,
    #[serde(default)]
    pub cluster_fw: Option<PathBuf>,
    /// Saved `iptables-save` or `iptables -L -n` output
    #[serde(default)]
    pub iptables: Option<PathBuf>,
    /// One or more container configs, concatenated
    #[serde(default)]
    pub lxc_conf: Option<PathBuf>,
    #[serde(default)]
    pub storage_cfg: Option<PathBuf>,
}

impl Default for InputPaths {
    /// Standard locations on a Proxmox VE node
    fn default() -> Self {
        Self {
            sshd_config: Some(PathBuf::from("/etc/ssh/sshd_config")),
            user_cfg: Some(PathBuf::from("/etc/pve/user.cfg")),
            cluster_fw: Some(PathBuf::from("/etc/pve/firewall/cluster.fw")),
            iptables: None,
            lxc_conf: None,
            storage_cfg: Some(PathBuf::from("/etc/pve/storage.cfg")),
        }
    }
}

impl InputPaths {
    /// No inputs at all
    pub fn none() -> Self {
        Self {
            sshd_config: None,
            user_cfg: None,
            cluster_fw: None,
            iptables: None,
            lxc_conf: None,
            storage_cfg: None,
        }
    }

    pub fn get(&self, file_type: FileType) -> Option<&Path> {
        match file_type {
            FileType::SshdConfig => self.sshd_config.as_deref(),
            FileType::UserCfg => self.user_cfg.as_deref(),
            FileType::ClusterFw => self.cluster_fw.as_deref(),
            FileType::Iptables => self.iptables.as_deref(),
            FileType::LxcConf => self.lxc_conf.as_deref(),
            FileType::StorageCfg => self.storage_cfg.as_deref(),
        }
    }

    pub fn set(&mut self, file_type: FileType, path: PathBuf) {
        let slot = match file_type {
            FileType::SshdConfig => &mut self.sshd_config,
            FileType::UserCfg => &mut self.user_cfg,
            FileType::ClusterFw => &mut self.cluster_fw,
            FileType::Iptables => &mut self.iptables,
            FileType::LxcConf => &mut self.lxc_conf,
            FileType::StorageCfg => &mut self.storage_cfg,
        };
        *slot = Some(path);
    }

    /// Configured inputs in file type order
    pub fn iter(&self) -> impl Iterator<Item = (FileType, &Path)> {
        FileType::ALL
            .into_iter()
            .filter_map(move |t| self.get(t).map(|p| (t, p)))
    }
}

/// Report defaults, overridable on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Exit with code 1 when the overall score is below this value
    #[serde(default)]
    pub fail_under: u32,

    /// List passed rules in terminal and markdown reports
    #[serde(default)]
    pub show_passed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_inputs_are_host_paths() {
        let inputs = InputPaths::default();
        assert_eq!(
            inputs.get(FileType::UserCfg),
            Some(Path::new("/etc/pve/user.cfg"))
        );
        assert!(inputs.get(FileType::Iptables).is_none());
        assert_eq!(inputs.iter().count(), 4);
    }

    #[test]
    fn test_set_and_iterate_in_file_type_order() {
        let mut inputs = InputPaths::none();
        assert_eq!(inputs.iter().count(), 0);

        inputs.set(FileType::StorageCfg, PathBuf::from("storage.cfg"));
        inputs.set(FileType::SshdConfig, PathBuf::from("sshd"));

        let types: Vec<FileType> = inputs.iter().map(|(t, _)| t).collect();
        assert_eq!(types, vec![FileType::SshdConfig, FileType::StorageCfg]);
    }

    #[test]
    fn test_output_format_default_and_serde_names() {
        assert_eq!(OutputFormat::default(), OutputFormat::Terminal);
        let config: ReportConfig = toml::from_str("format = \"markdown\"").unwrap();
        assert_eq!(config.format, OutputFormat::Markdown);
    }
}
