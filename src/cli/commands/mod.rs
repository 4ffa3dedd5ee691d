//! CLI commands module

pub mod audit;
pub mod generate_man;
pub mod init;
pub mod rules;

use clap::Args;
use std::path::PathBuf;

use crate::config::{InputPaths, OutputFormat};
use crate::parsers::FileType;

/// Arguments for the audit command
#[derive(Args, Debug, Default)]
pub struct AuditArgs {
    /// sshd_config to audit
    #[arg(long, value_name = "FILE")]
    pub sshd_config: Option<PathBuf>,

    /// Proxmox user.cfg (users, groups, ACLs, API tokens)
    #[arg(long, value_name = "FILE")]
    pub user_cfg: Option<PathBuf>,

    /// Cluster firewall configuration (cluster.fw)
    #[arg(long, value_name = "FILE")]
    pub cluster_fw: Option<PathBuf>,

    /// Saved `iptables-save` or `iptables -L -n` output
    #[arg(long, value_name = "FILE")]
    pub iptables: Option<PathBuf>,

    /// LXC container configuration(s)
    #[arg(long, value_name = "FILE")]
    pub lxc_conf: Option<PathBuf>,

    /// Proxmox storage.cfg
    #[arg(long, value_name = "FILE")]
    pub storage_cfg: Option<PathBuf>,

    /// Directory holding inputs named sshd_config, user.cfg, cluster.fw,
    /// iptables, lxc.conf and storage.cfg
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Output format (overrides the config file)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Exit with code 1 when the overall score is below SCORE
    #[arg(long, value_name = "SCORE", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub fail_under: Option<u32>,

    /// Also list rules that passed
    #[arg(long)]
    pub show_passed: bool,
}

impl AuditArgs {
    /// Inputs named on the command line.
    ///
    /// Files found in `--dir` come first; an explicit per-file flag replaces
    /// the directory entry for that file type. Returns `None` when no input
    /// was named at all.
    pub fn command_line_inputs(&self) -> Option<InputPaths> {
        let mut inputs = InputPaths::none();

        if let Some(dir) = &self.dir {
            for file_type in FileType::ALL {
                let candidate = dir.join(file_type.as_str());
                if candidate.is_file() {
                    inputs.set(file_type, candidate);
                }
            }
        }

        let flags = [
            (FileType::SshdConfig, &self.sshd_config),
            (FileType::UserCfg, &self.user_cfg),
            (FileType::ClusterFw, &self.cluster_fw),
            (FileType::Iptables, &self.iptables),
            (FileType::LxcConf, &self.lxc_conf),
            (FileType::StorageCfg, &self.storage_cfg),
        ];
        let named = self.dir.is_some() || flags.iter().any(|(_, p)| p.is_some());

        for (file_type, path) in flags {
            if let Some(path) = path {
                inputs.set(file_type, path.clone());
            }
        }

        named.then_some(inputs)
    }
}

/// Arguments for the rules command
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Output format
    #[arg(short, long, default_value = "terminal")]
    pub format: RulesFormat,
}

/// Output format for the rules command
#[derive(Debug, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum RulesFormat {
    Terminal,
    Json,
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Skip interactive prompts
    #[arg(long)]
    pub non_interactive: bool,
}

/// Arguments for the generate-man command
#[derive(Args, Debug)]
pub struct GenerateManArgs {
    /// Directory to write pveaudit.1 into
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,
}
