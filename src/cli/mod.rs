//! # CLI Module
//!
//! This module defines the command-line interface for pveaudit using `clap`.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `audit` | Audit configuration files and print a scored report |
//! | `rules` | List the security rule catalog |
//! | `init` | Write a default `.pveaudit.toml` |
//!
//! ## Submodules
//!
//! - [`commands`] - Command implementations
//! - [`exit_codes`] - Standardized exit codes
//! - [`output`] - Report renderers (Terminal, JSON, Markdown)
//!
//! ## Global Options
//!
//! - `-v, --verbose` - Increase verbosity level (use multiple times: -v, -vv, -vvv)
//! - `-c, --config <FILE>` - Path to configuration file
//!
//! ## Examples
//!
//! ```bash
//! # Audit the local node with the standard file locations
//! pveaudit audit
//!
//! # Audit files copied from another node
//! pveaudit audit --dir ./node1 --format json -o node1.json
//!
//! # Fail a pipeline when the score drops below 80
//! pveaudit audit --fail-under 80
//! ```

pub mod commands;
pub mod exit_codes;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{AuditArgs, GenerateManArgs, InitArgs, RulesArgs};

/// pveaudit - Audit the security posture of Proxmox VE hosts
#[derive(Parser, Debug)]
#[command(name = "pveaudit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "PVEAUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit configuration files and report a security score
    Audit(AuditArgs),

    /// List the security rules
    Rules(RulesArgs),

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Generate man page (hidden, for packaging)
    #[command(hide = true)]
    GenerateMan(GenerateManArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_audit_arguments() {
        let cli = Cli::parse_from([
            "pveaudit",
            "-vv",
            "audit",
            "--sshd-config",
            "sshd_config",
            "--format",
            "json",
            "--fail-under",
            "80",
        ]);

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Audit(args) => {
                assert_eq!(args.sshd_config, Some(PathBuf::from("sshd_config")));
                assert_eq!(args.format, Some(OutputFormat::Json));
                assert_eq!(args.fail_under, Some(80));
                assert!(!args.show_passed);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_fail_under_is_bounded() {
        let result = Cli::try_parse_from(["pveaudit", "audit", "--fail-under", "101"]);
        assert!(result.is_err());
    }
}
