//! pveaudit - A CLI tool to audit the security posture of Proxmox VE hosts
//!
//! This is the main entry point for the CLI application.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pveaudit::cli::{Cli, Commands};
use pveaudit::exit_codes;

fn main() {
    // Parse CLI arguments; clap exits with 2 on usage errors, we use 4
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(exit_codes::INVALID_ARGS);
        }
        Err(e) => {
            // --help and --version
            let _ = e.print();
            std::process::exit(exit_codes::SUCCESS);
        }
    };

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    let config_path = cli.config.as_deref();

    // Execute the appropriate command
    let result = match cli.command {
        Commands::Audit(args) => {
            pveaudit::cli::commands::audit::execute(args, config_path).map_err(anyhow::Error::from)
        }
        Commands::Rules(args) => {
            pveaudit::cli::commands::rules::execute(args).map_err(anyhow::Error::from)
        }
        Commands::Init(args) => pveaudit::cli::commands::init::execute(args, config_path),
        Commands::GenerateMan(args) => {
            pveaudit::cli::commands::generate_man::execute(args).map_err(anyhow::Error::from)
        }
    };

    // Handle exit codes for CI integration
    match result {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(exit_codes::ERROR);
        }
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so that reports on stdout stay machine readable
    if std::env::var("PVEAUDIT_LOG_FORMAT").is_ok_and(|v| v == "json") {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}
