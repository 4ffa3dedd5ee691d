//! Init command - Initialize a new configuration file

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Confirm;
use std::fs;
use std::path::Path;

use super::InitArgs;
use crate::config::{Config, CONFIG_FILENAME};
use crate::exit_codes;

pub fn execute(args: InitArgs, config_path: Option<&Path>) -> Result<i32> {
    let config_path = config_path.unwrap_or(Path::new(CONFIG_FILENAME));

    // Check if config already exists
    if config_path.exists() && !args.force {
        if args.non_interactive {
            eprintln!(
                "{} Configuration file already exists. Use --force to overwrite.",
                "Error:".red().bold()
            );
            return Ok(exit_codes::ERROR);
        }

        let overwrite = Confirm::new()
            .with_prompt("Configuration file already exists. Overwrite?")
            .default(false)
            .interact()?;

        if !overwrite {
            println!("{}", "Aborted.".yellow());
            return Ok(exit_codes::SUCCESS);
        }
    }

    let config_content = Config::default().to_toml()?;
    fs::write(config_path, &config_content).with_context(|| {
        format!(
            "Failed to write configuration file '{}'",
            config_path.display()
        )
    })?;

    println!(
        "{} Created {}",
        "Success:".green().bold(),
        config_path.display().to_string().cyan()
    );

    println!("\nNext steps:");
    println!(
        "  1. Review the [inputs] paths in {}",
        config_path.display().to_string().cyan()
    );
    println!("  2. Run {} to audit this node", "pveaudit audit".cyan());

    Ok(exit_codes::SUCCESS)
}
