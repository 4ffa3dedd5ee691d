//! Generate man page command

use crate::cli::Cli;
use crate::error::{OutputError, PveAuditError};
use crate::exit_codes;
use clap::CommandFactory;
use std::fs;

use super::GenerateManArgs;

/// Execute the generate-man command
pub fn execute(args: GenerateManArgs) -> Result<i32, PveAuditError> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);

    let output_path = args.output.join("pveaudit.1");

    let mut buffer: Vec<u8> = Vec::new();
    man.render(&mut buffer).map_err(|e| {
        PveAuditError::Output(OutputError::FileWrite {
            path: output_path.display().to_string(),
            source: e,
        })
    })?;

    fs::write(&output_path, buffer).map_err(|e| {
        PveAuditError::Output(OutputError::FileWrite {
            path: output_path.display().to_string(),
            source: e,
        })
    })?;

    println!("Man page generated: {}", output_path.display());

    Ok(exit_codes::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_man_page() {
        let dir = tempfile::tempdir().unwrap();
        let args = GenerateManArgs {
            output: dir.path().to_path_buf(),
        };

        assert_eq!(execute(args).unwrap(), exit_codes::SUCCESS);
        let page = fs::read_to_string(dir.path().join("pveaudit.1")).unwrap();
        assert!(page.contains("pveaudit"));
    }
}
