//! Audit command - Read configuration files, evaluate every rule and report

use colored::Colorize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::AuditArgs;
use crate::cli::output;
use crate::config::{Config, InputPaths, OutputFormat};
use crate::error::{InputError, OutputError, PveAuditError};
use crate::exit_codes;
use crate::parsers::FileType;
use crate::rules;

pub fn execute(args: AuditArgs, config_path: Option<&Path>) -> Result<i32, PveAuditError> {
    let config = Config::load(config_path)?;

    // Inputs named on the command line replace the configured ones entirely
    let sources = match args.command_line_inputs() {
        Some(inputs) => read_inputs(&inputs, true)?,
        None => read_inputs(&config.inputs, false)?,
    };

    let report = rules::audit_sources(&sources);

    let format = args.format.unwrap_or(config.report.format);
    let show_passed = args.show_passed || config.report.show_passed;
    let fail_under = args.fail_under.unwrap_or(config.report.fail_under);

    if args.output.is_some() && format == OutputFormat::Terminal {
        colored::control::set_override(false);
    }
    let rendered = output::renderer(format, show_passed).render_report(&report)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &rendered).map_err(|e| {
                PveAuditError::Output(OutputError::FileWrite {
                    path: path.display().to_string(),
                    source: e,
                })
            })?;
            colored::control::unset_override();
            eprintln!(
                "{} Report written to: {}",
                "Success:".green().bold(),
                path.display().to_string().cyan()
            );
        }
        None => print!("{rendered}"),
    }

    let code = exit_codes::for_report(&report, fail_under);
    if fail_under > 0 && report.overall_score < fail_under {
        eprintln!(
            "{} score {} is below the required {}",
            "Failed:".red().bold(),
            report.overall_score,
            fail_under
        );
    }

    Ok(code)
}

/// Read every configured input.
///
/// With `required`, an unreadable file is an error; otherwise it is skipped
/// with a warning so that a default configuration works on partial hosts.
fn read_inputs(
    inputs: &InputPaths,
    required: bool,
) -> Result<BTreeMap<FileType, String>, PveAuditError> {
    let mut sources = BTreeMap::new();

    for (file_type, path) in inputs.iter() {
        match fs::read(path) {
            Ok(bytes) => {
                debug!(file_type = %file_type, path = %path.display(), bytes = bytes.len(), "Read input");
                // Invalid UTF-8 is replaced, not rejected
                sources.insert(file_type, String::from_utf8_lossy(&bytes).into_owned());
            }
            Err(e) if required => {
                return Err(InputError::FileRead {
                    file_type: file_type.to_string(),
                    path: path.display().to_string(),
                    source: e,
                }
                .into());
            }
            Err(e) => {
                warn!(file_type = %file_type, path = %path.display(), error = %e, "Skipping input");
            }
        }
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_required_missing_input_is_an_error() {
        let mut inputs = InputPaths::none();
        inputs.set(FileType::SshdConfig, PathBuf::from("/nonexistent/sshd_config"));

        let result = read_inputs(&inputs, true);
        assert!(matches!(result, Err(PveAuditError::Input(_))));
    }

    #[test]
    fn test_optional_missing_input_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("storage.cfg");
        fs::write(&present, "dir: local\n\tpath /var/lib/vz\n").unwrap();

        let mut inputs = InputPaths::none();
        inputs.set(FileType::SshdConfig, dir.path().join("missing"));
        inputs.set(FileType::StorageCfg, present);

        let sources = read_inputs(&inputs, false).unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources[&FileType::StorageCfg].contains("/var/lib/vz"));
    }

    #[test]
    fn test_latin1_comment_does_not_reject_input() {
        let dir = tempfile::tempdir().unwrap();
        let sshd = dir.path().join("sshd_config");
        let mut content = b"# Ma\xeetre de la machine\n".to_vec();
        content.extend_from_slice(b"PermitRootLogin yes\nPasswordAuthentication yes\n");
        fs::write(&sshd, content).unwrap();

        let mut inputs = InputPaths::none();
        inputs.set(FileType::SshdConfig, sshd);

        let sources = read_inputs(&inputs, true).unwrap();
        let report = crate::rules::audit_sources(&sources);
        assert!(!report.finding("root-ssh-password").unwrap().passed());
    }
}
