//! Error types for pveaudit
//!
//! The audit core never fails: malformed lines are skipped and missing inputs
//! are reported by the rules themselves. These errors cover the surface around
//! it (configuration, reading input files, writing reports).

use thiserror::Error;

/// Main error type for pveaudit
#[derive(Error, Debug)]
pub enum PveAuditError {
    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input file errors
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Report output errors
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// Errors related to the `.pveaudit.toml` configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    /// Invalid TOML or unexpected fields
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to render a configuration as TOML
    #[error("Failed to serialize config: {message}")]
    Serialize { message: String },
}

/// Errors reading the configuration files to audit
#[derive(Error, Debug)]
pub enum InputError {
    /// An input file named on the command line could not be read
    #[error("Failed to read {file_type} input '{path}': {source}")]
    FileRead {
        file_type: String,
        path: String,
        source: std::io::Error,
    },
}

/// Errors producing a report or other output
#[derive(Error, Debug)]
pub enum OutputError {
    /// JSON serialization failure
    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to write an output file
    #[error("Failed to write '{path}': {source}")]
    FileWrite {
        path: String,
        source: std::io::Error,
    },
}

impl From<toml::de::Error> for PveAuditError {
    fn from(err: toml::de::Error) -> Self {
        PveAuditError::Config(ConfigError::Parse(err))
    }
}

impl From<toml::ser::Error> for PveAuditError {
    fn from(err: toml::ser::Error) -> Self {
        PveAuditError::Config(ConfigError::Serialize {
            message: err.to_string(),
        })
    }
}

impl From<serde_json::Error> for PveAuditError {
    fn from(err: serde_json::Error) -> Self {
        PveAuditError::Output(OutputError::Serialize(err))
    }
}
