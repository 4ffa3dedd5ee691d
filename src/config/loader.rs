//! Configuration loader

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{ConfigError, PveAuditError};

use super::{InputPaths, ReportConfig};

/// Default configuration file, looked up in the working directory
pub const CONFIG_FILENAME: &str = ".pveaudit.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Files to audit
    #[serde(default)]
    pub inputs: InputPaths,

    /// Report defaults
    #[serde(default)]
    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from file or return default
    pub fn load_or_default() -> Result<Self, PveAuditError> {
        let config_path = Path::new(CONFIG_FILENAME);

        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            debug!("No {} found, using defaults", CONFIG_FILENAME);
            Ok(Self::default())
        }
    }

    /// Load the file given with `--config`, or fall back to [`Config::load_or_default`]
    pub fn load(path: Option<&Path>) -> Result<Self, PveAuditError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load_or_default(),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, PveAuditError> {
        let content = fs::read_to_string(path).map_err(|e| {
            PveAuditError::Config(ConfigError::FileRead {
                path: path.display().to_string(),
                source: e,
            })
        })?;

        debug!(path = %path.display(), "Loaded configuration");
        toml::from_str(&content).map_err(Into::into)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, PveAuditError> {
        toml::to_string_pretty(self).map_err(Into::into)
    }
}
