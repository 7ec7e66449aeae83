//! Configuration file loading
//!
//! The format follows the file extension: `.toml`, `.yaml`/`.yml`, or JSON
//! for `.json` and extensionless files. A missing file is not an error; the
//! defaults apply and the CLI reports that it is running without one.

use super::types::SwitchyardConfig;
use super::validation::validate;
use crate::error::{SwitchyardError, SwitchyardResult};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Serialization format of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension; unknown extensions are rejected
    pub fn from_path(path: &Path) -> SwitchyardResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            None | Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some(other) => Err(SwitchyardError::config_with_context(
                format!("Unsupported config file extension '.{}'", other),
                format!("Expected .toml, .yaml, .yml or .json: '{}'", path.display()),
            )),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "JSON",
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
        })
    }
}

/// Load and validate the configuration at `path`
///
/// Returns [`SwitchyardConfig::default`] when the file does not exist.
pub fn load_from_file(path: &Path) -> SwitchyardResult<SwitchyardConfig> {
    let format = ConfigFormat::from_path(path)?;
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SwitchyardConfig::default()),
        Err(e) => {
            return Err(SwitchyardError::config_with_context(
                format!("Failed to read config file: {}", e),
                path.display().to_string(),
            ));
        }
    };

    load_from_str(&content, format).map_err(|e| match e {
        SwitchyardError::Config {
            message,
            context: None,
        } => SwitchyardError::config_with_context(message, path.display().to_string()),
        other => other,
    })
}

/// Parse and validate a configuration document held in memory
pub fn load_from_str(content: &str, format: ConfigFormat) -> SwitchyardResult<SwitchyardConfig> {
    let parsed = match format {
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
    };
    let config = parsed.map_err(|reason| {
        SwitchyardError::config(format!("Invalid {} configuration: {}", format, reason))
    })?;

    validate(&config)?;
    Ok(config)
}
