//! Terminal configuration.

use bikego_email_otp::{ClientConfig, WorkflowConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "bikego.toml";

/// Top-level configuration, loaded from `bikego.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Where the login session is cached. Defaults to the user's data directory.
    pub session_file: Option<PathBuf>,
    /// Backend connection.
    pub client: ClientConfig,
    /// Workflow timings and limits.
    pub workflow: WorkflowConfig,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            session_file: None,
            client: ClientConfig::default(),
            workflow: WorkflowConfig::default(),
        }
    }
}

impl TerminalConfig {
    /// Parses a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::IoError(format!("{}: {e}", path.display()))),
        }
    }

    /// The session cache location.
    pub fn session_path(&self) -> PathBuf {
        self.session_file.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("bikego")
                .join("session.json")
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
