//! Stored client settings.
//!
//! Reads ~/.config/reporting-client/config.toml. Every key is optional;
//! command-line flags and environment variables take precedence.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Settings read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Reporting API base URL (e.g., "https://reporting.example.org:9494")
    pub endpoint: Option<String>,
    /// Token sent as X-Auth-Token
    pub token: Option<String>,
    /// Shell command printing a token on stdout
    pub token_command: Option<String>,
    /// API version for direct routing (e.g., "v1"); discovery is used when unset
    pub api_version: Option<String>,
    /// Directory for cached report JSON
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Parse { path, message } => write!(f, "invalid config {}: {message}", path.display()),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Returns the path to the default config file.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("reporting-client/config.toml"))
}

/// Returns the default directory for cached report JSON.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|c| c.join("reporting-client"))
}

/// Load settings.
///
/// An explicit path must exist. The default path is optional: when it is
/// missing, defaults are returned.
pub fn load_config(explicit: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match config_file_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(ClientConfig::default()),
        },
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
        path: path.clone(),
        message: e.to_string(),
    })?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path,
        message: e.to_string(),
    })
}
