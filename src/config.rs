//! Agent configuration.
//!
//! [`AgentConfig`] is plain data: it can be built in code, deserialised from
//! JSON, or assembled by the CLI from its flags. The library never reads
//! environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::constants::{CONNECT_TIMEOUT_SECS, MAX_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::origin::SuffixListError;
use crate::user_agent::default_user_agent;

/// Errors raised while loading or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A timeout is outside the accepted range.
    #[error("{field} must be between 1 and 3600 seconds, got {value}")]
    InvalidTimeout {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: u64,
    },

    /// The configured public suffix list could not be loaded.
    #[error(transparent)]
    SuffixList(#[from] SuffixListError),

    /// The HTTP client could not be built.
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`AgentConfig`].
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Settings shared by the retriever and the resource downloaders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// TCP connect timeout for HTTP requests, in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for HTTP requests, in seconds.
    pub read_timeout_secs: u64,
    /// User-Agent header value.
    pub user_agent: String,
    /// Public suffix list to use instead of the bundled one.
    pub suffix_list_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            suffix_list_path: None,
        }
    }
}

impl AgentConfig {
    /// Loads a configuration from a JSON file. Missing fields take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid
    /// JSON, or fails validation.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every timeout is within `1..=3600` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("read_timeout_secs", self.read_timeout_secs),
        ] {
            if !(1..=MAX_TIMEOUT_SECS).contains(&value) {
                return Err(ConfigError::InvalidTimeout { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentConfig::default();
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.read_timeout_secs, 300);
        assert!(config.user_agent.starts_with("markup-agent/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_and_huge_timeouts() {
        let config = AgentConfig {
            connect_timeout_secs: 0,
            ..AgentConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout {
                field: "connect_timeout_secs",
                value: 0
            })
        ));

        let config = AgentConfig {
            read_timeout_secs: 3601,
            ..AgentConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout {
                field: "read_timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"connect_timeout_secs": 5}}"#).unwrap();
        let config = AgentConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.read_timeout_secs, 300);
    }

    #[test]
    fn test_from_json_file_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"conect_timeout_secs": 5}}"#).unwrap();
        assert!(matches!(
            AgentConfig::from_json_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_from_json_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"read_timeout_secs": 0}}"#).unwrap();
        assert!(matches!(
            AgentConfig::from_json_file(file.path()),
            Err(ConfigError::InvalidTimeout { .. })
        ));
    }
}
