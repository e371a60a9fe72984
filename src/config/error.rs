//! Errors raised while loading, validating or saving the bridge configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--config` named a file that does not exist.
    #[error("No bridge configuration at {0}")]
    Missing(PathBuf),

    #[error("Cannot read bridge configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the `[bridge]` /
    /// `[serial]` / `[logging]` layout.
    #[error("Malformed bridge configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot render bridge configuration as TOML: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("Cannot write bridge configuration {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value parsed but would leave the bridge unable to run. `key` is the
    /// dotted TOML path, e.g. `bridge.read_buffer_size`.
    #[error("Invalid value for '{key}': {reason}")]
    Invalid { key: String, reason: String },

    /// A `TELNET_UART_*` override could not be parsed.
    #[error("Bad override {var}: {reason}")]
    Override { var: String, reason: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn bad_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Override {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
