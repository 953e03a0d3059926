//! Error types for configuration loading

use thiserror::Error;

/// Error raised when the environment does not describe a usable database
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config validation error: \"{key}\" is required")]
    Missing { key: String },

    #[error("Config validation error: \"{key}\" {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
