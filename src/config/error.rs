//! Configuration Error Types

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{message}")]
    Missing { key: String, message: String },

    #[error("{message}")]
    WrongType {
        key: String,
        expected: &'static str,
        message: String,
    },

    #[error("{message}")]
    NotPositive { key: String, message: String },

    #[error("Could not read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn missing(key: &str) -> Self {
        ConfigError::Missing {
            key: key.to_string(),
            message: format!("Config.{} must be defined.", key),
        }
    }

    pub fn wrong_type(key: &str, expected: &'static str) -> Self {
        ConfigError::WrongType {
            key: key.to_string(),
            expected,
            message: format!("Config.{} must be a {}", key, expected),
        }
    }

    pub fn not_positive(key: &str) -> Self {
        ConfigError::NotPositive {
            key: key.to_string(),
            message: format!("Config.{} must be greater than 0", key),
        }
    }

    /// The configuration key at fault, if the error is about a single key
    pub fn key(&self) -> Option<&str> {
        match self {
            ConfigError::Missing { key, .. }
            | ConfigError::WrongType { key, .. }
            | ConfigError::NotPositive { key, .. } => Some(key),
            ConfigError::Io { .. } | ConfigError::Parse { .. } => None,
        }
    }
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

impl crate::core::error_handling::ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            ConfigError::Missing { .. }
                | ConfigError::WrongType { .. }
                | ConfigError::NotPositive { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::Missing { message, .. }
            | ConfigError::WrongType { message, .. }
            | ConfigError::NotPositive { message, .. } => Some(message),
            ConfigError::Io { .. } | ConfigError::Parse { .. } => None,
        }
    }
}
