//! Coordinator configuration
//!
//! Configuration is a TOML table with four required keys:
//!
//! ```toml
//! backend = "mock"
//! heartbeatDelayMs = 1000
//! maxProcessingMessages = 10
//!
//! [backendConfig]
//! noLoopback = false
//! ```
//!
//! `backendConfig` is opaque to the coordinator and handed to the backend
//! factory unchanged. Other keys are ignored here so the same file can carry
//! settings for the listener binary.

mod error;
mod validation;

pub use error::{ConfigError, ConfigResult};

use std::path::Path;
use std::time::Duration;

pub const KEY_BACKEND: &str = "backend";
pub const KEY_BACKEND_CONFIG: &str = "backendConfig";
pub const KEY_HEARTBEAT_DELAY_MS: &str = "heartbeatDelayMs";
pub const KEY_MAX_PROCESSING_MESSAGES: &str = "maxProcessingMessages";

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Name the backend factory is registered under
    pub backend: String,
    /// Passed through to the backend factory
    pub backend_config: toml::Table,
    pub heartbeat_delay_ms: u64,
    pub max_processing_messages: usize,
}

impl CoordinatorConfig {
    pub fn new(backend: &str, heartbeat_delay_ms: u64, max_processing_messages: usize) -> Self {
        Self {
            backend: backend.to_string(),
            backend_config: toml::Table::new(),
            heartbeat_delay_ms,
            max_processing_messages,
        }
    }

    pub fn with_backend_config(mut self, backend_config: toml::Table) -> Self {
        self.backend_config = backend_config;
        self
    }

    /// Validate and extract the configuration from a parsed TOML table
    pub fn from_table(config: &toml::Table) -> ConfigResult<Self> {
        let backend = validation::required_string(config, KEY_BACKEND)?;
        let backend_config = validation::required_table(config, KEY_BACKEND_CONFIG)?;
        let heartbeat_delay_ms = validation::required_positive(config, KEY_HEARTBEAT_DELAY_MS)?;
        let max_processing_messages =
            validation::required_positive(config, KEY_MAX_PROCESSING_MESSAGES)?;

        Ok(Self {
            backend,
            backend_config,
            heartbeat_delay_ms,
            max_processing_messages: usize::try_from(max_processing_messages)
                .unwrap_or(usize::MAX),
        })
    }

    /// Read and validate a TOML configuration file
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let table = load_table(path).await?;
        Self::from_table(&table)
    }

    /// Re-check a configuration that was built in code
    pub fn validate(&self) -> ConfigResult<()> {
        if self.backend.is_empty() {
            return Err(ConfigError::missing(KEY_BACKEND));
        }
        if self.heartbeat_delay_ms == 0 {
            return Err(ConfigError::not_positive(KEY_HEARTBEAT_DELAY_MS));
        }
        if self.max_processing_messages == 0 {
            return Err(ConfigError::not_positive(KEY_MAX_PROCESSING_MESSAGES));
        }
        Ok(())
    }

    pub fn heartbeat_delay(&self) -> Duration {
        Duration::from_millis(self.heartbeat_delay_ms)
    }
}

/// Read a TOML file into a raw table without validating any keys
pub async fn load_table(path: &Path) -> ConfigResult<toml::Table> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    toml::from_str::<toml::Table>(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error_handling::ContextualError;
    use tempfile::TempDir;

    const VALID: &str = r#"
        backend = "mock"
        heartbeatDelayMs = 250
        maxProcessingMessages = 3

        [backendConfig]
        noLoopback = true
    "#;

    fn table(source: &str) -> toml::Table {
        toml::from_str(source).unwrap()
    }

    #[test]
    fn test_from_table_accepts_valid_config() {
        let config = CoordinatorConfig::from_table(&table(VALID)).unwrap();

        assert_eq!(config.backend, "mock");
        assert_eq!(config.heartbeat_delay(), Duration::from_millis(250));
        assert_eq!(config.max_processing_messages, 3);
        assert_eq!(
            config.backend_config.get("noLoopback").and_then(|v| v.as_bool()),
            Some(true)
        );
    }

    #[test]
    fn test_missing_key_is_named() {
        for key in [
            KEY_BACKEND,
            KEY_BACKEND_CONFIG,
            KEY_HEARTBEAT_DELAY_MS,
            KEY_MAX_PROCESSING_MESSAGES,
        ] {
            let mut config = table(VALID);
            config.remove(key);

            let err = CoordinatorConfig::from_table(&config).unwrap_err();

            assert_eq!(err.key(), Some(key));
            assert_eq!(err.to_string(), format!("Config.{} must be defined.", key));
            assert!(err.is_user_actionable());
        }
    }

    #[test]
    fn test_wrong_type_is_named() {
        let mut config = table(VALID);
        config.insert(
            KEY_HEARTBEAT_DELAY_MS.to_string(),
            toml::Value::String("soon".to_string()),
        );

        let err = CoordinatorConfig::from_table(&config).unwrap_err();

        assert_eq!(err.to_string(), "Config.heartbeatDelayMs must be a positive integer");

        let mut config = table(VALID);
        config.insert(KEY_BACKEND_CONFIG.to_string(), toml::Value::Integer(1));

        let err = CoordinatorConfig::from_table(&config).unwrap_err();

        assert_eq!(err.to_string(), "Config.backendConfig must be a table");
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let mut config = table(VALID);
        config.insert(
            KEY_MAX_PROCESSING_MESSAGES.to_string(),
            toml::Value::Integer(0),
        );

        let err = CoordinatorConfig::from_table(&config).unwrap_err();

        assert!(matches!(err, ConfigError::NotPositive { ref key, .. } if key == KEY_MAX_PROCESSING_MESSAGES));
    }

    #[test]
    fn test_validate_code_built_config() {
        assert!(CoordinatorConfig::new("mock", 1000, 1).validate().is_ok());
        assert!(CoordinatorConfig::new("", 1000, 1).validate().is_err());
        assert!(CoordinatorConfig::new("mock", 0, 1).validate().is_err());
        assert!(CoordinatorConfig::new("mock", 1000, 0).validate().is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().expect("Should create temp dir");
        let path = dir.path().join("ddq.toml");
        std::fs::write(&path, VALID).expect("Should write config");

        let config = CoordinatorConfig::load(&path)
            .await
            .expect("Should load config");

        assert_eq!(config.max_processing_messages, 3);
    }

    #[tokio::test]
    async fn test_load_reports_io_and_parse_errors() {
        let dir = TempDir::new().expect("Should create temp dir");

        let missing = CoordinatorConfig::load(&dir.path().join("absent.toml")).await;
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "backend = ").expect("Should write config");
        let broken = CoordinatorConfig::load(&path).await;
        assert!(matches!(broken, Err(ConfigError::Parse { .. })));
        assert!(!broken.unwrap_err().is_user_actionable());
    }
}
