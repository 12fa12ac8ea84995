//! Key-by-key validation of a raw configuration table

use super::error::{ConfigError, ConfigResult};

pub(crate) fn required_string(config: &toml::Table, key: &str) -> ConfigResult<String> {
    match config.get(key) {
        None => Err(ConfigError::missing(key)),
        Some(toml::Value::String(s)) if s.is_empty() => Err(ConfigError::missing(key)),
        Some(toml::Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ConfigError::wrong_type(key, "string")),
    }
}

pub(crate) fn required_table(config: &toml::Table, key: &str) -> ConfigResult<toml::Table> {
    match config.get(key) {
        None => Err(ConfigError::missing(key)),
        Some(toml::Value::Table(t)) => Ok(t.clone()),
        Some(_) => Err(ConfigError::wrong_type(key, "table")),
    }
}

/// Integer strictly greater than zero
pub(crate) fn required_positive(config: &toml::Table, key: &str) -> ConfigResult<u64> {
    match config.get(key) {
        None => Err(ConfigError::missing(key)),
        Some(toml::Value::Integer(n)) if *n > 0 => Ok(*n as u64),
        Some(toml::Value::Integer(_)) => Err(ConfigError::not_positive(key)),
        Some(_) => Err(ConfigError::wrong_type(key, "positive integer")),
    }
}
