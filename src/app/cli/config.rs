//! Configuration file discovery and listener settings
//!
//! The listener reads one TOML file holding both the coordinator keys and
//! its own optional `log-level`, `log-format`, `log-file` and `color` keys.
//! Command line flags win over file values.

use super::args::Args;
use std::path::PathBuf;

/// `<config dir>/ddq/ddq.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ddq").join("ddq.toml"))
}

/// Pick the configuration file: an explicit path must exist, otherwise the
/// default location is used if present
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf, String> {
    match explicit {
        Some(path) if path.exists() => Ok(path),
        Some(path) => Err(format!(
            "The specified configuration file does not exist: {}",
            path.display()
        )),
        None => match default_config_path() {
            Some(path) if path.exists() => Ok(path),
            Some(path) => Err(format!(
                "No configuration file given and none found at {}",
                path.display()
            )),
            None => Err("No configuration file given".to_string()),
        },
    }
}

impl Args {
    /// Fill listener settings the command line left unset
    pub fn apply_toml_values(&mut self, config: &toml::Table) {
        if self.log_level.is_none() {
            if let Some(log_level) = config.get("log-level").and_then(|v| v.as_str()) {
                self.log_level = Some(log_level.to_string());
            }
        }
        if self.log_format.is_none() {
            if let Some(log_format) = config.get("log-format").and_then(|v| v.as_str()) {
                self.log_format = Some(log_format.to_string());
            }
        }
        if self.log_file.is_none() {
            if let Some(log_file) = config.get("log-file").and_then(|v| v.as_str()) {
                self.log_file = Some(PathBuf::from(log_file));
            }
        }
        if !self.color && !self.no_color {
            match config.get("color").and_then(|v| v.as_bool()) {
                Some(true) => self.color = true,
                Some(false) => self.no_color = true,
                None => {}
            }
        }
    }
}
