//! Configuration management for the logging system
//!
//! Handles loading logging configuration from TOML files and applying
//! environment variable overrides.

use super::features::LogFeature;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const VALID_LEVELS: [&str; 6] = ["OFF", "TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

/// Main logging configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// General logging settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Console output settings
    #[serde(default)]
    pub console: ConsoleConfig,
    /// Feature-specific log levels, keyed by feature name (`parser`, `mapper`, ...)
    #[serde(default = "LogConfig::default_features")]
    pub features: HashMap<String, String>,
}

/// General logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default log level for all modules
    pub default_level: String,
}

/// Console output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Include timestamps
    pub include_timestamp: bool,
    /// Include the log target
    pub include_module: bool,
    /// Write to stdout instead of stderr
    pub stdout: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            console: ConsoleConfig::default(),
            features: Self::default_features(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_level: "INFO".to_string(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            include_timestamp: true,
            include_module: true,
            stdout: false,
        }
    }
}

impl LogConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;

        let mut config: LogConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(level) = std::env::var("BREWFOLD_LOG_LEVEL") {
            self.general.default_level = level.to_uppercase();
        }
        if let Ok(stdout) = std::env::var("BREWFOLD_LOG_STDOUT") {
            self.console.stdout = stdout.parse().unwrap_or(false);
        }

        for (key, value) in std::env::vars() {
            if let Some(feature) = key.strip_prefix("BREWFOLD_LOG_FEATURE_") {
                self.features
                    .insert(feature.to_lowercase(), value.to_uppercase());
            }
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }

        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }

    fn default_features() -> HashMap<String, String> {
        let mut features = HashMap::new();
        features.insert("parser".to_string(), "INFO".to_string());
        features.insert("schema".to_string(), "INFO".to_string());
        features.insert("mapper".to_string(), "INFO".to_string());
        features.insert("materializer".to_string(), "INFO".to_string());
        features.insert("storage".to_string(), "WARN".to_string());
        features.insert("import".to_string(), "INFO".to_string());
        features
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LEVELS.contains(&self.general.default_level.as_str()) {
            return Err(ConfigError::InvalidLevel(
                self.general.default_level.clone(),
            ));
        }

        for (feature, level) in &self.features {
            if LogFeature::from_name(feature).is_none() {
                return Err(ConfigError::UnknownFeature(feature.clone()));
            }
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::InvalidFeatureLevel(
                    feature.clone(),
                    level.clone(),
                ));
            }
        }

        Ok(())
    }

    /// Filter directives in the `target=level` form understood by `env_logger`
    pub fn filter_directives(&self) -> String {
        let mut directives = vec![self.general.default_level.to_lowercase()];
        for feature in LogFeature::ALL {
            if let Some(level) = self.features.get(feature.name()) {
                directives.push(format!("{}={}", feature.target(), level.to_lowercase()));
            }
        }
        directives.join(",")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),
    #[error("Invalid log level for feature '{0}': {1}")]
    InvalidFeatureLevel(String, String),
    #[error("Unknown logging feature: {0}")]
    UnknownFeature(String),
}
