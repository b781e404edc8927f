//! Runtime configuration for the CLI and embedding applications

use crate::error::{BrewFoldError, BrewFoldResult};
use crate::import::ImportOptions;
use crate::mapper::DEFAULT_MAX_DEPTH;
use crate::materializer::InheritedContext;
use crate::schema::SchemaRegistry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/brewfold_config.json";

/// Top-level configuration, read from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrewFoldConfig {
    /// Directory of the sled entity database
    pub storage_path: PathBuf,
    /// Extra schema definitions; the bundled BeerXML schemas are used when unset
    pub schemas_dir: Option<PathBuf>,
    pub max_depth: usize,
    pub timeout_ms: Option<u64>,
    /// Owner scoping every imported entity unless overridden per import
    pub default_owner: Option<String>,
    /// TOML logging configuration file
    pub log_config: Option<PathBuf>,
}

impl Default for BrewFoldConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("data/brewfold"),
            schemas_dir: None,
            max_depth: DEFAULT_MAX_DEPTH,
            timeout_ms: None,
            default_owner: None,
            log_config: None,
        }
    }
}

impl BrewFoldConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> BrewFoldResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BrewFoldError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            BrewFoldError::configuration(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Applies `BREWFOLD_*` environment variables on top of the loaded values
    pub fn apply_env_overrides(&mut self) -> BrewFoldResult<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    fn apply_overrides_from<F>(&mut self, lookup: F) -> BrewFoldResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("BREWFOLD_STORAGE_PATH") {
            self.storage_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("BREWFOLD_SCHEMAS_DIR") {
            self.schemas_dir = Some(PathBuf::from(dir));
        }
        if let Some(depth) = lookup("BREWFOLD_MAX_DEPTH") {
            self.max_depth = depth.parse().map_err(|_| {
                BrewFoldError::configuration(format!("BREWFOLD_MAX_DEPTH is not a number: {}", depth))
            })?;
        }
        if let Some(timeout) = lookup("BREWFOLD_TIMEOUT_MS") {
            self.timeout_ms = Some(timeout.parse().map_err(|_| {
                BrewFoldError::configuration(format!(
                    "BREWFOLD_TIMEOUT_MS is not a number: {}",
                    timeout
                ))
            })?);
        }
        if let Some(owner) = lookup("BREWFOLD_OWNER") {
            self.default_owner = Some(owner);
        }
        Ok(())
    }

    pub fn validate(&self) -> BrewFoldResult<()> {
        if self.storage_path.as_os_str().is_empty() {
            return Err(BrewFoldError::configuration("storage_path must not be empty"));
        }
        if self.max_depth == 0 {
            return Err(BrewFoldError::configuration("max_depth must be at least 1"));
        }
        if self.timeout_ms == Some(0) {
            return Err(BrewFoldError::configuration("timeout_ms must be positive"));
        }
        if matches!(&self.default_owner, Some(owner) if owner.trim().is_empty()) {
            return Err(BrewFoldError::configuration("default_owner must not be blank"));
        }
        Ok(())
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            max_depth: self.max_depth,
            timeout: self.timeout_ms.map(Duration::from_millis),
            cancellation: None,
        }
    }

    /// Context for an import; an explicit owner wins over `default_owner`
    pub fn inherited_context(&self, owner: Option<&str>) -> InheritedContext {
        match owner.or(self.default_owner.as_deref()) {
            Some(owner) => InheritedContext::owned_by(owner),
            None => InheritedContext::new(),
        }
    }

    /// The bundled BeerXML schemas plus everything in `schemas_dir`
    pub fn load_registry(&self) -> BrewFoldResult<SchemaRegistry> {
        let mut registry = SchemaRegistry::beerxml()?;
        if let Some(dir) = &self.schemas_dir {
            registry.load_from_dir(dir)?;
            registry.validate()?;
        }
        Ok(registry)
    }
}

/// Loads configuration from `path`, `BREWFOLD_CONFIG` or the default
/// location, in that order. A missing file yields the defaults; env overrides
/// are applied either way.
pub fn load_config(path: Option<&str>) -> BrewFoldResult<BrewFoldConfig> {
    let config_path = path
        .map(|p| p.to_string())
        .or_else(|| std::env::var("BREWFOLD_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&config_path).exists() {
        BrewFoldConfig::from_file(&config_path)?
    } else {
        log::debug!("No config at {}, using defaults", config_path);
        BrewFoldConfig::default()
    };

    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"storage_path": "/tmp/brew", "default_owner": "alice"}}"#).unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.storage_path, PathBuf::from("/tmp/brew"));
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.inherited_context(None).get("owner"), Some("alice"));
        assert_eq!(config.inherited_context(Some("bob")).get("owner"), Some("bob"));
    }

    #[test]
    fn test_unparsable_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = load_config(file.path().to_str()).unwrap_err();
        assert!(matches!(err, BrewFoldError::Configuration(_)));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = load_config(path.to_str()).unwrap();
        assert!(config.schemas_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BREWFOLD_MAX_DEPTH", "8"),
            ("BREWFOLD_TIMEOUT_MS", "250"),
            ("BREWFOLD_OWNER", "carol"),
        ]
        .into_iter()
        .collect();
        let mut config = BrewFoldConfig::default();
        config
            .apply_overrides_from(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        let options = config.import_options();
        assert_eq!(options.max_depth, 8);
        assert_eq!(options.timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.default_owner.as_deref(), Some("carol"));

        let err = BrewFoldConfig::default()
            .apply_overrides_from(|name| (name == "BREWFOLD_MAX_DEPTH").then(|| "deep".to_string()))
            .unwrap_err();
        assert!(matches!(err, BrewFoldError::Configuration(_)));
    }

    #[test]
    fn test_validate() {
        let config = BrewFoldConfig {
            max_depth: 0,
            ..BrewFoldConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(BrewFoldConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_registry() {
        let registry = BrewFoldConfig::default().load_registry().unwrap();
        assert!(registry.contains("RECIPE"));
    }
}
