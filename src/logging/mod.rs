//! # Logging System
//!
//! Configures the `log` facade for brewfold. Output goes through `env_logger`
//! with one filter directive per pipeline feature (see [`features::LogFeature`]).

pub mod config;
pub mod features;

use config::LogConfig;
use once_cell::sync::OnceCell;
use std::io::Write;

/// Configuration the global logger was installed with
static LOGGING_CONFIG: OnceCell<LogConfig> = OnceCell::new();

/// Process-wide logger setup
pub struct LoggingSystem;

impl LoggingSystem {
    /// Initialize the logging system with configuration taken from the environment
    pub fn init_default() -> Result<(), LoggingError> {
        let config = LogConfig::from_env()?;
        Self::init_with_config(config)
    }

    /// Initialize the logging system with a custom configuration
    pub fn init_with_config(config: LogConfig) -> Result<(), LoggingError> {
        config.validate()?;

        let directives = config.filter_directives();
        let console = config.console.clone();

        LOGGING_CONFIG
            .set(config)
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&directives);
        if console.stdout {
            builder.target(env_logger::Target::Stdout);
        }
        if !console.include_timestamp {
            builder.format_timestamp(None);
        }
        if !console.include_module {
            builder.format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()));
        }
        builder
            .try_init()
            .map_err(|e| LoggingError::Install(e.to_string()))?;

        Ok(())
    }
}

/// Logging system errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logging system already initialized")]
    AlreadyInitialized,
    #[error("Failed to install logger: {0}")]
    Install(String),
    #[error("Config error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

/// Initialize logging from the environment, ignoring a second initialization
pub fn init() {
    if let Err(e) = LoggingSystem::init_default() {
        if !matches!(e, LoggingError::AlreadyInitialized) {
            eprintln!("brewfold: logging disabled: {}", e);
        }
    }
}
