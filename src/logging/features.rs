//! Feature-specific logging macros and utilities
//!
//! Each pipeline stage logs under its own target so a single stage can be
//! turned up (`BREWFOLD_LOG_FEATURE_MAPPER=DEBUG`) without flooding the rest.

/// Feature categories for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFeature {
    Parser,
    Schema,
    Mapper,
    Materializer,
    Storage,
    Import,
}

impl LogFeature {
    pub const ALL: [LogFeature; 6] = [
        LogFeature::Parser,
        LogFeature::Schema,
        LogFeature::Mapper,
        LogFeature::Materializer,
        LogFeature::Storage,
        LogFeature::Import,
    ];

    /// Get the target string for this feature
    pub fn target(&self) -> &'static str {
        match self {
            LogFeature::Parser => "brewfold::parser",
            LogFeature::Schema => "brewfold::schema",
            LogFeature::Mapper => "brewfold::mapper",
            LogFeature::Materializer => "brewfold::materializer",
            LogFeature::Storage => "brewfold::storage",
            LogFeature::Import => "brewfold::import",
        }
    }

    /// Key used for this feature in [`LogConfig::features`](super::config::LogConfig)
    pub fn name(&self) -> &'static str {
        match self {
            LogFeature::Parser => "parser",
            LogFeature::Schema => "schema",
            LogFeature::Mapper => "mapper",
            LogFeature::Materializer => "materializer",
            LogFeature::Storage => "storage",
            LogFeature::Import => "import",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|feature| feature.name().eq_ignore_ascii_case(name))
    }
}

// Parser
#[macro_export]
macro_rules! log_parser_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "brewfold::parser", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_parser_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "brewfold::parser", $($arg)*)
    };
}

// Schema registry
#[macro_export]
macro_rules! log_schema_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "brewfold::schema", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_schema_info {
    ($($arg:tt)*) => {
        log::info!(target: "brewfold::schema", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_schema_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "brewfold::schema", $($arg)*)
    };
}

// Node mapping
#[macro_export]
macro_rules! log_mapper_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "brewfold::mapper", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_mapper_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "brewfold::mapper", $($arg)*)
    };
}

// Graph materialization
#[macro_export]
macro_rules! log_materializer_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "brewfold::materializer", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_materializer_info {
    ($($arg:tt)*) => {
        log::info!(target: "brewfold::materializer", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_materializer_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "brewfold::materializer", $($arg)*)
    };
}

// Storage backends
#[macro_export]
macro_rules! log_storage_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "brewfold::storage", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_storage_info {
    ($($arg:tt)*) => {
        log::info!(target: "brewfold::storage", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_storage_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "brewfold::storage", $($arg)*)
    };
}

// Import driver
#[macro_export]
macro_rules! log_import_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "brewfold::import", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_import_info {
    ($($arg:tt)*) => {
        log::info!(target: "brewfold::import", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_import_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "brewfold::import", $($arg)*)
    };
}

/// Logs the start of an operation at debug and its duration at info on `finish`
pub struct PerformanceTimer {
    start: std::time::Instant,
    feature: LogFeature,
    operation: String,
}

impl PerformanceTimer {
    pub fn new(feature: LogFeature, operation: impl Into<String>) -> Self {
        let operation = operation.into();
        log::debug!(target: feature.target(), "Starting timed operation: {}", operation);
        Self {
            start: std::time::Instant::now(),
            feature,
            operation,
        }
    }

    pub fn finish(self) {
        log::info!(
            target: self.feature.target(),
            "Operation '{}' completed in {:?}",
            self.operation,
            self.start.elapsed()
        );
    }
}
