//! Error types for the brewfold import pipeline
//!
//! Every stage of an import reports through [`BrewFoldError`], so callers can
//! tell "could not parse", "could not map" and "could not persist" apart without
//! depending on the storage backend's own error types.

use crate::parser::ParseError;
use crate::storage::StorageError;
use thiserror::Error;

/// Unified error type for the import pipeline
#[derive(Error, Debug)]
pub enum BrewFoldError {
    /// The input is not a well-formed tagged document or could not be read
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// A tag has no registered schema
    #[error("Schema resolution error: no schema registered for tag '{tag}'")]
    SchemaResolution { tag: String },

    /// A raw value could not be coerced to its declared type
    #[error("Validation error: field '{field}' rejected value '{value}': {reason}")]
    Validation {
        field: String,
        value: String,
        reason: String,
    },

    /// Persisting the entity graph failed
    #[error("Materialization error: {0}")]
    Materialization(#[from] MaterializationError),

    /// A schema definition is malformed or references an unknown target
    #[error("Schema definition error: {0}")]
    SchemaDefinition(String),

    /// Configuration errors (unreadable file, invalid limits, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Failures raised while walking a typed node graph into storage
#[derive(Error, Debug)]
pub enum MaterializationError {
    /// The store rejected a find, insert or attach
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// The relation graph nests deeper than the configured limit
    #[error("relation depth {depth} exceeds limit {limit} at tag '{tag}'")]
    DepthExceeded {
        tag: String,
        depth: usize,
        limit: usize,
    },

    /// The caller cancelled the import
    #[error("materialization cancelled")]
    Cancelled,

    /// The configured deadline passed before the graph was persisted
    #[error("materialization timed out after {elapsed_ms} ms")]
    TimedOut { elapsed_ms: u128 },
}

impl BrewFoldError {
    /// Create a new schema resolution error
    pub fn schema_resolution(tag: impl Into<String>) -> Self {
        Self::SchemaResolution { tag: tag.into() }
    }

    /// Create a new validation error
    pub fn validation(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new schema definition error
    pub fn schema_definition(msg: impl Into<String>) -> Self {
        Self::SchemaDefinition(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Returns true when the error came from the storage stage
    pub fn is_materialization(&self) -> bool {
        matches!(self, Self::Materialization(_))
    }
}

impl From<StorageError> for BrewFoldError {
    fn from(error: StorageError) -> Self {
        BrewFoldError::Materialization(MaterializationError::Storage(error))
    }
}

/// Result type alias for operations that can fail with a [`BrewFoldError`]
pub type BrewFoldResult<T> = Result<T, BrewFoldError>;
