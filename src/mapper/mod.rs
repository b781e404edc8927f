//! # Node Mapper
//!
//! Applies schemas to parsed documents. Raw field names are lower-cased and
//! passed through the schema's rename table, values are coerced to their
//! declared types, and relation fields are mapped recursively into nested
//! [`TypedNode`]s.

pub mod coerce;
pub mod document;
pub mod mapping;
pub mod node;

pub use document::MappedDocument;
pub use mapping::{NodeMapper, DEFAULT_MAX_DEPTH};
pub use node::{FieldValue, TypedNode, TypedValue};
