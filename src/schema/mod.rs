//! # Schemas
//!
//! A [`Schema`] describes how the elements under one tag become a typed
//! record: which fields exist, what they are called in documents, how their
//! text is coerced and which of them point at other records.
//!
//! Schemas are grouped in a [`SchemaRegistry`] that is handed explicitly to
//! the mapper and materializer. The BeerXML record types ship with the crate
//! (see [`SchemaRegistry::beerxml`]); others can be loaded from JSON.

pub mod beerxml;
pub mod definition;
pub mod field;
pub mod registry;

pub use definition::{FieldClassification, Schema};
pub use field::{FieldSpec, RelationKind, ValueType};
pub use registry::SchemaRegistry;
