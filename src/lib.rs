//! # brewfold
//!
//! Schema-driven importer for BeerXML and similar tagged interchange
//! documents. A document passes through four stages:
//!
//! * `parser` - builds a generic element tree from XML bytes or a reader
//! * `mapper` - applies registered schemas, producing typed nodes
//! * `materializer` - persists typed node graphs, deduplicating entities by
//!   their natural key
//! * `storage` - sled backed and in-memory entity stores
//!
//! `import` ties the stages together for one document; `schema` holds the
//! record definitions, including the bundled BeerXML 1.0 set.

pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod mapper;
pub mod materializer;
pub mod parser;
pub mod schema;
pub mod storage;
pub mod testing;

// Re-export main types for convenience
pub use config::{load_config, BrewFoldConfig};
pub use error::{BrewFoldError, BrewFoldResult, MaterializationError};
pub use import::{ImportOptions, ImportReport, ImportedEntity, Importer};
pub use logging::LoggingSystem;
pub use mapper::{MappedDocument, NodeMapper, TypedNode, TypedValue};
pub use materializer::{
    CancellationToken, GraphMaterializer, InheritedContext, MaterializeOptions, Materialized,
    NaturalKey,
};
pub use parser::{
    parse, parse_file, parse_read, parse_reader, parse_str, parse_to_nested_map,
    GenericTreeNode, NestedMap, NestedValue, ParseError, RawNode, RawValue,
};
pub use schema::{FieldSpec, RelationKind, Schema, SchemaRegistry, ValueType};
pub use storage::{
    EntityHandle, EntityRecord, EntityStore, MemoryEntityStore, SledEntityStore, StorageError,
    StoreSession,
};
