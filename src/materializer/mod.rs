//! # Graph Materializer
//!
//! Turns typed node graphs into deduplicated entities. Every node is
//! identified by a [`NaturalKey`] built from its non-derived scalar fields and
//! the [`InheritedContext`] of the call, so importing the same record twice
//! yields the same entity and relations are only ever attached once.

pub mod graph;
pub mod key;
pub mod options;

pub use graph::{GraphMaterializer, Materialized};
pub use key::{InheritedContext, NaturalKey};
pub use options::{CancellationToken, MaterializeOptions};
