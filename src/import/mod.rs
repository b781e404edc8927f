//! # Importer
//!
//! Drives one document through the whole pipeline: parse, map against the
//! registry, then materialize every top-level item into the store.
//!
//! Parsing and mapping cover the whole document before anything is written,
//! so a malformed or unmappable document leaves the store untouched. Each
//! top-level item is then materialized in its own transaction, in document
//! order.

use crate::error::BrewFoldResult;
use crate::logging::features::{LogFeature, PerformanceTimer};
use crate::mapper::{MappedDocument, NodeMapper, DEFAULT_MAX_DEPTH};
use crate::materializer::{
    CancellationToken, GraphMaterializer, InheritedContext, MaterializeOptions,
};
use crate::parser::{self, GenericTreeNode};
use crate::schema::SchemaRegistry;
use crate::storage::{EntityHandle, EntityStore};
use crate::{log_import_debug, log_import_info, log_import_warn};
use indexmap::IndexMap;
use serde::Serialize;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

/// Limits for an import; `max_depth` bounds both mapping and materialization
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub max_depth: usize,
    /// Deadline for each top-level item
    pub timeout: Option<Duration>,
    pub cancellation: Option<CancellationToken>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: None,
            cancellation: None,
        }
    }
}

impl ImportOptions {
    fn materialize_options(&self) -> MaterializeOptions {
        MaterializeOptions {
            max_depth: self.max_depth,
            timeout: self.timeout,
            cancellation: self.cancellation.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedEntity {
    pub handle: EntityHandle,
    pub created: bool,
}

/// Outcome of one import, grouped like the source document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub collections: IndexMap<String, Vec<ImportedEntity>>,
    pub created: usize,
    pub existing: usize,
}

impl ImportReport {
    fn record(&mut self, collection: &str, handle: EntityHandle, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.existing += 1;
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(ImportedEntity { handle, created });
    }

    /// Handles of one collection in document order
    pub fn handles(&self, collection: &str) -> Vec<&EntityHandle> {
        self.collections
            .get(collection)
            .map(|items| items.iter().map(|item| &item.handle).collect())
            .unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.created + self.existing
    }
}

pub struct Importer<'a, S: EntityStore + ?Sized> {
    registry: &'a SchemaRegistry,
    store: &'a S,
    options: ImportOptions,
}

impl<'a, S: EntityStore + ?Sized> Importer<'a, S> {
    pub fn new(registry: &'a SchemaRegistry, store: &'a S) -> Self {
        Self {
            registry,
            store,
            options: ImportOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn import_bytes(
        &self,
        input: &[u8],
        inherited: &InheritedContext,
    ) -> BrewFoldResult<ImportReport> {
        let tree = parser::parse(input)?;
        self.import_tree(&tree, inherited)
    }

    pub fn import_reader<R: Read>(
        &self,
        input: R,
        inherited: &InheritedContext,
    ) -> BrewFoldResult<ImportReport> {
        let tree = parser::parse_reader(BufReader::new(input))?;
        self.import_tree(&tree, inherited)
    }

    pub fn import_file<P: AsRef<Path>>(
        &self,
        path: P,
        inherited: &InheritedContext,
    ) -> BrewFoldResult<ImportReport> {
        log_import_info!("Importing {}", path.as_ref().display());
        let tree = parser::parse_file(path)?;
        self.import_tree(&tree, inherited)
    }

    /// Maps a parsed document without touching the store
    pub fn map_tree(&self, tree: &GenericTreeNode) -> BrewFoldResult<MappedDocument> {
        NodeMapper::new(self.registry)
            .with_max_depth(self.options.max_depth)
            .map_document(tree)
    }

    pub fn import_tree(
        &self,
        tree: &GenericTreeNode,
        inherited: &InheritedContext,
    ) -> BrewFoldResult<ImportReport> {
        let timer = PerformanceTimer::new(LogFeature::Import, format!("import <{}>", tree.tag));
        let document = self.map_tree(tree)?;
        log_import_debug!(
            "Mapped {} items from <{}>, materializing",
            document.len(),
            tree.tag
        );

        let materializer =
            GraphMaterializer::new(self.registry, self.options.materialize_options());
        let mut report = ImportReport::default();
        for (collection, node) in document.items() {
            let materialized = match materializer.materialize(self.store, node, inherited) {
                Ok(materialized) => materialized,
                Err(e) => {
                    if report.total() > 0 {
                        log_import_warn!(
                            "<{}> stopped after {} committed items: {}",
                            tree.tag,
                            report.total(),
                            e
                        );
                    }
                    return Err(e);
                }
            };
            report.record(collection, materialized.handle, materialized.was_created);
        }

        log_import_info!(
            "Imported <{}>: {} created, {} existing",
            tree.tag,
            report.created,
            report.existing
        );
        timer.finish();
        Ok(report)
    }
}
