use super::mapping::NodeMapper;
use super::node::TypedNode;
use crate::error::{BrewFoldError, BrewFoldResult};
use crate::log_mapper_debug;
use crate::parser::{GenericTreeNode, RawNode};
use indexmap::IndexMap;
use serde_json::Value;

/// A whole document mapped into typed records, grouped by collection tag in
/// document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedDocument {
    collections: IndexMap<String, Vec<TypedNode>>,
}

impl MappedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, collection: impl Into<String>, node: TypedNode) {
        self.collections
            .entry(collection.into())
            .or_default()
            .push(node);
    }

    pub fn collections(&self) -> &IndexMap<String, Vec<TypedNode>> {
        &self.collections
    }

    /// Items of one collection; empty when the collection is absent
    pub fn get(&self, collection: &str) -> &[TypedNode] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every item with its collection tag, in document order
    pub fn items(&self) -> impl Iterator<Item = (&str, &TypedNode)> {
        self.collections
            .iter()
            .flat_map(|(tag, nodes)| nodes.iter().map(move |node| (tag.as_str(), node)))
    }

    /// Total number of top-level items
    pub fn len(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_collections(self) -> IndexMap<String, Vec<TypedNode>> {
        self.collections
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.collections
                .iter()
                .map(|(tag, nodes)| {
                    (
                        tag.clone(),
                        Value::Array(nodes.iter().map(TypedNode::to_json).collect()),
                    )
                })
                .collect(),
        )
    }
}

impl NodeMapper<'_> {
    /// Maps a parsed document into its collections.
    ///
    /// * A root with a schema is a single item collected under its own tag.
    /// * Otherwise each element-bearing child of the root with a schema is an
    ///   item of the collection named after the root (`<HOPS><HOP>..`).
    /// * A child without a schema whose children all carry elements is a
    ///   nested collection named after itself (`<BEER_XML><HOPS><HOP>..`).
    /// * Leaf children of the root are ignored; anything else is unknown.
    pub fn map_document(&self, root: &GenericTreeNode) -> BrewFoldResult<MappedDocument> {
        let mut document = MappedDocument::new();

        if self.registry().contains(&root.tag) {
            let node = self.map_node(&RawNode::from_tree(root))?;
            document.push(root.tag.clone(), node);
            return Ok(document);
        }

        for child in root.children() {
            if !child.has_children() {
                log_mapper_debug!("<{}>: ignoring leaf <{}>", root.tag, child.tag);
                continue;
            }

            if self.registry().contains(&child.tag) {
                document.push(root.tag.clone(), self.map_node(&RawNode::from_tree(child))?);
            } else if child.children().iter().all(GenericTreeNode::has_children) {
                for item in child.children() {
                    document.push(child.tag.clone(), self.map_node(&RawNode::from_tree(item))?);
                }
            } else {
                return Err(BrewFoldError::schema_resolution(child.tag.clone()));
            }
        }

        log_mapper_debug!(
            "Mapped <{}> into {} items across {} collections",
            root.tag,
            document.len(),
            document.collections().len()
        );
        Ok(document)
    }
}
