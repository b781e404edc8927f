use crate::mapper::{TypedNode, TypedValue};
use crate::schema::Schema;
use crate::storage::{StorageError, StorageResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Key/value constraints threaded through one materialization and merged
/// into every natural key it computes (for example the owning user).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritedContext {
    entries: IndexMap<String, String>,
}

impl InheritedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context scoping everything to one owner
    pub fn owned_by(owner: impl Into<String>) -> Self {
        Self::new().with("owner", owner)
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Identity of a record in storage.
///
/// Holds the record's own key fields and, in a separate namespace, the
/// inherited context, so a context entry can never shadow a field of the
/// same name. Two nodes with equal keys are the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NaturalKey {
    tag: String,
    fields: BTreeMap<String, TypedValue>,
    context: BTreeMap<String, String>,
}

impl NaturalKey {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fields: BTreeMap::new(),
            context: BTreeMap::new(),
        }
    }

    /// Key fields of `node` (no relations, nothing derived) plus `inherited`,
    /// tagged with the schema's canonical tag
    pub fn from_node(node: &TypedNode, schema: &Schema, inherited: &InheritedContext) -> Self {
        let classification = schema.classification();
        let mut key = Self::new(schema.tag());
        for (name, value) in node.scalars() {
            if classification.is_key_field(name) {
                key.fields.insert(name.to_string(), value.normalized());
            }
        }
        for (name, value) in inherited.iter() {
            key.context.insert(name.to_string(), value.to_string());
        }
        key
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: TypedValue) -> Self {
        self.fields.insert(name.into(), value.normalized());
        self
    }

    #[must_use]
    pub fn with_context(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(name.into(), value.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn fields(&self) -> &BTreeMap<String, TypedValue> {
        &self.fields
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Hex SHA-256 of the key's canonical JSON (sorted keys, normalized decimals)
    pub fn digest(&self) -> StorageResult<String> {
        let canonical = serde_json::to_vec(self)
            .map_err(|e| StorageError::serialization("natural key", e))?;

        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Index key used by the stores: `TAG:digest`
    pub fn storage_key(&self) -> StorageResult<String> {
        Ok(format!("{}:{}", self.tag, self.digest()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, Schema};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn hop_schema() -> Schema {
        Schema::new("HOP")
            .field("name", FieldSpec::text())
            .field("alpha", FieldSpec::decimal())
            .field("display_amount", FieldSpec::text().derived())
    }

    fn hop(alpha: &str, display: &str) -> TypedNode {
        TypedNode::new("HOP")
            .with_scalar("name", "Cascade")
            .with_scalar("alpha", Decimal::from_str(alpha).unwrap())
            .with_scalar("display_amount", display)
    }

    #[test]
    fn test_derived_fields_and_decimal_scale_do_not_matter() {
        let schema = hop_schema();
        let ctx = InheritedContext::new();
        let a = NaturalKey::from_node(&hop("5.5", "57 g"), &schema, &ctx);
        let b = NaturalKey::from_node(&hop("5.50", "2 oz"), &schema, &ctx);
        assert_eq!(a, b);
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        assert!(!a.fields().contains_key("display_amount"));
        assert_eq!(a.digest().unwrap().len(), 64);
    }

    #[test]
    fn test_context_changes_key() {
        let schema = hop_schema();
        let node = hop("5.5", "");
        let alice = NaturalKey::from_node(&node, &schema, &InheritedContext::owned_by("alice"));
        let bob = NaturalKey::from_node(&node, &schema, &InheritedContext::owned_by("bob"));
        assert_ne!(alice.digest().unwrap(), bob.digest().unwrap());
        assert_eq!(alice.context().get("owner").map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_tag_comes_from_schema() {
        let schema = hop_schema();
        let ctx = InheritedContext::new();
        let upper = hop("5.5", "");
        let mut lower = TypedNode::new("hop");
        for (name, value) in upper.scalars() {
            lower.insert_scalar(name, value.clone());
        }
        let a = NaturalKey::from_node(&upper, &schema, &ctx);
        let b = NaturalKey::from_node(&lower, &schema, &ctx);
        assert_eq!(b.tag(), "HOP");
        assert_eq!(a.storage_key().unwrap(), b.storage_key().unwrap());
    }

    #[test]
    fn test_context_cannot_collide_with_field() {
        let by_field = NaturalKey::new("HOP").with_field("owner", TypedValue::from("alice"));
        let by_context = NaturalKey::new("HOP").with_context("owner", "alice");
        assert_ne!(by_field.digest().unwrap(), by_context.digest().unwrap());
    }

    #[test]
    fn test_storage_key_prefix() {
        let key = NaturalKey::new("YEAST").with_field("name", TypedValue::from("US-05"));
        assert!(key.storage_key().unwrap().starts_with("YEAST:"));
    }
}
