use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// A coerced scalar value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    /// An empty element on a non-text field
    Null,
}

impl TypedValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            TypedValue::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// Same value with decimals reduced to their shortest scale (`5.50` -> `5.5`)
    pub fn normalized(&self) -> TypedValue {
        match self {
            TypedValue::Decimal(value) => TypedValue::Decimal(value.normalize()),
            other => other.clone(),
        }
    }

    /// Plain JSON rendering; decimals become JSON numbers
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Text(text) => Value::String(text.clone()),
            TypedValue::Integer(value) => json!(value),
            TypedValue::Decimal(value) => value
                .to_f64()
                .map(|float| json!(float))
                .unwrap_or_else(|| Value::String(value.to_string())),
            TypedValue::Boolean(value) => Value::Bool(*value),
            TypedValue::Null => Value::Null,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Text(text) => write!(f, "{}", text),
            TypedValue::Integer(value) => write!(f, "{}", value),
            TypedValue::Decimal(value) => write!(f, "{}", value),
            TypedValue::Boolean(true) => write!(f, "TRUE"),
            TypedValue::Boolean(false) => write!(f, "FALSE"),
            TypedValue::Null => Ok(()),
        }
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::Text(value.to_string())
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        TypedValue::Integer(value)
    }
}

impl From<Decimal> for TypedValue {
    fn from(value: Decimal) -> Self {
        TypedValue::Decimal(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::Boolean(value)
    }
}

/// Borrowed view of one field of a [`TypedNode`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Scalar(&'a TypedValue),
    One(&'a TypedNode),
    Many(&'a [TypedNode]),
}

/// A schema-mapped, type-coerced record ready for materialization.
///
/// Every relation value is itself fully mapped; the mapper never hands out a
/// partially built node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypedNode {
    tag: String,
    scalars: IndexMap<String, TypedValue>,
    to_one: IndexMap<String, TypedNode>,
    to_many: IndexMap<String, Vec<TypedNode>>,
}

impl TypedNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_scalar(mut self, name: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        self.insert_scalar(name, value.into());
        self
    }

    #[must_use]
    pub fn with_one(mut self, name: impl Into<String>, node: TypedNode) -> Self {
        self.insert_one(name, node);
        self
    }

    #[must_use]
    pub fn with_many(mut self, name: impl Into<String>, nodes: Vec<TypedNode>) -> Self {
        self.insert_many(name, nodes);
        self
    }

    pub fn insert_scalar(&mut self, name: impl Into<String>, value: TypedValue) {
        self.scalars.insert(name.into(), value);
    }

    pub fn insert_one(&mut self, name: impl Into<String>, node: TypedNode) {
        self.to_one.insert(name.into(), node);
    }

    /// Appends to the named sequence, creating it (possibly empty) if needed
    pub fn insert_many(&mut self, name: impl Into<String>, nodes: Vec<TypedNode>) {
        self.to_many.entry(name.into()).or_default().extend(nodes);
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn get(&self, name: &str) -> Option<FieldValue<'_>> {
        if let Some(value) = self.scalars.get(name) {
            return Some(FieldValue::Scalar(value));
        }
        if let Some(node) = self.to_one.get(name) {
            return Some(FieldValue::One(node));
        }
        self.to_many
            .get(name)
            .map(|nodes| FieldValue::Many(nodes.as_slice()))
    }

    pub fn scalar(&self, name: &str) -> Option<&TypedValue> {
        self.scalars.get(name)
    }

    pub fn to_one(&self, name: &str) -> Option<&TypedNode> {
        self.to_one.get(name)
    }

    pub fn to_many(&self, name: &str) -> Option<&[TypedNode]> {
        self.to_many.get(name).map(Vec::as_slice)
    }

    pub fn scalar_map(&self) -> &IndexMap<String, TypedValue> {
        &self.scalars
    }

    pub fn scalars(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.scalars.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn to_one_relations(&self) -> impl Iterator<Item = (&str, &TypedNode)> {
        self.to_one.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn to_many_relations(&self) -> impl Iterator<Item = (&str, &[TypedNode])> {
        self.to_many
            .iter()
            .map(|(name, nodes)| (name.as_str(), nodes.as_slice()))
    }

    /// Number of recognized fields present: scalars plus both relation kinds
    pub fn field_count(&self) -> usize {
        self.scalars.len() + self.to_one.len() + self.to_many.len()
    }

    /// Plain JSON object with scalars inline and relations nested
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (name, value) in &self.scalars {
            object.insert(name.clone(), value.to_json());
        }
        for (name, node) in &self.to_one {
            object.insert(name.clone(), node.to_json());
        }
        for (name, nodes) in &self.to_many {
            object.insert(
                name.clone(),
                Value::Array(nodes.iter().map(TypedNode::to_json).collect()),
            );
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn recipe() -> TypedNode {
        TypedNode::new("RECIPE")
            .with_scalar("name", "Pale")
            .with_scalar("batch_size", Decimal::from_str("20.5").unwrap())
            .with_one("style", TypedNode::new("STYLE").with_scalar("name", "APA"))
            .with_many("hops", vec![TypedNode::new("HOP").with_scalar("name", "Cascade")])
            .with_many("yeasts", vec![])
    }

    #[test]
    fn test_accessors() {
        let node = recipe();
        assert_eq!(node.field_count(), 5);
        assert_eq!(node.scalar("name").and_then(TypedValue::as_text), Some("Pale"));
        assert!(matches!(node.get("style"), Some(FieldValue::One(style)) if style.tag() == "STYLE"));
        assert!(matches!(node.get("yeasts"), Some(FieldValue::Many(items)) if items.is_empty()));
        assert!(node.get("waters").is_none());
        assert_eq!(node.to_many("hops").unwrap().len(), 1);
    }

    #[test]
    fn test_to_json() {
        assert_eq!(
            recipe().to_json(),
            json!({
                "name": "Pale",
                "batch_size": 20.5,
                "style": {"name": "APA"},
                "hops": [{"name": "Cascade"}],
                "yeasts": []
            })
        );
    }

    #[test]
    fn test_normalized_decimal() {
        let value = TypedValue::Decimal(Decimal::from_str("5.500").unwrap());
        assert_eq!(value.normalized().to_string(), "5.5");
        assert_eq!(TypedValue::Boolean(true).to_string(), "TRUE");
    }

    #[test]
    fn test_value_serde_is_tagged() {
        let value = serde_json::to_value(TypedValue::Integer(3)).unwrap();
        assert_eq!(value, json!({"type": "integer", "value": 3}));
        let back: TypedValue = serde_json::from_value(json!({"type": "null"})).unwrap();
        assert!(back.is_null());
    }
}
