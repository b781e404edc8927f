use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a scalar field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Text,
    Integer,
    Decimal,
    Boolean,
    /// Text restricted to a fixed set of choices, matched case-insensitively
    Enumerated(Vec<String>),
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Text => write!(f, "text"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Decimal => write!(f, "decimal"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Enumerated(choices) => write!(f, "one of [{}]", choices.join(", ")),
        }
    }
}

/// How a field relates to other records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    #[default]
    None,
    /// A single nested record with the given tag
    ToOne(String),
    /// An ordered container of records with the given tag
    ToMany(String),
}

impl RelationKind {
    pub fn is_none(&self) -> bool {
        matches!(self, RelationKind::None)
    }

    /// Tag of the related record, if any
    pub fn target(&self) -> Option<&str> {
        match self {
            RelationKind::None => None,
            RelationKind::ToOne(target) | RelationKind::ToMany(target) => Some(target),
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::None => write!(f, "none"),
            RelationKind::ToOne(target) => write!(f, "to_one({})", target),
            RelationKind::ToMany(target) => write!(f, "to_many({})", target),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Declaration of one field of a [`Schema`](super::Schema).
///
/// Serialized form, with every key optional:
///
/// ```json
/// { "interchange_name": "TYPE", "type": { "enumerated": ["pellet", "plug", "leaf"] } }
/// { "relation": { "to_many": "HOP" } }
/// { "type": "decimal", "derived": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FieldSpec {
    /// Name used in documents; defaults to the canonical name upper-cased
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interchange_name: Option<String>,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "RelationKind::is_none")]
    pub relation: RelationKind,
    /// Display-only or computed values; never part of a natural key
    #[serde(default, skip_serializing_if = "is_false")]
    pub derived: bool,
}

impl FieldSpec {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            ..Self::default()
        }
    }

    pub fn text() -> Self {
        Self::new(ValueType::Text)
    }

    pub fn integer() -> Self {
        Self::new(ValueType::Integer)
    }

    pub fn decimal() -> Self {
        Self::new(ValueType::Decimal)
    }

    pub fn boolean() -> Self {
        Self::new(ValueType::Boolean)
    }

    pub fn enumerated<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ValueType::Enumerated(
            choices.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn to_one(target: impl Into<String>) -> Self {
        Self {
            relation: RelationKind::ToOne(target.into()),
            ..Self::default()
        }
    }

    pub fn to_many(target: impl Into<String>) -> Self {
        Self {
            relation: RelationKind::ToMany(target.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn named(mut self, interchange_name: impl Into<String>) -> Self {
        self.interchange_name = Some(interchange_name.into());
        self
    }

    #[must_use]
    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }

    /// Name this field carries in documents
    pub fn interchange_name_for(&self, canonical: &str) -> String {
        self.interchange_name
            .clone()
            .unwrap_or_else(|| canonical.to_uppercase())
    }

    pub fn is_relation(&self) -> bool {
        !self.relation.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_spec_json_shape() {
        let spec: FieldSpec = serde_json::from_value(json!({
            "interchange_name": "TYPE",
            "type": {"enumerated": ["pellet", "plug", "leaf"]}
        }))
        .unwrap();
        assert_eq!(spec, FieldSpec::enumerated(["pellet", "plug", "leaf"]).named("TYPE"));

        let relation: FieldSpec = serde_json::from_value(json!({"relation": {"to_many": "HOP"}})).unwrap();
        assert_eq!(relation.relation.target(), Some("HOP"));
        assert_eq!(relation.value_type, ValueType::Text);

        let plain: FieldSpec = serde_json::from_value(json!({})).unwrap();
        assert_eq!(plain, FieldSpec::text());
        assert_eq!(serde_json::to_value(&plain).unwrap(), json!({"type": "text"}));
    }

    #[test]
    fn test_interchange_name_defaults_to_upper_case() {
        assert_eq!(FieldSpec::decimal().interchange_name_for("boil_time"), "BOIL_TIME");
        assert_eq!(
            FieldSpec::decimal().named("YIELD").interchange_name_for("ferm_yield"),
            "YIELD"
        );
    }
}
