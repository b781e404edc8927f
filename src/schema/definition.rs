use super::field::{FieldSpec, RelationKind};
use crate::error::{BrewFoldError, BrewFoldResult};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fields of a schema split by role, computed once per schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldClassification {
    /// Non-relation fields, in declaration order
    pub scalars: Vec<String>,
    /// `(field, target tag)` for single-valued relations
    pub to_one: Vec<(String, String)>,
    /// `(field, target tag)` for multi-valued relations
    pub to_many: Vec<(String, String)>,
    /// Scalars that identify a record: everything not flagged `derived`
    pub key_fields: Vec<String>,
}

impl FieldClassification {
    pub fn is_key_field(&self, name: &str) -> bool {
        self.key_fields.iter().any(|field| field == name)
    }
}

/// Record layout for one tag.
///
/// Schemas are immutable once built: the registry only hands out shared
/// references, and the lookup tables below are filled lazily on first use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    tag: String,
    fields: IndexMap<String, FieldSpec>,
    #[serde(skip)]
    classification: OnceCell<FieldClassification>,
    /// lower-cased interchange name -> canonical name, only where they differ
    #[serde(skip)]
    renames: OnceCell<HashMap<String, String>>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.fields == other.fields
    }
}

impl Eq for Schema {}

impl Schema {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fields: IndexMap::new(),
            classification: OnceCell::new(),
            renames: OnceCell::new(),
        }
    }

    /// Adds a field declaration; canonical names are stored lower-cased
    #[must_use]
    pub fn field(mut self, canonical: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(canonical.into().to_lowercase(), spec);
        self.classification = OnceCell::new();
        self.renames = OnceCell::new();
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn fields(&self) -> &IndexMap<String, FieldSpec> {
        &self.fields
    }

    pub fn field_spec(&self, canonical: &str) -> Option<&FieldSpec> {
        self.fields.get(canonical)
    }

    /// Maps a lower-cased document name to its canonical field name
    pub fn canonical_name<'a>(&'a self, lowered: &'a str) -> &'a str {
        self.renames()
            .get(lowered)
            .map(String::as_str)
            .unwrap_or(lowered)
    }

    pub fn renames(&self) -> &HashMap<String, String> {
        self.renames.get_or_init(|| {
            self.fields
                .iter()
                .filter_map(|(canonical, spec)| {
                    let lowered = spec.interchange_name_for(canonical).to_lowercase();
                    (lowered != *canonical).then(|| (lowered, canonical.clone()))
                })
                .collect()
        })
    }

    pub fn classification(&self) -> &FieldClassification {
        self.classification.get_or_init(|| {
            let mut classification = FieldClassification::default();
            for (name, spec) in &self.fields {
                match &spec.relation {
                    RelationKind::None => {
                        classification.scalars.push(name.clone());
                        if !spec.derived {
                            classification.key_fields.push(name.clone());
                        }
                    }
                    RelationKind::ToOne(target) => {
                        classification.to_one.push((name.clone(), target.clone()))
                    }
                    RelationKind::ToMany(target) => {
                        classification.to_many.push((name.clone(), target.clone()))
                    }
                }
            }
            classification
        })
    }

    /// Checks the definition on its own; relation targets are checked by the registry
    pub fn validate(&self) -> BrewFoldResult<()> {
        if self.tag.trim().is_empty() {
            return Err(BrewFoldError::schema_definition("schema tag must not be empty"));
        }
        if self.fields.is_empty() {
            return Err(BrewFoldError::schema_definition(format!(
                "schema '{}' declares no fields",
                self.tag
            )));
        }

        let mut seen_interchange: HashMap<String, &str> = HashMap::new();
        for (name, spec) in &self.fields {
            if name.is_empty() || *name != name.to_lowercase() {
                return Err(BrewFoldError::schema_definition(format!(
                    "schema '{}': field name '{}' must be non-empty lower case",
                    self.tag, name
                )));
            }
            if let super::ValueType::Enumerated(choices) = &spec.value_type {
                if choices.is_empty() {
                    return Err(BrewFoldError::schema_definition(format!(
                        "schema '{}': enumerated field '{}' has no choices",
                        self.tag, name
                    )));
                }
            }
            if let Some(target) = spec.relation.target() {
                if target.trim().is_empty() {
                    return Err(BrewFoldError::schema_definition(format!(
                        "schema '{}': relation field '{}' has an empty target",
                        self.tag, name
                    )));
                }
            }
            let lowered = spec.interchange_name_for(name).to_lowercase();
            if let Some(other) = seen_interchange.insert(lowered.clone(), name) {
                return Err(BrewFoldError::schema_definition(format!(
                    "schema '{}': fields '{}' and '{}' share interchange name '{}'",
                    self.tag, other, name, lowered
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValueType;

    fn hop() -> Schema {
        Schema::new("HOP")
            .field("name", FieldSpec::text())
            .field("alpha", FieldSpec::decimal())
            .field("hop_type", FieldSpec::enumerated(["bittering", "aroma"]).named("TYPE"))
            .field("display_amount", FieldSpec::text().derived())
    }

    #[test]
    fn test_rename_table_only_holds_differences() {
        let schema = hop();
        assert_eq!(schema.renames().len(), 1);
        assert_eq!(schema.canonical_name("type"), "hop_type");
        assert_eq!(schema.canonical_name("alpha"), "alpha");
    }

    #[test]
    fn test_classification() {
        let schema = Schema::new("RECIPE")
            .field("name", FieldSpec::text())
            .field("style", FieldSpec::to_one("STYLE"))
            .field("hops", FieldSpec::to_many("HOP"))
            .field("ibu", FieldSpec::decimal().derived());

        let classification = schema.classification();
        assert_eq!(classification.scalars, vec!["name", "ibu"]);
        assert_eq!(classification.key_fields, vec!["name"]);
        assert_eq!(classification.to_one, vec![("style".to_string(), "STYLE".to_string())]);
        assert_eq!(classification.to_many, vec![("hops".to_string(), "HOP".to_string())]);
        assert!(!classification.is_key_field("ibu"));
    }

    #[test]
    fn test_json_round_trip_keeps_field_order() {
        let schema = hop();
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
        let order: Vec<_> = back.fields().keys().cloned().collect();
        assert_eq!(order, vec!["name", "alpha", "hop_type", "display_amount"]);
        assert_eq!(back.canonical_name("type"), "hop_type");
    }

    #[test]
    fn test_validate_rejects_bad_definitions() {
        assert!(hop().validate().is_ok());
        assert!(Schema::new("").field("name", FieldSpec::text()).validate().is_err());
        assert!(Schema::new("EMPTY").validate().is_err());
        assert!(Schema::new("HOP")
            .field("form", FieldSpec::new(ValueType::Enumerated(vec![])))
            .validate()
            .is_err());
        let clash = Schema::new("HOP")
            .field("hop_type", FieldSpec::text().named("TYPE"))
            .field("type", FieldSpec::text());
        assert!(matches!(
            clash.validate(),
            Err(BrewFoldError::SchemaDefinition(msg)) if msg.contains("share interchange name")
        ));
    }
}
