use super::coerce::coerce;
use super::node::TypedNode;
use crate::error::{BrewFoldError, BrewFoldResult};
use crate::{log_mapper_debug, log_mapper_warn};
use crate::parser::{RawNode, RawValue};
use crate::schema::{RelationKind, Schema, SchemaRegistry};

/// Default bound on relation nesting
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Maps schema-free [`RawNode`]s onto [`TypedNode`]s using a [`SchemaRegistry`].
///
/// Unknown fields are skipped so vendor extensions pass through harmlessly;
/// an unknown tag aborts the mapping. Either way no partially mapped node is
/// ever returned.
#[derive(Debug, Clone, Copy)]
pub struct NodeMapper<'a> {
    registry: &'a SchemaRegistry,
    max_depth: usize,
}

impl<'a> NodeMapper<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    /// Maps the fields of one record of type `tag`
    pub fn map(&self, tag: &str, fields: &[(String, RawValue)]) -> BrewFoldResult<TypedNode> {
        self.map_at(tag, fields, 0)
    }

    pub fn map_node(&self, raw: &RawNode) -> BrewFoldResult<TypedNode> {
        self.map(&raw.tag, &raw.fields)
    }

    fn map_at(
        &self,
        tag: &str,
        fields: &[(String, RawValue)],
        depth: usize,
    ) -> BrewFoldResult<TypedNode> {
        if depth > self.max_depth {
            return Err(BrewFoldError::validation(
                tag,
                format!("depth {}", depth),
                format!("relations nest deeper than the limit of {}", self.max_depth),
            ));
        }

        let schema = self.registry.resolve(tag)?;
        let mut node = TypedNode::new(schema.tag());

        for (raw_name, raw_value) in fields {
            let lowered = raw_name.to_lowercase();
            let canonical = schema.canonical_name(&lowered);
            let Some(spec) = schema.field_spec(canonical) else {
                log_mapper_debug!("{}: skipping unknown field '{}'", schema.tag(), raw_name);
                continue;
            };

            match (&spec.relation, raw_value) {
                (RelationKind::None, RawValue::Text(text)) => {
                    node.insert_scalar(canonical, coerce(canonical, &spec.value_type, text)?);
                }
                (RelationKind::None, RawValue::Node(nested)) => {
                    return Err(BrewFoldError::validation(
                        canonical,
                        raw_value.describe(),
                        format!("expected a scalar, found <{}> with child elements", nested.tag),
                    ));
                }
                (RelationKind::ToOne(_), RawValue::Text(text)) if text.trim().is_empty() => {
                    log_mapper_debug!("{}: '{}' is empty, leaving it unset", schema.tag(), canonical);
                }
                (RelationKind::ToMany(_), RawValue::Text(text)) if text.trim().is_empty() => {
                    node.insert_many(canonical, Vec::new());
                }
                (RelationKind::ToOne(target) | RelationKind::ToMany(target), RawValue::Text(_)) => {
                    return Err(BrewFoldError::validation(
                        canonical,
                        raw_value.describe(),
                        format!("expected nested <{}> elements, found text", target),
                    ));
                }
                (RelationKind::ToOne(target), RawValue::Node(nested)) => {
                    let item = self.map_at(target, single_item_fields(nested, target), depth + 1)?;
                    node.insert_one(canonical, item);
                }
                (RelationKind::ToMany(target), RawValue::Node(container)) => {
                    let items = self.map_items(schema, canonical, target, container, depth + 1)?;
                    node.insert_many(canonical, items);
                }
            }
        }

        Ok(node)
    }

    fn map_items(
        &self,
        owner: &Schema,
        field: &str,
        target: &str,
        container: &RawNode,
        depth: usize,
    ) -> BrewFoldResult<Vec<TypedNode>> {
        let mut items = Vec::new();
        for (name, value) in &container.fields {
            if !name.eq_ignore_ascii_case(target) {
                log_mapper_warn!(
                    "{}.{}: skipping <{}> inside a <{}> container",
                    owner.tag(),
                    field,
                    name,
                    target
                );
                continue;
            }
            let item = match value {
                RawValue::Node(item) => self.map_at(target, &item.fields, depth)?,
                RawValue::Text(text) if text.trim().is_empty() => self.map_at(target, &[], depth)?,
                RawValue::Text(_) => {
                    return Err(BrewFoldError::validation(
                        field,
                        value.describe(),
                        format!("<{}> items must contain fields, not text", target),
                    ))
                }
            };
            items.push(item);
        }
        Ok(items)
    }
}

/// Accepts both `<STYLE><NAME>..</NAME></STYLE>` and a relation element
/// wrapping a single `<STYLE>` item
fn single_item_fields<'r>(relation: &'r RawNode, target: &str) -> &'r [(String, RawValue)] {
    match relation.fields.as_slice() {
        [(name, RawValue::Node(item))] if name.eq_ignore_ascii_case(target) => &item.fields,
        fields => fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::TypedValue;
    use crate::schema::FieldSpec;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                Schema::new("HOP")
                    .field("name", FieldSpec::text())
                    .field("alpha", FieldSpec::decimal())
                    .field("amount", FieldSpec::decimal())
                    .field("use", FieldSpec::enumerated(["boil", "dry hop", "aroma"]))
                    .field("hop_type", FieldSpec::enumerated(["bittering", "aroma", "both"]).named("TYPE")),
            )
            .unwrap();
        registry
            .register(Schema::new("STYLE").field("name", FieldSpec::text()))
            .unwrap();
        registry
            .register(
                Schema::new("RECIPE")
                    .field("name", FieldSpec::text())
                    .field("forced_carbonation", FieldSpec::boolean())
                    .field("style", FieldSpec::to_one("STYLE"))
                    .field("hops", FieldSpec::to_many("HOP")),
            )
            .unwrap();
        registry
    }

    fn cascade() -> RawNode {
        RawNode::new("HOP")
            .with_text("NAME", "Cascade")
            .with_text("ALPHA", "5.5")
            .with_text("AMOUNT", "0.057")
            .with_text("USE", "Boil")
    }

    #[test]
    fn test_cascade_scalars() {
        let registry = registry();
        let node = NodeMapper::new(&registry).map_node(&cascade()).unwrap();
        assert_eq!(node.tag(), "HOP");
        let scalars: Vec<_> = node.scalars().collect();
        assert_eq!(
            scalars,
            vec![
                ("name", &TypedValue::Text("Cascade".to_string())),
                ("alpha", &TypedValue::Decimal(Decimal::from_str("5.5").unwrap())),
                ("amount", &TypedValue::Decimal(Decimal::from_str("0.057").unwrap())),
                ("use", &TypedValue::Text("Boil".to_string())),
            ]
        );
    }

    #[test]
    fn test_rename_and_unknown_fields() {
        let registry = registry();
        let raw = cascade()
            .with_text("TYPE", "Aroma")
            .with_text("VENDOR_RATING", "11")
            .with_text("X_LAB_ID", "abc");
        let node = NodeMapper::new(&registry).map_node(&raw).unwrap();
        assert_eq!(node.field_count(), 5);
        assert_eq!(node.scalar("hop_type").and_then(TypedValue::as_text), Some("Aroma"));
        assert!(node.scalar("vendor_rating").is_none());
    }

    #[test]
    fn test_validation_error_names_field() {
        let registry = registry();
        let raw = RawNode::new("HOP").with_text("ALPHA", "lots");
        let err = NodeMapper::new(&registry).map_node(&raw).unwrap_err();
        assert!(matches!(
            err,
            BrewFoldError::Validation { field, value, .. } if field == "alpha" && value == "lots"
        ));
    }

    #[test]
    fn test_boolean_field_rejects_lower_case() {
        let registry = registry();
        let mapper = NodeMapper::new(&registry);
        let ok = mapper
            .map_node(&RawNode::new("RECIPE").with_text("FORCED_CARBONATION", "TRUE"))
            .unwrap();
        assert_eq!(ok.scalar("forced_carbonation"), Some(&TypedValue::Boolean(true)));

        let err = mapper
            .map_node(&RawNode::new("RECIPE").with_text("FORCED_CARBONATION", "true"))
            .unwrap_err();
        assert!(matches!(err, BrewFoldError::Validation { .. }));
    }

    #[test]
    fn test_relations() {
        let registry = registry();
        let raw = RawNode::new("RECIPE")
            .with_text("NAME", "Pale")
            .with_node("STYLE", RawNode::new("STYLE").with_text("NAME", "APA"))
            .with_node(
                "HOPS",
                RawNode::new("HOPS")
                    .with_node("HOP", cascade())
                    .with_text("COMMENT", "skipped")
                    .with_node("HOP", RawNode::new("HOP").with_text("NAME", "Saaz")),
            );
        let node = NodeMapper::new(&registry).map_node(&raw).unwrap();

        let style = node.to_one("style").unwrap();
        assert_eq!(style.scalar("name").and_then(TypedValue::as_text), Some("APA"));
        let names: Vec<_> = node
            .to_many("hops")
            .unwrap()
            .iter()
            .filter_map(|hop| hop.scalar("name").and_then(TypedValue::as_text))
            .collect();
        assert_eq!(names, vec!["Cascade", "Saaz"]);
    }

    #[test]
    fn test_wrapped_to_one_and_empty_relations() {
        let registry = registry();
        let raw = RawNode::new("RECIPE")
            .with_node(
                "STYLE",
                RawNode::new("STYLE").with_node("STYLE", RawNode::new("STYLE").with_text("NAME", "APA")),
            )
            .with_text("HOPS", "");
        let node = NodeMapper::new(&registry).map_node(&raw).unwrap();
        assert_eq!(
            node.to_one("style").unwrap().scalar("name").and_then(TypedValue::as_text),
            Some("APA")
        );
        assert_eq!(node.to_many("hops"), Some(&[][..]));

        let absent = NodeMapper::new(&registry)
            .map_node(&RawNode::new("RECIPE").with_text("STYLE", ""))
            .unwrap();
        assert!(absent.to_one("style").is_none());
        assert_eq!(absent.field_count(), 0);
    }

    #[test]
    fn test_unknown_nested_tag_aborts() {
        let mut registry = registry();
        registry
            .register(Schema::new("KIT").field("recipe", FieldSpec::to_one("RECIPE_V2")))
            .unwrap();
        let raw = RawNode::new("KIT").with_node("RECIPE", RawNode::new("RECIPE").with_text("NAME", "x"));
        let err = NodeMapper::new(&registry).map_node(&raw).unwrap_err();
        assert!(matches!(err, BrewFoldError::SchemaResolution { tag } if tag == "RECIPE_V2"));

        let err = NodeMapper::new(&registry)
            .map_node(&RawNode::new("GRAIN"))
            .unwrap_err();
        assert!(matches!(err, BrewFoldError::SchemaResolution { .. }));
    }

    #[test]
    fn test_text_where_relation_expected() {
        let registry = registry();
        let raw = RawNode::new("RECIPE").with_text("STYLE", "American Pale Ale");
        let err = NodeMapper::new(&registry).map_node(&raw).unwrap_err();
        assert!(matches!(err, BrewFoldError::Validation { field, .. } if field == "style"));
    }

    #[test]
    fn test_depth_guard() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                Schema::new("NODE")
                    .field("name", FieldSpec::text())
                    .field("child", FieldSpec::to_one("NODE")),
            )
            .unwrap();

        let mut raw = RawNode::new("NODE").with_text("NAME", "leaf");
        for _ in 0..5 {
            raw = RawNode::new("NODE").with_node("CHILD", raw);
        }

        let mapper = NodeMapper::new(&registry);
        assert!(mapper.map_node(&raw).is_ok());
        let err = mapper.with_max_depth(3).map_node(&raw).unwrap_err();
        assert!(matches!(err, BrewFoldError::Validation { reason, .. } if reason.contains("limit of 3")));
    }
}
