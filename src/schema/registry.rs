use super::definition::Schema;
use crate::error::{BrewFoldError, BrewFoldResult};
use crate::{log_schema_debug, log_schema_info, log_schema_warn};
use indexmap::IndexMap;
use std::path::Path;

/// Tag-indexed collection of [`Schema`]s, passed explicitly to the mapper and
/// materializer.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema under its tag.
    ///
    /// Registering an identical definition twice is a no-op; a different
    /// definition for an existing tag is rejected.
    pub fn register(&mut self, schema: Schema) -> BrewFoldResult<()> {
        schema.validate()?;
        if let Some(existing) = self.schemas.get(schema.tag()) {
            if *existing == schema {
                log_schema_debug!("Schema '{}' already registered", schema.tag());
                return Ok(());
            }
            return Err(BrewFoldError::schema_definition(format!(
                "a different schema is already registered for tag '{}'",
                schema.tag()
            )));
        }
        log_schema_debug!(
            "Registered schema '{}' with {} fields",
            schema.tag(),
            schema.fields().len()
        );
        self.schemas.insert(schema.tag().to_string(), schema);
        Ok(())
    }

    /// Loads one schema object or an array of them; returns how many were read
    pub fn load_json(&mut self, json: &str) -> BrewFoldResult<usize> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| BrewFoldError::schema_definition(format!("invalid schema JSON: {}", e)))?;

        let schemas: Vec<Schema> = if value.is_array() {
            serde_json::from_value(value)
        } else {
            serde_json::from_value(value).map(|schema| vec![schema])
        }
        .map_err(|e| BrewFoldError::schema_definition(format!("invalid schema: {}", e)))?;

        let count = schemas.len();
        for schema in schemas {
            self.register(schema)?;
        }
        Ok(count)
    }

    /// Loads every `*.json` file in a directory, in file name order
    pub fn load_from_dir<P: AsRef<Path>>(&mut self, dir: P) -> BrewFoldResult<usize> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            BrewFoldError::schema_definition(format!(
                "cannot read schema directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| BrewFoldError::schema_definition(e.to_string()))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path);
            } else {
                log_schema_debug!("Skipping non-schema file {}", path.display());
            }
        }
        paths.sort();

        let mut total = 0;
        for path in paths {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                BrewFoldError::schema_definition(format!("cannot read {}: {}", path.display(), e))
            })?;
            total += self.load_json(&content).map_err(|e| match e {
                BrewFoldError::SchemaDefinition(msg) => BrewFoldError::schema_definition(
                    format!("{}: {}", path.display(), msg),
                ),
                other => other,
            })?;
        }

        if total == 0 {
            log_schema_warn!("No schemas found in {}", dir.display());
        } else {
            log_schema_info!("Loaded {} schemas from {}", total, dir.display());
        }
        Ok(total)
    }

    /// Looks a tag up exactly, then by its upper-cased form
    pub fn resolve(&self, tag: &str) -> BrewFoldResult<&Schema> {
        self.get(tag)
            .ok_or_else(|| BrewFoldError::schema_resolution(tag))
    }

    pub fn get(&self, tag: &str) -> Option<&Schema> {
        self.schemas
            .get(tag)
            .or_else(|| self.schemas.get(&tag.to_ascii_uppercase()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Checks that every relation points at a registered tag
    pub fn validate(&self) -> BrewFoldResult<()> {
        for schema in self.schemas.values() {
            for (name, spec) in schema.fields() {
                if let Some(target) = spec.relation.target() {
                    if !self.contains(target) {
                        return Err(BrewFoldError::schema_definition(format!(
                            "schema '{}': relation field '{}' targets unregistered tag '{}'",
                            schema.tag(),
                            name,
                            target
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_exact_then_upper_case() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(Schema::new("HOP").field("name", FieldSpec::text()))
            .unwrap();

        assert_eq!(registry.resolve("HOP").unwrap().tag(), "HOP");
        assert_eq!(registry.resolve("hop").unwrap().tag(), "HOP");
        assert!(matches!(
            registry.resolve("GRAIN"),
            Err(BrewFoldError::SchemaResolution { tag }) if tag == "GRAIN"
        ));
    }

    #[test]
    fn test_register_duplicates() {
        let mut registry = SchemaRegistry::new();
        let hop = Schema::new("HOP").field("name", FieldSpec::text());
        registry.register(hop.clone()).unwrap();
        registry.register(hop).unwrap();
        assert_eq!(registry.len(), 1);

        let different = Schema::new("HOP").field("alpha", FieldSpec::decimal());
        assert!(registry.register(different).is_err());
    }

    #[test]
    fn test_load_json_object_and_array() {
        let mut registry = SchemaRegistry::new();
        let count = registry
            .load_json(r#"{"tag": "HOP", "fields": {"name": {}}}"#)
            .unwrap();
        assert_eq!(count, 1);

        let count = registry
            .load_json(
                r#"[
                    {"tag": "MASH_STEP", "fields": {"name": {}}},
                    {"tag": "MASH", "fields": {"mash_steps": {"relation": {"to_many": "MASH_STEP"}}}}
                ]"#,
            )
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(registry.tags(), vec!["HOP", "MASH", "MASH_STEP"]);
        assert!(registry.validate().is_ok());

        assert!(matches!(
            registry.load_json("{not json"),
            Err(BrewFoldError::SchemaDefinition(_))
        ));
    }

    #[test]
    fn test_validate_reports_dangling_target() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(Schema::new("RECIPE").field("style", FieldSpec::to_one("STYLE")))
            .unwrap();
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("STYLE"));
    }

    #[test]
    fn test_load_from_dir_sorted_json_only() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("b_hop.json"),
            r#"{"tag": "HOP", "fields": {"name": {}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a_yeast.json"),
            r#"{"tag": "YEAST", "fields": {"name": {}}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("README.txt"), "not a schema").unwrap();

        let mut registry = SchemaRegistry::new();
        assert_eq!(registry.load_from_dir(dir.path()).unwrap(), 2);
        assert_eq!(
            registry.schemas().map(Schema::tag).collect::<Vec<_>>(),
            vec!["YEAST", "HOP"]
        );
    }

    #[test]
    fn test_load_from_dir_names_bad_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "[1, 2]").unwrap();
        let err = SchemaRegistry::new().load_from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
