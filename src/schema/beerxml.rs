//! The BeerXML 1.0 record schemas bundled with the crate.
//!
//! The JSON sources live in `schemas/beerxml/` and are compiled in, so the
//! registry is available without touching the filesystem.

use super::registry::SchemaRegistry;
use crate::error::BrewFoldResult;

/// `(file name, contents)` of every bundled schema, in dependency order
pub const BEERXML_SCHEMAS: [(&str, &str); 10] = [
    ("equipment.json", include_str!("../../schemas/beerxml/equipment.json")),
    ("fermentable.json", include_str!("../../schemas/beerxml/fermentable.json")),
    ("hop.json", include_str!("../../schemas/beerxml/hop.json")),
    ("mash_step.json", include_str!("../../schemas/beerxml/mash_step.json")),
    ("mash.json", include_str!("../../schemas/beerxml/mash.json")),
    ("misc.json", include_str!("../../schemas/beerxml/misc.json")),
    ("yeast.json", include_str!("../../schemas/beerxml/yeast.json")),
    ("water.json", include_str!("../../schemas/beerxml/water.json")),
    ("style.json", include_str!("../../schemas/beerxml/style.json")),
    ("recipe.json", include_str!("../../schemas/beerxml/recipe.json")),
];

impl SchemaRegistry {
    /// Registry holding the ten BeerXML record types
    pub fn beerxml() -> BrewFoldResult<Self> {
        let mut registry = SchemaRegistry::new();
        for (_, json) in BEERXML_SCHEMAS {
            registry.load_json(json)?;
        }
        registry.validate()?;
        Ok(registry)
    }
}
