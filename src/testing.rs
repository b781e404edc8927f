// Fixtures shared by unit and integration tests
pub use crate::mapper::{TypedNode, TypedValue};
pub use crate::materializer::InheritedContext;
pub use crate::schema::{FieldSpec, Schema, SchemaRegistry};
pub use crate::storage::{EntityStore, MemoryEntityStore, SledEntityStore};

/// One recipe with every relation kind, including a hop listed twice
pub const SAMPLE_RECIPE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<RECIPES>
  <RECIPE>
    <NAME>Cascade Pale Ale</NAME>
    <VERSION>1</VERSION>
    <TYPE>All Grain</TYPE>
    <BREWER>Sam</BREWER>
    <BATCH_SIZE>20.0</BATCH_SIZE>
    <BOIL_SIZE>25.0</BOIL_SIZE>
    <BOIL_TIME>60</BOIL_TIME>
    <EFFICIENCY>72.0</EFFICIENCY>
    <STYLE>
      <NAME>American Pale Ale</NAME>
      <VERSION>1</VERSION>
      <CATEGORY>American Ale</CATEGORY>
      <TYPE>Ale</TYPE>
    </STYLE>
    <HOPS>
      <HOP>
        <NAME>Cascade</NAME>
        <VERSION>1</VERSION>
        <ALPHA>5.5</ALPHA>
        <AMOUNT>0.028</AMOUNT>
        <USE>Boil</USE>
        <TIME>60</TIME>
        <DISPLAY_AMOUNT>28 g</DISPLAY_AMOUNT>
      </HOP>
      <HOP>
        <NAME>Cascade</NAME>
        <VERSION>1</VERSION>
        <ALPHA>5.50</ALPHA>
        <AMOUNT>0.028</AMOUNT>
        <USE>Boil</USE>
        <TIME>60</TIME>
        <DISPLAY_AMOUNT>1 oz</DISPLAY_AMOUNT>
      </HOP>
    </HOPS>
    <FERMENTABLES>
      <FERMENTABLE>
        <NAME>Pale Malt (2 Row) US</NAME>
        <VERSION>1</VERSION>
        <TYPE>Grain</TYPE>
        <AMOUNT>4.5</AMOUNT>
        <YIELD>79.0</YIELD>
        <COLOR>2.0</COLOR>
        <ADD_AFTER_BOIL>FALSE</ADD_AFTER_BOIL>
      </FERMENTABLE>
    </FERMENTABLES>
    <YEASTS>
      <YEAST>
        <NAME>Safale US-05</NAME>
        <VERSION>1</VERSION>
        <TYPE>Ale</TYPE>
        <FORM>Dry</FORM>
        <AMOUNT>0.011</AMOUNT>
        <AMOUNT_IS_WEIGHT>TRUE</AMOUNT_IS_WEIGHT>
      </YEAST>
    </YEASTS>
    <MISCS/>
    <WATERS/>
  </RECIPE>
</RECIPES>
"#;

/// Registry with the bundled BeerXML schemas
pub fn beerxml_registry() -> SchemaRegistry {
    SchemaRegistry::beerxml().expect("bundled schemas are valid")
}

/// Sled store on a temporary database removed on drop
pub fn temporary_sled_store() -> SledEntityStore {
    let db = sled::Config::new()
        .temporary(true)
        .open()
        .expect("temporary sled database");
    SledEntityStore::new(db).expect("entity store trees")
}

/// A minimal HOP node with the given name and alpha acid
pub fn hop_node(name: &str, alpha: &str) -> TypedNode {
    let alpha = alpha
        .parse::<rust_decimal::Decimal>()
        .expect("alpha must be a decimal literal");
    TypedNode::new("HOP")
        .with_scalar("name", name)
        .with_scalar("version", 1i64)
        .with_scalar("alpha", alpha)
}
