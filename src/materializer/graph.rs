use super::key::{InheritedContext, NaturalKey};
use super::options::MaterializeOptions;
use crate::error::{BrewFoldResult, MaterializationError};
use crate::mapper::TypedNode;
use crate::schema::SchemaRegistry;
use crate::storage::{EntityHandle, EntityStore, StoreSession};
use crate::{log_materializer_debug, log_materializer_info, log_materializer_warn};
use serde::Serialize;
use std::time::Instant;

/// Root entity of a materialized graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Materialized {
    pub handle: EntityHandle,
    /// False when an entity with the same natural key already existed
    pub was_created: bool,
}

/// Persists [`TypedNode`] graphs into an [`EntityStore`], deduplicating every
/// entity by its natural key.
pub struct GraphMaterializer<'a> {
    registry: &'a SchemaRegistry,
    options: MaterializeOptions,
}

impl<'a> GraphMaterializer<'a> {
    pub fn new(registry: &'a SchemaRegistry, options: MaterializeOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &MaterializeOptions {
        &self.options
    }

    /// Finds or creates the entity for `node` and, recursively, for every node
    /// it relates to, then links them.
    ///
    /// The whole graph is written in one transaction: on any error nothing
    /// from this call remains in the store.
    pub fn materialize<S>(
        &self,
        store: &S,
        node: &TypedNode,
        inherited: &InheritedContext,
    ) -> BrewFoldResult<Materialized>
    where
        S: EntityStore + ?Sized,
    {
        let started = Instant::now();
        let result = store.with_transaction(|session| {
            let (handle, was_created) = self.walk(session, node, inherited, 0, started)?;
            Ok(Materialized {
                handle,
                was_created,
            })
        });

        match &result {
            Ok(materialized) => log_materializer_info!(
                "Materialized {} ({}) in {} ms",
                materialized.handle,
                if materialized.was_created { "created" } else { "existing" },
                started.elapsed().as_millis()
            ),
            Err(e) => log_materializer_warn!("Rolled back <{}>: {}", node.tag(), e),
        }
        result
    }

    fn walk(
        &self,
        session: &mut dyn StoreSession,
        node: &TypedNode,
        inherited: &InheritedContext,
        depth: usize,
        started: Instant,
    ) -> BrewFoldResult<(EntityHandle, bool)> {
        if depth > self.options.max_depth {
            return Err(MaterializationError::DepthExceeded {
                tag: node.tag().to_string(),
                depth,
                limit: self.options.max_depth,
            }
            .into());
        }

        let schema = self.registry.resolve(node.tag())?;
        let key = NaturalKey::from_node(node, schema, inherited);

        self.checkpoint(started)?;
        let (handle, created) = session.find_or_insert(&key, node.scalar_map())?;
        log_materializer_debug!(
            "{} {} at depth {}",
            if created { "Created" } else { "Found" },
            handle,
            depth
        );

        for (field, related) in node.to_one_relations() {
            let (target, _) = self.walk(session, related, inherited, depth + 1, started)?;
            self.checkpoint(started)?;
            session.set_relation(&handle, field, &target)?;
        }

        for (field, items) in node.to_many_relations() {
            for item in items {
                let (target, _) = self.walk(session, item, inherited, depth + 1, started)?;
                self.checkpoint(started)?;
                session.attach_relation(&handle, field, &target)?;
            }
        }

        Ok((handle, created))
    }

    /// Fails when the caller cancelled or the deadline has passed
    fn checkpoint(&self, started: Instant) -> Result<(), MaterializationError> {
        if let Some(token) = &self.options.cancellation {
            if token.is_cancelled() {
                return Err(MaterializationError::Cancelled);
            }
        }
        if let Some(timeout) = self.options.timeout {
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(MaterializationError::TimedOut {
                    elapsed_ms: elapsed.as_millis(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrewFoldError;
    use crate::materializer::CancellationToken;
    use crate::schema::{FieldSpec, Schema};
    use crate::storage::MemoryEntityStore;
    use std::time::Duration;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                Schema::new("RECIPE")
                    .field("name", FieldSpec::text())
                    .field("style", FieldSpec::to_one("STYLE"))
                    .field("hops", FieldSpec::to_many("HOP")),
            )
            .unwrap();
        registry
            .register(Schema::new("STYLE").field("name", FieldSpec::text()))
            .unwrap();
        registry
            .register(
                Schema::new("HOP")
                    .field("name", FieldSpec::text())
                    .field("display_amount", FieldSpec::text().derived()),
            )
            .unwrap();
        registry
    }

    fn recipe(name: &str) -> TypedNode {
        TypedNode::new("RECIPE")
            .with_scalar("name", name)
            .with_one("style", TypedNode::new("STYLE").with_scalar("name", "APA"))
            .with_many(
                "hops",
                vec![
                    TypedNode::new("HOP").with_scalar("name", "Cascade"),
                    TypedNode::new("HOP").with_scalar("name", "Centennial"),
                    TypedNode::new("HOP")
                        .with_scalar("name", "Cascade")
                        .with_scalar("display_amount", "1 oz"),
                ],
            )
    }

    #[test]
    fn test_materialize_links_and_dedups() {
        let registry = registry();
        let store = MemoryEntityStore::new();
        let materializer = GraphMaterializer::new(&registry, MaterializeOptions::default());
        let ctx = InheritedContext::new();

        let first = materializer.materialize(&store, &recipe("Pale"), &ctx).unwrap();
        assert!(first.was_created);
        assert_eq!(store.count(Some("HOP")).unwrap(), 2);
        assert_eq!(store.related_many(&first.handle, "hops").unwrap().len(), 2);
        assert!(store.related_one(&first.handle, "style").unwrap().is_some());

        let again = materializer.materialize(&store, &recipe("Pale"), &ctx).unwrap();
        assert!(!again.was_created);
        assert_eq!(again.handle, first.handle);
        assert_eq!(store.count(None).unwrap(), 4);

        let other = materializer.materialize(&store, &recipe("Amber"), &ctx).unwrap();
        assert!(other.was_created);
        assert_eq!(store.count(Some("HOP")).unwrap(), 2);
        assert_eq!(store.count(Some("STYLE")).unwrap(), 1);
    }

    #[test]
    fn test_hand_built_tag_case_shares_entity() {
        let registry = registry();
        let store = MemoryEntityStore::new();
        let materializer = GraphMaterializer::new(&registry, MaterializeOptions::default());
        let ctx = InheritedContext::new();

        let upper = materializer
            .materialize(&store, &TypedNode::new("HOP").with_scalar("name", "Saaz"), &ctx)
            .unwrap();
        let lower = materializer
            .materialize(&store, &TypedNode::new("hop").with_scalar("name", "Saaz"), &ctx)
            .unwrap();
        assert!(!lower.was_created);
        assert_eq!(lower.handle, upper.handle);
        assert_eq!(store.count(Some("HOP")).unwrap(), 1);
    }

    #[test]
    fn test_context_scopes_entities() {
        let registry = registry();
        let store = MemoryEntityStore::new();
        let materializer = GraphMaterializer::new(&registry, MaterializeOptions::default());

        let alice = materializer
            .materialize(&store, &recipe("Pale"), &InheritedContext::owned_by("alice"))
            .unwrap();
        let bob = materializer
            .materialize(&store, &recipe("Pale"), &InheritedContext::owned_by("bob"))
            .unwrap();
        assert_ne!(alice.handle, bob.handle);
        assert_eq!(store.count(Some("HOP")).unwrap(), 4);
    }

    #[test]
    fn test_depth_limit_rolls_back() {
        let registry = registry();
        let store = MemoryEntityStore::new();
        let options = MaterializeOptions::default().with_max_depth(0);
        let err = GraphMaterializer::new(&registry, options)
            .materialize(&store, &recipe("Pale"), &InheritedContext::new())
            .unwrap_err();
        assert!(matches!(
            err,
            BrewFoldError::Materialization(MaterializationError::DepthExceeded { depth: 1, limit: 0, .. })
        ));
        assert_eq!(store.count(None).unwrap(), 0);
    }

    #[test]
    fn test_cancelled_before_first_write() {
        let registry = registry();
        let store = MemoryEntityStore::new();
        let token = CancellationToken::new();
        token.cancel();
        let options = MaterializeOptions::default().with_cancellation(token);
        let err = GraphMaterializer::new(&registry, options)
            .materialize(&store, &recipe("Pale"), &InheritedContext::new())
            .unwrap_err();
        assert!(matches!(
            err,
            BrewFoldError::Materialization(MaterializationError::Cancelled)
        ));
        assert_eq!(store.count(None).unwrap(), 0);
    }

    #[test]
    fn test_zero_timeout() {
        let registry = registry();
        let store = MemoryEntityStore::new();
        let options = MaterializeOptions::default().with_timeout(Duration::ZERO);
        let err = GraphMaterializer::new(&registry, options)
            .materialize(&store, &recipe("Pale"), &InheritedContext::new())
            .unwrap_err();
        assert!(matches!(
            err,
            BrewFoldError::Materialization(MaterializationError::TimedOut { .. })
        ));
    }

    #[test]
    fn test_unknown_tag() {
        let registry = registry();
        let store = MemoryEntityStore::new();
        let err = GraphMaterializer::new(&registry, MaterializeOptions::default())
            .materialize(&store, &TypedNode::new("GRAIN"), &InheritedContext::new())
            .unwrap_err();
        assert!(matches!(err, BrewFoldError::SchemaResolution { .. }));
    }
}
