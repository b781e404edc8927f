use super::{
    attach_to, relation_key, EntityHandle, EntityRecord, EntityStore, RelationValue,
    StorageError, StorageResult, StoreSession,
};
use crate::log_storage_debug;
use crate::mapper::TypedValue;
use crate::materializer::NaturalKey;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    entities: IndexMap<String, EntityRecord>,
    natural_keys: HashMap<String, String>,
    relations: HashMap<String, RelationValue>,
}

impl StoreSession for MemoryState {
    fn find_or_insert(
        &mut self,
        key: &NaturalKey,
        fields: &IndexMap<String, TypedValue>,
    ) -> StorageResult<(EntityHandle, bool)> {
        let index_key = key.storage_key()?;
        if let Some(id) = self.natural_keys.get(&index_key) {
            return Ok((
                EntityHandle {
                    tag: key.tag().to_string(),
                    id: id.clone(),
                },
                false,
            ));
        }

        let record = EntityRecord::new(key, fields)?;
        let handle = record.handle();
        self.natural_keys.insert(index_key, record.id.clone());
        self.entities.insert(record.id.clone(), record);
        Ok((handle, true))
    }

    fn set_relation(
        &mut self,
        owner: &EntityHandle,
        field: &str,
        target: &EntityHandle,
    ) -> StorageResult<()> {
        if !self.entities.contains_key(&owner.id) {
            return Err(StorageError::MissingEntity {
                id: owner.id.clone(),
            });
        }
        self.relations.insert(
            relation_key(owner, field),
            RelationValue::One(target.clone()),
        );
        Ok(())
    }

    fn attach_relation(
        &mut self,
        owner: &EntityHandle,
        field: &str,
        target: &EntityHandle,
    ) -> StorageResult<bool> {
        if !self.entities.contains_key(&owner.id) {
            return Err(StorageError::MissingEntity {
                id: owner.id.clone(),
            });
        }
        let key = relation_key(owner, field);
        let existing = self.relations.get(&key).cloned();
        match attach_to(existing, owner, field, target)? {
            Some(updated) => {
                self.relations.insert(key, updated);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-process store for tests and dry runs.
///
/// A transaction works on a copy of the state which replaces the original
/// only when the transaction succeeds. Transactions are serialized by the lock.
///
/// Every transaction clones the whole state, so importing K items into a
/// store holding N entities costs O(K·N). Use [`SledEntityStore`] for large
/// stores.
///
/// [`SledEntityStore`]: super::SledEntityStore
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    state: Mutex<MemoryState>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> StorageResult<T> {
        let state = self
            .state
            .lock()
            .map_err(|_| StorageError::backend("read", "store lock poisoned"))?;
        Ok(f(&state))
    }

    /// All stored records in insertion order
    pub fn records(&self) -> StorageResult<Vec<EntityRecord>> {
        self.read(|state| state.entities.values().cloned().collect())
    }
}

impl EntityStore for MemoryEntityStore {
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: Fn(&mut dyn StoreSession) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StorageError::backend("transaction", "store lock poisoned"))?;

        let mut working = state.clone();
        match f(&mut working) {
            Ok(value) => {
                *state = working;
                Ok(value)
            }
            Err(error) => {
                log_storage_debug!("Discarding uncommitted memory transaction");
                Err(error)
            }
        }
    }

    fn entity(&self, handle: &EntityHandle) -> StorageResult<Option<EntityRecord>> {
        self.read(|state| state.entities.get(&handle.id).cloned())
    }

    fn find(&self, key: &NaturalKey) -> StorageResult<Option<EntityHandle>> {
        let index_key = key.storage_key()?;
        self.read(|state| {
            state
                .natural_keys
                .get(&index_key)
                .map(|id| EntityHandle {
                    tag: key.tag().to_string(),
                    id: id.clone(),
                })
        })
    }

    fn related_one(&self, owner: &EntityHandle, field: &str) -> StorageResult<Option<EntityHandle>> {
        self.read(|state| match state.relations.get(&relation_key(owner, field)) {
            Some(RelationValue::One(target)) => Some(target.clone()),
            _ => None,
        })
    }

    fn related_many(&self, owner: &EntityHandle, field: &str) -> StorageResult<Vec<EntityHandle>> {
        self.read(|state| match state.relations.get(&relation_key(owner, field)) {
            Some(RelationValue::Many(targets)) => targets.clone(),
            _ => Vec::new(),
        })
    }

    fn count(&self, tag: Option<&str>) -> StorageResult<usize> {
        self.read(|state| match tag {
            Some(tag) => state.entities.values().filter(|r| r.tag == tag).count(),
            None => state.entities.len(),
        })
    }
}
