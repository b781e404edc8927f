use super::{
    attach_to, relation_key, EntityHandle, EntityRecord, EntityStore, RelationValue,
    StorageError, StorageResult, StoreSession,
};
use crate::mapper::TypedValue;
use crate::materializer::NaturalKey;
use crate::{log_storage_debug, log_storage_info, log_storage_warn};
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree,
    UnabortableTransactionError,
};
use sled::Transactional;
use std::collections::BTreeMap;
use std::path::Path;

const ENTITIES_TREE: &str = "entities";
const NATURAL_KEYS_TREE: &str = "natural_keys";
const RELATIONS_TREE: &str = "relations";

/// Entity counts reported by [`SledEntityStore::stats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub entities: u64,
    pub natural_keys: u64,
    pub relations: u64,
    pub by_tag: BTreeMap<String, u64>,
    pub size_on_disk: u64,
}

/// Durable store on sled.
///
/// Three trees hold the data, all values JSON encoded:
///
/// * `entities`: entity id -> [`EntityRecord`]
/// * `natural_keys`: `TAG:digest` -> entity id
/// * `relations`: `owner id/field` -> [`RelationValue`]
///
/// Transactions span all three trees; sled retries them on conflict, which
/// makes find-or-insert atomic per key across concurrent imports.
#[derive(Clone)]
pub struct SledEntityStore {
    db: sled::Db,
    entities: sled::Tree,
    natural_keys: sled::Tree,
    relations: sled::Tree,
}

impl SledEntityStore {
    /// Creates a store over an open database, opening the trees it needs
    pub fn new(db: sled::Db) -> StorageResult<Self> {
        let entities = db.open_tree(ENTITIES_TREE)?;
        let natural_keys = db.open_tree(NATURAL_KEYS_TREE)?;
        let relations = db.open_tree(RELATIONS_TREE)?;

        Ok(Self {
            db,
            entities,
            natural_keys,
            relations,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        log_storage_info!("Opening entity store at {}", path.as_ref().display());
        Self::new(sled::open(path)?)
    }

    /// Store backed by a temporary database removed on drop
    pub fn temporary() -> StorageResult<Self> {
        Self::new(sled::Config::new().temporary(true).open()?)
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    pub fn flush(&self) -> StorageResult<()> {
        self.db.flush()?;
        Ok(())
    }

    pub fn stats(&self) -> StorageResult<StoreStats> {
        let mut by_tag = BTreeMap::new();
        for entry in self.entities.iter() {
            let (_, bytes) = entry?;
            let record: EntityRecord = decode("entity record", &bytes)?;
            *by_tag.entry(record.tag).or_insert(0) += 1;
        }

        Ok(StoreStats {
            entities: self.entities.len() as u64,
            natural_keys: self.natural_keys.len() as u64,
            relations: self.relations.len() as u64,
            by_tag,
            size_on_disk: self.db.size_on_disk()?,
        })
    }

    fn get_item<T: DeserializeOwned>(
        tree: &sled::Tree,
        key: &str,
        context: &str,
    ) -> StorageResult<Option<T>> {
        match tree.get(key.as_bytes())? {
            Some(bytes) => decode(context, &bytes).map(Some),
            None => Ok(None),
        }
    }
}

fn encode<T: Serialize>(context: &str, item: &T) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(item).map_err(|e| StorageError::serialization(context, e))
}

fn decode<T: DeserializeOwned>(context: &str, bytes: &[u8]) -> StorageResult<T> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::serialization(context, e))
}

/// Session over the transactional views of the three trees.
///
/// sled reports conflicts through the tree operations; the first one is kept
/// here so the transaction can hand it back to sled for a retry instead of
/// aborting with the caller's error.
struct SledSession<'t> {
    entities: &'t TransactionalTree,
    natural_keys: &'t TransactionalTree,
    relations: &'t TransactionalTree,
    interrupted: Option<UnabortableTransactionError>,
}

impl<'t> SledSession<'t> {
    fn track<T>(&mut self, result: Result<T, UnabortableTransactionError>) -> StorageResult<T> {
        result.map_err(|e| {
            let error = match &e {
                UnabortableTransactionError::Conflict => StorageError::Conflict,
                UnabortableTransactionError::Storage(inner) => StorageError::Sled(inner.clone()),
            };
            self.interrupted.get_or_insert(e);
            error
        })
    }

    fn get<T: DeserializeOwned>(
        &mut self,
        tree: &'t TransactionalTree,
        key: &str,
        context: &str,
    ) -> StorageResult<Option<T>> {
        match self.track(tree.get(key.as_bytes()))? {
            Some(bytes) => decode(context, &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(
        &mut self,
        tree: &'t TransactionalTree,
        key: &str,
        context: &str,
        item: &T,
    ) -> StorageResult<()> {
        let bytes = encode(context, item)?;
        self.track(tree.insert(key.as_bytes(), bytes))?;
        Ok(())
    }

    fn require_entity(&mut self, handle: &EntityHandle) -> StorageResult<()> {
        let entities = self.entities;
        match self.track(entities.get(handle.id.as_bytes()))? {
            Some(_) => Ok(()),
            None => Err(StorageError::MissingEntity {
                id: handle.id.clone(),
            }),
        }
    }
}

impl StoreSession for SledSession<'_> {
    fn find_or_insert(
        &mut self,
        key: &NaturalKey,
        fields: &IndexMap<String, TypedValue>,
    ) -> StorageResult<(EntityHandle, bool)> {
        let index_key = key.storage_key()?;
        let natural_keys = self.natural_keys;
        if let Some(id) = self.track(natural_keys.get(index_key.as_bytes()))? {
            let id = String::from_utf8(id.to_vec())
                .map_err(|e| StorageError::backend("find_or_insert", e.to_string()))?;
            return Ok((
                EntityHandle {
                    tag: key.tag().to_string(),
                    id,
                },
                false,
            ));
        }

        let record = EntityRecord::new(key, fields)?;
        let entities = self.entities;
        self.put(entities, &record.id, "entity record", &record)?;
        self.track(natural_keys.insert(index_key.as_bytes(), record.id.as_bytes()))?;
        log_storage_debug!("Inserted {} under {}", record.handle(), index_key);
        Ok((record.handle(), true))
    }

    fn set_relation(
        &mut self,
        owner: &EntityHandle,
        field: &str,
        target: &EntityHandle,
    ) -> StorageResult<()> {
        self.require_entity(owner)?;
        let relations = self.relations;
        self.put(
            relations,
            &relation_key(owner, field),
            "relation",
            &RelationValue::One(target.clone()),
        )
    }

    fn attach_relation(
        &mut self,
        owner: &EntityHandle,
        field: &str,
        target: &EntityHandle,
    ) -> StorageResult<bool> {
        self.require_entity(owner)?;
        let relations = self.relations;
        let key = relation_key(owner, field);
        let existing = self.get(relations, &key, "relation")?;
        match attach_to(existing, owner, field, target)? {
            Some(updated) => {
                self.put(relations, &key, "relation", &updated)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl EntityStore for SledEntityStore {
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: Fn(&mut dyn StoreSession) -> Result<T, E>,
        E: From<StorageError>,
    {
        let result = (&self.entities, &self.natural_keys, &self.relations).transaction(
            |(entities, natural_keys, relations)| {
                let mut session = SledSession {
                    entities,
                    natural_keys,
                    relations,
                    interrupted: None,
                };
                match f(&mut session) {
                    Ok(value) => Ok(value),
                    Err(error) => match session.interrupted.take() {
                        Some(UnabortableTransactionError::Conflict) => {
                            log_storage_debug!("Transaction conflict, retrying");
                            Err(ConflictableTransactionError::Conflict)
                        }
                        Some(UnabortableTransactionError::Storage(e)) => {
                            Err(ConflictableTransactionError::Storage(e))
                        }
                        None => Err(ConflictableTransactionError::Abort(error)),
                    },
                }
            },
        );

        match result {
            Ok(value) => Ok(value),
            Err(TransactionError::Abort(error)) => Err(error),
            Err(TransactionError::Storage(e)) => {
                log_storage_warn!("Transaction failed in sled: {}", e);
                Err(E::from(StorageError::Sled(e)))
            }
        }
    }

    fn entity(&self, handle: &EntityHandle) -> StorageResult<Option<EntityRecord>> {
        Self::get_item(&self.entities, &handle.id, "entity record")
    }

    fn find(&self, key: &NaturalKey) -> StorageResult<Option<EntityHandle>> {
        match self.natural_keys.get(key.storage_key()?.as_bytes())? {
            Some(id) => {
                let id = String::from_utf8(id.to_vec())
                    .map_err(|e| StorageError::backend("find", e.to_string()))?;
                Ok(Some(EntityHandle {
                    tag: key.tag().to_string(),
                    id,
                }))
            }
            None => Ok(None),
        }
    }

    fn related_one(&self, owner: &EntityHandle, field: &str) -> StorageResult<Option<EntityHandle>> {
        let value: Option<RelationValue> =
            Self::get_item(&self.relations, &relation_key(owner, field), "relation")?;
        Ok(match value {
            Some(RelationValue::One(target)) => Some(target),
            _ => None,
        })
    }

    fn related_many(&self, owner: &EntityHandle, field: &str) -> StorageResult<Vec<EntityHandle>> {
        let value: Option<RelationValue> =
            Self::get_item(&self.relations, &relation_key(owner, field), "relation")?;
        Ok(match value {
            Some(RelationValue::Many(targets)) => targets,
            _ => Vec::new(),
        })
    }

    fn count(&self, tag: Option<&str>) -> StorageResult<usize> {
        let Some(tag) = tag else {
            return Ok(self.entities.len());
        };
        let prefix = format!("{}:", tag);
        Ok(self.natural_keys.scan_prefix(prefix.as_bytes()).count())
    }
}
