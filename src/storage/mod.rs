//! # Entity Storage
//!
//! The materializer talks to storage through two traits. [`EntityStore`] owns
//! transactions and serves reads; a [`StoreSession`] is the write surface valid
//! for the duration of one transaction. Everything a session writes is
//! committed together or not at all.
//!
//! Two backends are provided: [`SledEntityStore`] for durable storage and
//! [`MemoryEntityStore`] for tests and dry runs.

pub mod memory_store;
pub mod sled_store;

pub use memory_store::MemoryEntityStore;
pub use sled_store::{SledEntityStore, StoreStats};

use crate::mapper::TypedValue;
use crate::materializer::NaturalKey;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Opaque reference to a persisted entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle {
    pub tag: String,
    pub id: String,
}

impl EntityHandle {
    /// Handle with a fresh random id
    pub fn generate(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag, self.id)
    }
}

/// Stored form of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub tag: String,
    pub key_digest: String,
    pub key_fields: BTreeMap<String, TypedValue>,
    pub context: BTreeMap<String, String>,
    /// Every scalar of the first node stored under this key, derived ones included
    pub fields: IndexMap<String, TypedValue>,
    pub created_at: DateTime<Utc>,
}

impl EntityRecord {
    pub fn new(key: &NaturalKey, fields: &IndexMap<String, TypedValue>) -> StorageResult<Self> {
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            tag: key.tag().to_string(),
            key_digest: key.digest()?,
            key_fields: key.fields().clone(),
            context: key.context().clone(),
            fields: fields.clone(),
            created_at: Utc::now(),
        })
    }

    pub fn handle(&self) -> EntityHandle {
        EntityHandle {
            tag: self.tag.clone(),
            id: self.id.clone(),
        }
    }
}

/// Value stored for one `(owner, field)` relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationValue {
    One(EntityHandle),
    Many(Vec<EntityHandle>),
}

pub(crate) fn relation_key(owner: &EntityHandle, field: &str) -> String {
    format!("{}/{}", owner.id, field)
}

/// Errors raised by storage backends
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("failed to encode or decode {context}: {source}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A concurrent transaction touched the same keys; the store retries
    #[error("transaction conflict")]
    Conflict,

    #[error("no entity with id '{id}'")]
    MissingEntity { id: String },

    #[error("relation '{field}' on {owner} holds a {found} value")]
    RelationShape {
        owner: String,
        field: String,
        found: &'static str,
    },

    #[error("{operation} failed: {message}")]
    Backend { operation: String, message: String },
}

impl StorageError {
    pub fn backend(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub(crate) fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Write operations available inside a transaction
pub trait StoreSession {
    /// Returns the entity stored under `key`, inserting it with `fields` when
    /// absent. The flag is true when the entity was created by this call.
    fn find_or_insert(
        &mut self,
        key: &NaturalKey,
        fields: &IndexMap<String, TypedValue>,
    ) -> StorageResult<(EntityHandle, bool)>;

    /// Points a single-valued relation at `target`, replacing any previous value
    fn set_relation(
        &mut self,
        owner: &EntityHandle,
        field: &str,
        target: &EntityHandle,
    ) -> StorageResult<()>;

    /// Adds `target` to a multi-valued relation. Attaching the same target
    /// twice is a no-op and keeps its first position; returns whether it was new.
    fn attach_relation(
        &mut self,
        owner: &EntityHandle,
        field: &str,
        target: &EntityHandle,
    ) -> StorageResult<bool>;
}

/// A store of deduplicated entities
pub trait EntityStore {
    /// Runs `f` in one transaction. When `f` fails nothing it wrote is kept.
    ///
    /// `f` may run more than once if the backend retries after a conflict.
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: Fn(&mut dyn StoreSession) -> Result<T, E>,
        E: From<StorageError>;

    fn entity(&self, handle: &EntityHandle) -> StorageResult<Option<EntityRecord>>;

    fn find(&self, key: &NaturalKey) -> StorageResult<Option<EntityHandle>>;

    fn related_one(&self, owner: &EntityHandle, field: &str) -> StorageResult<Option<EntityHandle>>;

    fn related_many(&self, owner: &EntityHandle, field: &str) -> StorageResult<Vec<EntityHandle>>;

    /// Number of entities, optionally restricted to one tag
    fn count(&self, tag: Option<&str>) -> StorageResult<usize>;
}

/// Shared relation bookkeeping for the backends
pub(crate) fn attach_to(
    existing: Option<RelationValue>,
    owner: &EntityHandle,
    field: &str,
    target: &EntityHandle,
) -> StorageResult<Option<RelationValue>> {
    let mut targets = match existing {
        None => Vec::new(),
        Some(RelationValue::Many(targets)) => targets,
        Some(RelationValue::One(_)) => {
            return Err(StorageError::RelationShape {
                owner: owner.to_string(),
                field: field.to_string(),
                found: "single",
            })
        }
    };
    if targets.contains(target) {
        return Ok(None);
    }
    targets.push(target.clone());
    Ok(Some(RelationValue::Many(targets)))
}
