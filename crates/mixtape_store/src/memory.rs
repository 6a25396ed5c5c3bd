//! In-memory entity store.

use crate::error::StoreResult;
use crate::store::EntityStore;
use async_trait::async_trait;
use mixtape_protocol::SyncEntity;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// An in-memory entity store.
///
/// Suitable for unit tests, integration tests, and embedders that do not
/// need persistence. Thread-safe and shareable across tasks.
#[derive(Debug)]
pub struct MemoryStore<E> {
    records: RwLock<HashMap<Uuid, E>>,
}

impl<E: SyncEntity> MemoryStore<E> {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True when the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns a snapshot of every stored record.
    #[must_use]
    pub fn all(&self) -> Vec<E> {
        self.records.read().values().cloned().collect()
    }
}

impl<E: SyncEntity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: SyncEntity> EntityStore<E> for MemoryStore<E> {
    async fn upsert(&self, entity: E) -> StoreResult<()> {
        self.records.write().insert(entity.uuid(), entity);
        Ok(())
    }

    async fn upsert_all(&self, entities: Vec<E>) -> StoreResult<()> {
        let mut records = self.records.write();
        for entity in entities {
            records.insert(entity.uuid(), entity);
        }
        Ok(())
    }

    async fn get(&self, uuid: Uuid) -> StoreResult<Option<E>> {
        Ok(self.records.read().get(&uuid).cloned())
    }

    async fn delete(&self, uuid: Uuid) -> StoreResult<()> {
        self.records.write().remove(&uuid);
        Ok(())
    }

    async fn delete_all(&self, uuids: &[Uuid]) -> StoreResult<()> {
        let mut records = self.records.write();
        for uuid in uuids {
            records.remove(uuid);
        }
        Ok(())
    }

    async fn unsynced(&self) -> StoreResult<Vec<E>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|e| !e.is_synced())
            .cloned()
            .collect())
    }
}
