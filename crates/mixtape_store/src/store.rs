//! Entity storage contract.

use crate::error::StoreResult;
use async_trait::async_trait;
use mixtape_protocol::SyncEntity;
use uuid::Uuid;

/// Per-collection local storage, as the sync engine sees it.
///
/// One instance serves one collection (playlists, starred tracks). The
/// engine addresses records only by their client-generated `uuid` and by
/// their sync flag; it never enumerates a collection wholesale.
///
/// # Invariants
///
/// - `upsert` is a full overwrite of the record stored under its `uuid`
/// - `unsynced` returns exactly the records whose sync flag is unset,
///   which is the complete set the push phase must consider
/// - `delete` of an absent key is a no-op, not an error
/// - Stores must be `Send + Sync`; the engine assumes no concurrent
///   external writers during a sync round
#[async_trait]
pub trait EntityStore<E: SyncEntity>: Send + Sync {
    /// Stores the record, replacing any existing record with the same key.
    async fn upsert(&self, entity: E) -> StoreResult<()>;

    /// Stores a batch of records, replacing existing ones key by key.
    async fn upsert_all(&self, entities: Vec<E>) -> StoreResult<()>;

    /// Returns the record stored under the given key, if any.
    async fn get(&self, uuid: Uuid) -> StoreResult<Option<E>>;

    /// Removes the record stored under the given key.
    async fn delete(&self, uuid: Uuid) -> StoreResult<()>;

    /// Removes a batch of records by key.
    async fn delete_all(&self, uuids: &[Uuid]) -> StoreResult<()>;

    /// Returns every record whose sync flag is unset.
    async fn unsynced(&self) -> StoreResult<Vec<E>>;
}
