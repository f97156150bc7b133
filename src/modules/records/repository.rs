// Generic repository over the store adapter.
//
// Responsibilities
// - Stamp identity and timestamps, merge patches, soft delete.
// - Translate between typed records and the adapter's JSON.
//
// Boundaries
// - No retries here. A StorageError is returned to the caller, which decides whether to queue.

use crate::modules::records::core::record::{Entity, Stored};
use crate::shared::core::clock::Clock;
use crate::shared::core::primitives::RecordId;
use crate::shared::infrastructure::store_adapter::{StorageError, StoreAdapter};
use serde_json::Value as Json;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RepositoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{collection} record {id} not found")]
    NotFound { collection: String, id: RecordId },

    #[error("{collection} record could not be decoded: {reason}")]
    Corrupt { collection: String, reason: String },
}

impl RepositoryError {
    /// Only storage failures are worth retrying.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, RepositoryError::Storage(e) if e.is_transient())
    }
}

pub struct Repository<T: Entity> {
    store: Arc<dyn StoreAdapter>,
    clock: Arc<dyn Clock>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn StoreAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            _entity: PhantomData,
        }
    }

    pub fn collection(&self) -> &'static str {
        T::KIND.collection()
    }

    /// Stamps a new record without writing it.
    pub fn prepare(&self, data: T) -> Stored<T> {
        let now = self.clock.now();
        Stored {
            id: RecordId::generate(),
            created_at: now,
            updated_at: now,
            archived_at: None,
            data,
        }
    }

    pub async fn create(&self, data: T) -> Result<Stored<T>, RepositoryError> {
        let record = self.prepare(data);
        self.put(&record).await?;
        Ok(record)
    }

    /// Writes an already stamped record as is.
    pub async fn put(&self, record: &Stored<T>) -> Result<(), RepositoryError> {
        let json = self.encode(record)?;
        self.store.put(self.collection(), json).await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: &RecordId) -> Result<Option<Stored<T>>, RepositoryError> {
        self.store
            .get(self.collection(), id.as_str())
            .await?
            .map(|json| self.decode(json))
            .transpose()
    }

    pub async fn list(&self) -> Result<Vec<Stored<T>>, RepositoryError> {
        self.store
            .list_all(self.collection())
            .await?
            .into_iter()
            .map(|json| self.decode(json))
            .collect()
    }

    pub async fn list_active(&self) -> Result<Vec<Stored<T>>, RepositoryError> {
        let mut records = self.list().await?;
        records.retain(|record| !record.is_archived());
        Ok(records)
    }

    pub async fn list_by_index(
        &self,
        index_name: &str,
        value: &Json,
    ) -> Result<Vec<Stored<T>>, RepositoryError> {
        self.store
            .list_by_index(self.collection(), index_name, value)
            .await?
            .into_iter()
            .map(|json| self.decode(json))
            .collect()
    }

    pub async fn update(
        &self,
        id: &RecordId,
        patch: T::Patch,
    ) -> Result<Stored<T>, RepositoryError> {
        let mut record = self.require(id).await?;
        record.data.apply(patch);
        record.updated_at = self.clock.now().max(record.updated_at);
        self.put(&record).await?;
        Ok(record)
    }

    /// Archives the record. Archiving an archived record is a successful no-op.
    pub async fn soft_delete(&self, id: &RecordId) -> Result<Stored<T>, RepositoryError> {
        let mut record = self.require(id).await?;
        if record.is_archived() {
            return Ok(record);
        }
        let now = self.clock.now().max(record.updated_at);
        record.archived_at = Some(now);
        record.updated_at = now;
        self.put(&record).await?;
        Ok(record)
    }

    /// Physically deletes the record. Removing a missing record is a no-op.
    pub async fn remove(&self, id: &RecordId) -> Result<(), RepositoryError> {
        self.store.delete(self.collection(), id.as_str()).await?;
        Ok(())
    }

    async fn require(&self, id: &RecordId) -> Result<Stored<T>, RepositoryError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                collection: self.collection().to_string(),
                id: id.clone(),
            })
    }

    fn encode(&self, record: &Stored<T>) -> Result<Json, RepositoryError> {
        serde_json::to_value(record).map_err(|e| RepositoryError::Corrupt {
            collection: self.collection().to_string(),
            reason: e.to_string(),
        })
    }

    fn decode(&self, json: Json) -> Result<Stored<T>, RepositoryError> {
        serde_json::from_value(json).map_err(|e| RepositoryError::Corrupt {
            collection: self.collection().to_string(),
            reason: e.to_string(),
        })
    }
}
