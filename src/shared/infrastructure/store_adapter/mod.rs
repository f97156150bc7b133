// Store adapter port: the embedded, transactional local object store.
//
// Purpose
// - Describe the primitives the repository layer needs, without implementing storage.
//
// Boundaries
// - Records are JSON objects keyed by their `id` field, grouped into named collections.
// - Every primitive may fail with a StorageError. All but MissingKey are transient.

use async_trait::async_trait;
use serde_json::Value as Json;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage quota exceeded in {collection}")]
    QuotaExceeded { collection: String },

    #[error("collection {collection} is locked by another transaction")]
    Locked { collection: String },

    #[error("record in {collection} has no string `id` field")]
    MissingKey { collection: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage i/o error: {0}")]
    Io(String),
}

impl StorageError {
    /// A malformed record fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        !matches!(self, StorageError::MissingKey { .. })
    }
}

#[async_trait]
pub trait StoreAdapter: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Json>, StorageError>;
    async fn put(&self, collection: &str, record: Json) -> Result<(), StorageError>;
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError>;
    async fn list_all(&self, collection: &str) -> Result<Vec<Json>, StorageError>;
    async fn list_by_index(
        &self,
        collection: &str,
        index_name: &str,
        value: &Json,
    ) -> Result<Vec<Json>, StorageError>;
}

pub(crate) fn record_key(collection: &str, record: &Json) -> Result<String, StorageError> {
    record
        .get("id")
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| StorageError::MissingKey {
            collection: collection.to_string(),
        })
}

pub(crate) fn matches_index(record: &Json, index_name: &str, value: &Json) -> bool {
    record.get(index_name) == Some(value)
}

pub mod in_memory;
pub mod json_file;
