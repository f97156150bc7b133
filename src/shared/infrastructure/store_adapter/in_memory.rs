// In memory implementation of the StoreAdapter port.
//
// Purpose
// - Support repository, queue and billing tests without touching the disk.
//
// Responsibilities
// - Keep collections in ordered maps keyed by record id.
// - Simulate an unavailable store, a number of failing writes, or a locked collection, on demand.

use crate::shared::infrastructure::store_adapter::{
    StorageError, StoreAdapter, matches_index, record_key,
};
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Json>>>,
    is_offline: AtomicBool,
    failing_writes: AtomicUsize,
    locked: Mutex<HashSet<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.is_offline.store(offline, Ordering::SeqCst);
    }

    pub fn toggle_offline(&self) {
        self.is_offline.fetch_xor(true, Ordering::SeqCst);
    }

    /// The next `count` writes fail with a quota error, then writes succeed again.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Writes to a locked collection fail until it is unlocked. Reads keep working.
    pub fn set_locked(&self, collection: &str, locked: bool) {
        let mut guard = self.locked.lock().unwrap_or_else(PoisonError::into_inner);
        if locked {
            guard.insert(collection.to_string());
        } else {
            guard.remove(collection);
        }
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    fn check_online(&self) -> Result<(), StorageError> {
        if self.is_offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("Store offline".into()));
        }
        Ok(())
    }

    fn check_writable(&self, collection: &str) -> Result<(), StorageError> {
        self.check_online()?;
        if self
            .locked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(collection)
        {
            return Err(StorageError::Locked {
                collection: collection.to_string(),
            });
        }
        let consumed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return Err(StorageError::QuotaExceeded {
                collection: collection.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StoreAdapter for InMemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Json>, StorageError> {
        self.check_online()?;
        let guard = self.collections.read().await;
        Ok(guard.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn put(&self, collection: &str, record: Json) -> Result<(), StorageError> {
        self.check_writable(collection)?;
        let key = record_key(collection, &record)?;
        let mut guard = self.collections.write().await;
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(key, record);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
        self.check_writable(collection)?;
        let mut guard = self.collections.write().await;
        if let Some(records) = guard.get_mut(collection) {
            records.remove(id);
        }
        Ok(())
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<Json>, StorageError> {
        self.check_online()?;
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_by_index(
        &self,
        collection: &str,
        index_name: &str,
        value: &Json,
    ) -> Result<Vec<Json>, StorageError> {
        self.check_online()?;
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|c| {
                c.values()
                    .filter(|record| matches_index(record, index_name, value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
