use crate::shared::infrastructure::key_value::{KeyValueError, KeyValueStore};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryKeyValue {
    entries: RwLock<BTreeMap<String, Json>>,
    is_offline: AtomicBool,
}

impl InMemoryKeyValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.is_offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), KeyValueError> {
        if self.is_offline.load(Ordering::SeqCst) {
            return Err(KeyValueError::Unavailable("Key-value store offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for InMemoryKeyValue {
    async fn get(&self, key: &str) -> Result<Option<Json>, KeyValueError> {
        self.check_online()?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Json) -> Result<(), KeyValueError> {
        self.check_online()?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), KeyValueError> {
        self.check_online()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, KeyValueError> {
        self.check_online()?;
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<(), KeyValueError> {
        self.check_online()?;
        self.entries.write().await.clear();
        Ok(())
    }
}
