// File-backed key-value store: a single JSON object persisted on every mutation.

use crate::shared::infrastructure::key_value::{KeyValueError, KeyValueStore};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

pub struct JsonFileKeyValue {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Json>>,
}

impl JsonFileKeyValue {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, KeyValueError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| KeyValueError::Io(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(KeyValueError::Io(e.to_string())),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &BTreeMap<String, Json>) -> Result<(), KeyValueError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| KeyValueError::Io(e.to_string()))?;
        }
        let bytes =
            serde_json::to_vec_pretty(entries).map_err(|e| KeyValueError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| KeyValueError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| KeyValueError::Io(e.to_string()))
    }

    async fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, Json>)) -> Result<(), KeyValueError> {
        let mut guard = self.entries.lock().await;
        let mut next = guard.clone();
        f(&mut next);
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for JsonFileKeyValue {
    async fn get(&self, key: &str) -> Result<Option<Json>, KeyValueError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Json) -> Result<(), KeyValueError> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), KeyValueError> {
        self.mutate(|entries| {
            entries.remove(key);
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>, KeyValueError> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<(), KeyValueError> {
        self.mutate(BTreeMap::clear).await
    }
}
