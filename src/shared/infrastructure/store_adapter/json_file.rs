// File-backed implementation of the StoreAdapter port.
//
// Purpose
// - Give the command-line shell a durable store without an external database.
//
// Responsibilities
// - Keep one `<collection>.json` file per collection under the data directory.
// - Load a collection lazily on first access and write it back atomically (temp file + rename).

use crate::shared::infrastructure::store_adapter::{
    StorageError, StoreAdapter, matches_index, record_key,
};
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

type Collection = BTreeMap<String, Json>;

pub struct JsonFileStore {
    root: PathBuf,
    cache: Mutex<HashMap<String, Collection>>,
}

impl JsonFileStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(io_error)?;
        Ok(Self {
            root,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn path_of(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.json"))
    }

    async fn load(&self, collection: &str) -> Result<Collection, StorageError> {
        match fs::read(self.path_of(collection)).await {
            Ok(bytes) => {
                let records: Vec<Json> = serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::Io(format!("{collection}: {e}")))?;
                records
                    .into_iter()
                    .map(|record| Ok((record_key(collection, &record)?, record)))
                    .collect()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Collection::new()),
            Err(e) => Err(io_error(e)),
        }
    }

    async fn write(&self, collection: &str, records: &Collection) -> Result<(), StorageError> {
        let values: Vec<&Json> = records.values().collect();
        let bytes = serde_json::to_vec_pretty(&values)
            .map_err(|e| StorageError::Io(format!("{collection}: {e}")))?;
        let path = self.path_of(collection);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await.map_err(io_error)?;
        fs::rename(&tmp, &path).await.map_err(io_error)
    }

    async fn with_collection<R>(
        &self,
        collection: &str,
        f: impl FnOnce(&Collection) -> R,
    ) -> Result<R, StorageError> {
        let mut cache = self.cache.lock().await;
        if !cache.contains_key(collection) {
            let loaded = self.load(collection).await?;
            cache.insert(collection.to_string(), loaded);
        }
        Ok(f(&cache[collection]))
    }

    async fn mutate(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Collection),
    ) -> Result<(), StorageError> {
        let mut cache = self.cache.lock().await;
        let mut records = match cache.get(collection) {
            Some(records) => records.clone(),
            None => self.load(collection).await?,
        };
        f(&mut records);
        self.write(collection, &records).await?;
        cache.insert(collection.to_string(), records);
        Ok(())
    }
}

fn io_error(error: std::io::Error) -> StorageError {
    StorageError::Io(error.to_string())
}

#[async_trait::async_trait]
impl StoreAdapter for JsonFileStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Json>, StorageError> {
        self.with_collection(collection, |records| records.get(id).cloned())
            .await
    }

    async fn put(&self, collection: &str, record: Json) -> Result<(), StorageError> {
        let key = record_key(collection, &record)?;
        self.mutate(collection, |records| {
            records.insert(key, record);
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
        self.mutate(collection, |records| {
            records.remove(id);
        })
        .await
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<Json>, StorageError> {
        self.with_collection(collection, |records| records.values().cloned().collect())
            .await
    }

    async fn list_by_index(
        &self,
        collection: &str,
        index_name: &str,
        value: &Json,
    ) -> Result<Vec<Json>, StorageError> {
        self.with_collection(collection, |records| {
            records
                .values()
                .filter(|record| matches_index(record, index_name, value))
                .cloned()
                .collect()
        })
        .await
    }
}
