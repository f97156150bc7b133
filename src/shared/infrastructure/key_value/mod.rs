// Ancillary local key-value state (settings, the durable retry queue mirror).

use async_trait::async_trait;
use serde_json::Value as Json;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyValueError {
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),

    #[error("key-value i/o error: {0}")]
    Io(String),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Json>, KeyValueError>;
    async fn set(&self, key: &str, value: Json) -> Result<(), KeyValueError>;
    async fn remove(&self, key: &str) -> Result<(), KeyValueError>;
    async fn keys(&self) -> Result<Vec<String>, KeyValueError>;
    async fn clear(&self) -> Result<(), KeyValueError>;
}

pub mod in_memory;
pub mod json_file;
