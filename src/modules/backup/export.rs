// Full export of every collection into one JSON bundle.

use crate::modules::records::core::record::EntityKind;
use crate::shared::core::clock::Clock;
use crate::shared::core::primitives::Timestamp;
use crate::shared::infrastructure::store_adapter::{StorageError, StoreAdapter};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("unsupported bundle format version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDump {
    pub name: String,
    pub records: Vec<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub format_version: u32,
    pub exported_at: Timestamp,
    pub collections: Vec<CollectionDump>,
    pub counts: BTreeMap<String, usize>,
}

impl ExportBundle {
    pub fn record_count(&self) -> usize {
        self.collections.iter().map(|c| c.records.len()).sum()
    }
}

/// Dumps every collection, parents before children.
pub async fn export_all(
    store: &dyn StoreAdapter,
    clock: &dyn Clock,
) -> Result<ExportBundle, BackupError> {
    let mut collections = Vec::with_capacity(EntityKind::ALL.len());
    let mut counts = BTreeMap::new();
    for kind in EntityKind::ALL {
        let records = store.list_all(kind.collection()).await?;
        counts.insert(kind.collection().to_string(), records.len());
        collections.push(CollectionDump {
            name: kind.collection().to_string(),
            records,
        });
    }
    let bundle = ExportBundle {
        format_version: FORMAT_VERSION,
        exported_at: clock.now(),
        collections,
        counts,
    };
    info!(records = bundle.record_count(), "export finished");
    Ok(bundle)
}
