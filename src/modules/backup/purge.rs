use crate::modules::records::core::record::EntityKind;
use crate::shared::infrastructure::key_value::KeyValueStore;
use crate::shared::infrastructure::store_adapter::{StoreAdapter, record_key};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, warn};

pub const PURGE_CONFIRMATION: &str = "DELETE ALL DATA";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PurgeError {
    #[error("purge confirmation phrase did not match")]
    ConfirmationMismatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub removed: BTreeMap<String, usize>,
    pub key_value_cleared: bool,
    pub errors: Vec<String>,
}

impl PurgeReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.key_value_cleared
    }
}

/// Physically removes every record and all key-value state.
/// Failures are collected in the report; the purge continues past them.
pub async fn purge_all(
    store: &dyn StoreAdapter,
    key_value: &dyn KeyValueStore,
    confirmation: &str,
) -> Result<PurgeReport, PurgeError> {
    if confirmation != PURGE_CONFIRMATION {
        return Err(PurgeError::ConfirmationMismatch);
    }
    warn!("purging all local data");

    let mut report = PurgeReport::default();
    for kind in EntityKind::ALL {
        let collection = kind.collection();
        let records = match store.list_all(collection).await {
            Ok(records) => records,
            Err(e) => {
                report.errors.push(format!("{collection}: {e}"));
                continue;
            }
        };
        let mut removed = 0;
        for record in records {
            let deleted = match record_key(collection, &record) {
                Ok(id) => store.delete(collection, &id).await,
                Err(e) => Err(e),
            };
            match deleted {
                Ok(()) => removed += 1,
                Err(e) => report.errors.push(format!("{collection}: {e}")),
            }
        }
        report.removed.insert(collection.to_string(), removed);
    }

    match key_value.clear().await {
        Ok(()) => report.key_value_cleared = true,
        Err(e) => report.errors.push(format!("key-value: {e}")),
    }
    if !report.errors.is_empty() {
        error!(errors = report.errors.len(), "purge finished with errors");
    }
    Ok(report)
}
