// Restore from an export bundle, collection by collection.
//
// Notes
// - Every record is checked against its entity schema before it is written.
// - A bad record or a failed write is reported and skipped. The import goes on.

use crate::modules::backup::export::{BackupError, ExportBundle, FORMAT_VERSION};
use crate::modules::records::core::entities::{
    Client, Invoice, InvoiceItem, Job, Payment, ProductSale, TimeEntry,
};
use crate::modules::records::core::record::{EntityKind, Stored};
use crate::shared::infrastructure::store_adapter::StoreAdapter;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportProgress {
    pub collection: String,
    pub done: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportIssue {
    pub collection: String,
    pub id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub total: usize,
    pub errors: Vec<ImportIssue>,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.imported == self.total
    }
}

pub async fn import_all(
    store: &dyn StoreAdapter,
    bundle: &ExportBundle,
    mut on_progress: impl FnMut(ImportProgress),
) -> Result<ImportReport, BackupError> {
    if bundle.format_version != FORMAT_VERSION {
        return Err(BackupError::UnsupportedVersion(bundle.format_version));
    }

    let mut report = ImportReport {
        total: bundle.record_count(),
        ..ImportReport::default()
    };
    let collections = bundle.collections.len();

    for (index, dump) in bundle.collections.iter().enumerate() {
        let Some(kind) = EntityKind::from_collection(&dump.name) else {
            warn!(collection = %dump.name, "skipping unknown collection");
            report.errors.push(ImportIssue {
                collection: dump.name.clone(),
                id: None,
                message: format!("unknown collection with {} records", dump.records.len()),
            });
            continue;
        };
        for record in &dump.records {
            let id = record.get("id").and_then(Json::as_str).map(str::to_string);
            let written = match validate(kind, record) {
                Ok(()) => store
                    .put(kind.collection(), record.clone())
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e),
            };
            match written {
                Ok(()) => report.imported += 1,
                Err(message) => report.errors.push(ImportIssue {
                    collection: dump.name.clone(),
                    id,
                    message,
                }),
            }
        }
        on_progress(ImportProgress {
            collection: dump.name.clone(),
            done: index + 1,
            total: collections,
        });
    }

    info!(
        imported = report.imported,
        total = report.total,
        errors = report.errors.len(),
        "import finished"
    );
    Ok(report)
}

fn validate(kind: EntityKind, record: &Json) -> Result<(), String> {
    fn check<T: DeserializeOwned>(record: &Json) -> Result<(), String> {
        Stored::<T>::deserialize(record)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
    match kind {
        EntityKind::Client => check::<Client>(record),
        EntityKind::Job => check::<Job>(record),
        EntityKind::TimeEntry => check::<TimeEntry>(record),
        EntityKind::Invoice => check::<Invoice>(record),
        EntityKind::InvoiceItem => check::<InvoiceItem>(record),
        EntityKind::Payment => check::<Payment>(record),
        EntityKind::ProductSale => check::<ProductSale>(record),
    }
}
