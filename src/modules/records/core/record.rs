// Base record shape shared by every entity.
//
// Purpose
// - Carry identity, timestamps and the soft-delete marker around entity-specific data.
//
// Invariants
// - `id` and `created_at` never change after creation.
// - `updated_at >= created_at`, and it never moves backwards.
// - Archived records stay in storage; only default listings hide them.

use crate::modules::records::core::entities::{EntityPatch, EntityRecord};
use crate::shared::core::primitives::{RecordId, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: RecordId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<Timestamp>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Stored<T> {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Job,
    TimeEntry,
    Invoice,
    InvoiceItem,
    Payment,
    ProductSale,
}

impl EntityKind {
    /// Every collection, in export order: parents before children.
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Client,
        EntityKind::Job,
        EntityKind::TimeEntry,
        EntityKind::Invoice,
        EntityKind::InvoiceItem,
        EntityKind::Payment,
        EntityKind::ProductSale,
    ];

    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Client => "clients",
            EntityKind::Job => "jobs",
            EntityKind::TimeEntry => "time_entries",
            EntityKind::Invoice => "invoices",
            EntityKind::InvoiceItem => "invoice_items",
            EntityKind::Payment => "payments",
            EntityKind::ProductSale => "product_sales",
        }
    }

    pub fn from_collection(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.collection() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// An entity stored through the generic repository.
///
/// The wrapping functions convert between the typed record and the closed
/// [`EntityRecord`] / [`EntityPatch`] unions carried by the retry queue.
pub trait Entity:
    Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    const KIND: EntityKind;

    type Patch: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

    fn apply(&mut self, patch: Self::Patch);

    fn into_record(record: Stored<Self>) -> EntityRecord;
    fn from_record(record: EntityRecord) -> Option<Stored<Self>>;
    fn into_patch(id: RecordId, patch: Self::Patch) -> EntityPatch;
    fn from_patch(patch: EntityPatch) -> Option<(RecordId, Self::Patch)>;
}
