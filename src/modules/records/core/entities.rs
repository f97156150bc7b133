// Entity schemas, only as wide as aggregation, billing and the retry queue need.
//
// Structure
// - One data struct and one patch struct per entity. Patches set fields, they never clear them.
// - EntityRecord and EntityPatch are the closed unions the retry queue persists.

use crate::modules::records::core::record::{Entity, EntityKind, Stored};
use crate::shared::core::primitives::{RecordId, Timestamp, minutes_between};
use crate::shared::core::week::WeekBucket;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ClientPatch {
    fn apply_to(self, client: &mut Client) {
        if let Some(name) = self.name {
            client.name = name;
        }
        if self.email.is_some() {
            client.email = self.email;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub client_id: RecordId,
    pub name: String,
    pub hourly_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<f64>,
}

impl JobPatch {
    fn apply_to(self, job: &mut Job) {
        if let Some(client_id) = self.client_id {
            job.client_id = client_id;
        }
        if let Some(name) = self.name {
            job.name = name;
        }
        if let Some(rate) = self.hourly_rate {
            job.hourly_rate = rate;
        }
    }
}

/// A logged block of work. Also called a time log by billing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<RecordId>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    #[serde(default)]
    pub note: String,
    #[serde(default = "default_billable")]
    pub billable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

fn default_billable() -> bool {
    true
}

impl TimeEntry {
    pub fn duration_minutes(&self) -> u64 {
        minutes_between(self.start_time, self.end_time)
    }

    /// Entries are bucketed by their start, never their end.
    pub fn week(&self) -> WeekBucket {
        WeekBucket::containing(self.start_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeEntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl TimeEntryPatch {
    fn apply_to(self, entry: &mut TimeEntry) {
        if self.job_id.is_some() {
            entry.job_id = self.job_id;
        }
        if let Some(start) = self.start_time {
            entry.start_time = start;
        }
        if let Some(end) = self.end_time {
            entry.end_time = end;
        }
        if let Some(note) = self.note {
            entry.note = note;
        }
        if let Some(billable) = self.billable {
            entry.billable = billable;
        }
        if self.invoice_id.is_some() {
            entry.invoice_id = self.invoice_id;
        }
        if self.approved.is_some() {
            entry.approved = self.approved;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Void,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub client_id: RecordId,
    pub number: String,
    pub issued_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<Timestamp>,
    pub total: f64,
    #[serde(default)]
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoicePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InvoiceStatus>,
}

impl InvoicePatch {
    fn apply_to(self, invoice: &mut Invoice) {
        if let Some(number) = self.number {
            invoice.number = number;
        }
        if self.due_at.is_some() {
            invoice.due_at = self.due_at;
        }
        if let Some(total) = self.total {
            invoice.total = total;
        }
        if let Some(status) = self.status {
            invoice.status = status;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub invoice_id: RecordId,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_entry_ids: Vec<RecordId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl InvoiceItemPatch {
    fn apply_to(self, item: &mut InvoiceItem) {
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(unit_price) = self.unit_price {
            item.unit_price = unit_price;
        }
        if let Some(amount) = self.amount {
            item.amount = amount;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub invoice_id: RecordId,
    pub amount: f64,
    pub paid_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl PaymentPatch {
    fn apply_to(self, payment: &mut Payment) {
        if let Some(amount) = self.amount {
            payment.amount = amount;
        }
        if let Some(paid_at) = self.paid_at {
            payment.paid_at = paid_at;
        }
        if self.method.is_some() {
            payment.method = self.method;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSale {
    pub client_id: RecordId,
    pub description: String,
    pub amount: f64,
    pub sold_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<RecordId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSalePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<RecordId>,
}

impl ProductSalePatch {
    fn apply_to(self, sale: &mut ProductSale) {
        if let Some(description) = self.description {
            sale.description = description;
        }
        if let Some(amount) = self.amount {
            sale.amount = amount;
        }
        if let Some(sold_at) = self.sold_at {
            sale.sold_at = sold_at;
        }
        if self.invoice_id.is_some() {
            sale.invoice_id = self.invoice_id;
        }
    }
}

/// A full record of any entity, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "record", rename_all = "snake_case")]
pub enum EntityRecord {
    Client(Stored<Client>),
    Job(Stored<Job>),
    TimeEntry(Stored<TimeEntry>),
    Invoice(Stored<Invoice>),
    InvoiceItem(Stored<InvoiceItem>),
    Payment(Stored<Payment>),
    ProductSale(Stored<ProductSale>),
}

/// A patch for one record of any entity, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EntityPatch {
    Client { id: RecordId, patch: ClientPatch },
    Job { id: RecordId, patch: JobPatch },
    TimeEntry { id: RecordId, patch: TimeEntryPatch },
    Invoice { id: RecordId, patch: InvoicePatch },
    InvoiceItem { id: RecordId, patch: InvoiceItemPatch },
    Payment { id: RecordId, patch: PaymentPatch },
    ProductSale { id: RecordId, patch: ProductSalePatch },
}

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Client(_) => EntityKind::Client,
            EntityRecord::Job(_) => EntityKind::Job,
            EntityRecord::TimeEntry(_) => EntityKind::TimeEntry,
            EntityRecord::Invoice(_) => EntityKind::Invoice,
            EntityRecord::InvoiceItem(_) => EntityKind::InvoiceItem,
            EntityRecord::Payment(_) => EntityKind::Payment,
            EntityRecord::ProductSale(_) => EntityKind::ProductSale,
        }
    }

    pub fn id(&self) -> &RecordId {
        match self {
            EntityRecord::Client(r) => &r.id,
            EntityRecord::Job(r) => &r.id,
            EntityRecord::TimeEntry(r) => &r.id,
            EntityRecord::Invoice(r) => &r.id,
            EntityRecord::InvoiceItem(r) => &r.id,
            EntityRecord::Payment(r) => &r.id,
            EntityRecord::ProductSale(r) => &r.id,
        }
    }
}

impl EntityPatch {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPatch::Client { .. } => EntityKind::Client,
            EntityPatch::Job { .. } => EntityKind::Job,
            EntityPatch::TimeEntry { .. } => EntityKind::TimeEntry,
            EntityPatch::Invoice { .. } => EntityKind::Invoice,
            EntityPatch::InvoiceItem { .. } => EntityKind::InvoiceItem,
            EntityPatch::Payment { .. } => EntityKind::Payment,
            EntityPatch::ProductSale { .. } => EntityKind::ProductSale,
        }
    }

    pub fn id(&self) -> &RecordId {
        match self {
            EntityPatch::Client { id, .. }
            | EntityPatch::Job { id, .. }
            | EntityPatch::TimeEntry { id, .. }
            | EntityPatch::Invoice { id, .. }
            | EntityPatch::InvoiceItem { id, .. }
            | EntityPatch::Payment { id, .. }
            | EntityPatch::ProductSale { id, .. } => id,
        }
    }
}

macro_rules! impl_entity {
    ($entity:ident, $patch:ident) => {
        impl Entity for $entity {
            const KIND: EntityKind = EntityKind::$entity;

            type Patch = $patch;

            fn apply(&mut self, patch: $patch) {
                patch.apply_to(self);
            }

            fn into_record(record: Stored<Self>) -> EntityRecord {
                EntityRecord::$entity(record)
            }

            fn from_record(record: EntityRecord) -> Option<Stored<Self>> {
                match record {
                    EntityRecord::$entity(record) => Some(record),
                    _ => None,
                }
            }

            fn into_patch(id: RecordId, patch: $patch) -> EntityPatch {
                EntityPatch::$entity { id, patch }
            }

            fn from_patch(patch: EntityPatch) -> Option<(RecordId, $patch)> {
                match patch {
                    EntityPatch::$entity { id, patch } => Some((id, patch)),
                    _ => None,
                }
            }
        }
    };
}

impl_entity!(Client, ClientPatch);
impl_entity!(Job, JobPatch);
impl_entity!(TimeEntry, TimeEntryPatch);
impl_entity!(Invoice, InvoicePatch);
impl_entity!(InvoiceItem, InvoiceItemPatch);
impl_entity!(Payment, PaymentPatch);
impl_entity!(ProductSale, ProductSalePatch);
