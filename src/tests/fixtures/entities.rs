// Shared builders for entity fixtures.
//
// Defaults describe one ordinary working session: 90 minutes on job-1,
// starting at 09:00 UTC on Monday 2026-10-12 (week 2026-W42).

use crate::modules::records::core::entities::{
    Client, Invoice, InvoiceItem, InvoiceStatus, Job, Payment, ProductSale, TimeEntry,
};
use crate::modules::records::core::record::Stored;
use crate::shared::core::primitives::{MILLIS_PER_MINUTE, RecordId, Timestamp};

pub const MONDAY_W42: Timestamp = 1_791_763_200_000;
pub const HOUR: Timestamp = 60 * MILLIS_PER_MINUTE;
pub const DAY: Timestamp = 24 * HOUR;
pub const WEEK: Timestamp = 7 * DAY;

/// Wraps data in a record with a fixed id, as if it had been created at `at`.
pub fn stored<T>(id: &str, at: Timestamp, data: T) -> Stored<T> {
    Stored {
        id: RecordId::from(id),
        created_at: at,
        updated_at: at,
        archived_at: None,
        data,
    }
}

pub struct ClientBuilder {
    inner: Client,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            inner: Client {
                name: "Acme Studio".to_string(),
                email: Some("billing@acme.test".to_string()),
            },
        }
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.inner.name = v.into();
        self
    }

    pub fn build(self) -> Client {
        self.inner
    }
}

pub struct JobBuilder {
    inner: Job,
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl JobBuilder {
    pub fn new() -> Self {
        Self {
            inner: Job {
                client_id: RecordId::from("client-1"),
                name: "Website redesign".to_string(),
                hourly_rate: 80.0,
            },
        }
    }

    pub fn client_id(mut self, v: &str) -> Self {
        self.inner.client_id = RecordId::from(v);
        self
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.inner.name = v.into();
        self
    }

    pub fn hourly_rate(mut self, v: f64) -> Self {
        self.inner.hourly_rate = v;
        self
    }

    pub fn build(self) -> Job {
        self.inner
    }
}

pub struct TimeEntryBuilder {
    inner: TimeEntry,
}

impl Default for TimeEntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl TimeEntryBuilder {
    pub fn new() -> Self {
        let start = MONDAY_W42 + 9 * HOUR;
        Self {
            inner: TimeEntry {
                job_id: Some(RecordId::from("job-1")),
                start_time: start,
                end_time: start + 90 * MILLIS_PER_MINUTE,
                note: "Wireframes".to_string(),
                billable: true,
                invoice_id: None,
                approved: None,
            },
        }
    }

    pub fn job_id(mut self, v: &str) -> Self {
        self.inner.job_id = Some(RecordId::from(v));
        self
    }

    pub fn without_job(mut self) -> Self {
        self.inner.job_id = None;
        self
    }

    /// Moves the entry, keeping its duration.
    pub fn starting_at(mut self, start: Timestamp) -> Self {
        let duration = self.inner.end_time - self.inner.start_time;
        self.inner.start_time = start;
        self.inner.end_time = start + duration;
        self
    }

    pub fn minutes(mut self, minutes: i64) -> Self {
        self.inner.end_time = self.inner.start_time + minutes * MILLIS_PER_MINUTE;
        self
    }

    pub fn billable(mut self, v: bool) -> Self {
        self.inner.billable = v;
        self
    }

    pub fn approved(mut self, v: bool) -> Self {
        self.inner.approved = Some(v);
        self
    }

    pub fn invoice_id(mut self, v: &str) -> Self {
        self.inner.invoice_id = Some(RecordId::from(v));
        self
    }

    pub fn build(self) -> TimeEntry {
        self.inner
    }
}

pub struct InvoiceBuilder {
    inner: Invoice,
}

impl Default for InvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl InvoiceBuilder {
    pub fn new() -> Self {
        Self {
            inner: Invoice {
                client_id: RecordId::from("client-1"),
                number: "INV-0001".to_string(),
                issued_at: MONDAY_W42,
                due_at: Some(MONDAY_W42 + 30 * DAY),
                total: 500.0,
                status: InvoiceStatus::Sent,
            },
        }
    }

    pub fn client_id(mut self, v: &str) -> Self {
        self.inner.client_id = RecordId::from(v);
        self
    }

    pub fn number(mut self, v: impl Into<String>) -> Self {
        self.inner.number = v.into();
        self
    }

    pub fn total(mut self, v: f64) -> Self {
        self.inner.total = v;
        self
    }

    pub fn build(self) -> Invoice {
        self.inner
    }
}

pub fn invoice_item(invoice_id: &str, amount: f64) -> InvoiceItem {
    InvoiceItem {
        invoice_id: RecordId::from(invoice_id),
        description: "Design work".to_string(),
        quantity: 1.0,
        unit_price: amount,
        amount,
        time_entry_ids: Vec::new(),
    }
}

pub fn payment(invoice_id: &str, amount: f64) -> Payment {
    Payment {
        invoice_id: RecordId::from(invoice_id),
        amount,
        paid_at: MONDAY_W42 + DAY,
        method: Some("bank_transfer".to_string()),
    }
}

pub fn product_sale(client_id: &str, amount: f64, sold_at: Timestamp) -> ProductSale {
    ProductSale {
        client_id: RecordId::from(client_id),
        description: "Icon pack".to_string(),
        amount,
        sold_at,
        invoice_id: None,
    }
}
