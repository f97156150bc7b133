// Invoice drafts, built from uninvoiced billable work and product sales.
//
// Rules
// - A time entry is billable when it is active, billable, not yet invoiced, not rejected
//   (approved == Some(false)) and logged against one of the client's jobs.
// - The window is half-open: from <= start < to.
// - One line per job (hours x job rate), one line per uninvoiced product sale.

use crate::modules::billing::core::index::BillingIndex;
use crate::modules::billing::snapshot::BillingSnapshot;
use crate::modules::records::core::entities::TimeEntry;
use crate::modules::records::core::record::Stored;
use crate::shared::core::money::{add_currency, round_currency};
use crate::shared::core::primitives::{RecordId, Timestamp};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingWindow {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl BillingWindow {
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.from <= timestamp && timestamp < self.to
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineSource {
    Time {
        job_id: RecordId,
        time_entry_ids: Vec<RecordId>,
    },
    ProductSale {
        sale_id: RecordId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
    pub source: LineSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub client_id: RecordId,
    pub window: BillingWindow,
    pub lines: Vec<DraftLine>,
    pub total: f64,
}

impl InvoiceDraft {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

pub fn billable_time_entries<'a>(
    snapshot: &'a BillingSnapshot,
    client_id: &RecordId,
    window: BillingWindow,
) -> Vec<&'a Stored<TimeEntry>> {
    let client_jobs: HashSet<&RecordId> = snapshot
        .jobs
        .iter()
        .filter(|job| &job.data.client_id == client_id)
        .map(|job| &job.id)
        .collect();
    snapshot
        .time_entries
        .iter()
        .filter(|entry| {
            let data = &entry.data;
            !entry.is_archived()
                && data.billable
                && data.invoice_id.is_none()
                && data.approved != Some(false)
                && data.job_id.as_ref().is_some_and(|job| client_jobs.contains(job))
                && window.contains(data.start_time)
        })
        .collect()
}

pub fn build_invoice_draft(
    index: &BillingIndex<'_>,
    client_id: &RecordId,
    window: BillingWindow,
) -> InvoiceDraft {
    let snapshot = index.snapshot();
    let mut by_job: BTreeMap<&RecordId, Vec<&Stored<TimeEntry>>> = BTreeMap::new();
    for entry in billable_time_entries(snapshot, client_id, window) {
        if let Some(job_id) = &entry.data.job_id {
            by_job.entry(job_id).or_default().push(entry);
        }
    }

    let mut lines = Vec::new();
    for (job_id, entries) in by_job {
        let Some(job) = index.job(job_id) else {
            continue;
        };
        let minutes: u64 = entries.iter().map(|e| e.data.duration_minutes()).sum();
        let hours = minutes as f64 / 60.0;
        lines.push(DraftLine {
            description: job.data.name.clone(),
            quantity: round_currency(hours),
            unit_price: job.data.hourly_rate,
            amount: round_currency(hours * job.data.hourly_rate),
            source: LineSource::Time {
                job_id: job_id.clone(),
                time_entry_ids: entries.iter().map(|e| e.id.clone()).collect(),
            },
        });
    }

    for sale in snapshot.product_sales.iter().filter(|sale| {
        !sale.is_archived()
            && &sale.data.client_id == client_id
            && sale.data.invoice_id.is_none()
            && window.contains(sale.data.sold_at)
    }) {
        lines.push(DraftLine {
            description: sale.data.description.clone(),
            quantity: 1.0,
            unit_price: sale.data.amount,
            amount: round_currency(sale.data.amount),
            source: LineSource::ProductSale {
                sale_id: sale.id.clone(),
            },
        });
    }

    let total = lines.iter().map(|line| line.amount).fold(0.0, add_currency);
    InvoiceDraft {
        client_id: client_id.clone(),
        window,
        lines,
        total,
    }
}
