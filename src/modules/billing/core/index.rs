// Lookup tables over a billing snapshot.
//
// Notes
// - Archived invoice items and payments never enter the index.
// - invoices_by_client only holds non-archived invoices.

use crate::modules::billing::core::computed::{InvoiceComputed, compute_invoice};
use crate::modules::billing::snapshot::BillingSnapshot;
use crate::modules::records::core::entities::{Client, Invoice, InvoiceItem, Job, Payment};
use crate::modules::records::core::record::Stored;
use crate::shared::core::money::add_currency;
use crate::shared::core::primitives::RecordId;
use std::collections::{BTreeMap, HashMap};

pub struct BillingIndex<'a> {
    snapshot: &'a BillingSnapshot,
    items_by_invoice: HashMap<&'a RecordId, Vec<&'a Stored<InvoiceItem>>>,
    payments_by_invoice: HashMap<&'a RecordId, Vec<&'a Stored<Payment>>>,
    invoices_by_client: HashMap<&'a RecordId, Vec<&'a Stored<Invoice>>>,
    jobs_by_id: HashMap<&'a RecordId, &'a Stored<Job>>,
    clients_by_id: HashMap<&'a RecordId, &'a Stored<Client>>,
}

impl<'a> BillingIndex<'a> {
    pub fn build(snapshot: &'a BillingSnapshot) -> Self {
        let mut items_by_invoice: HashMap<_, Vec<_>> = HashMap::new();
        for item in snapshot.invoice_items.iter().filter(|i| !i.is_archived()) {
            items_by_invoice
                .entry(&item.data.invoice_id)
                .or_default()
                .push(item);
        }

        let mut payments_by_invoice: HashMap<_, Vec<_>> = HashMap::new();
        for payment in snapshot.payments.iter().filter(|p| !p.is_archived()) {
            payments_by_invoice
                .entry(&payment.data.invoice_id)
                .or_default()
                .push(payment);
        }

        let mut invoices_by_client: HashMap<_, Vec<_>> = HashMap::new();
        for invoice in snapshot.invoices.iter().filter(|i| !i.is_archived()) {
            invoices_by_client
                .entry(&invoice.data.client_id)
                .or_default()
                .push(invoice);
        }

        Self {
            snapshot,
            items_by_invoice,
            payments_by_invoice,
            invoices_by_client,
            jobs_by_id: snapshot.jobs.iter().map(|job| (&job.id, job)).collect(),
            clients_by_id: snapshot
                .clients
                .iter()
                .map(|client| (&client.id, client))
                .collect(),
        }
    }

    pub fn snapshot(&self) -> &'a BillingSnapshot {
        self.snapshot
    }

    pub fn items_for(&self, invoice_id: &RecordId) -> &[&'a Stored<InvoiceItem>] {
        self.items_by_invoice
            .get(invoice_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn payments_for(&self, invoice_id: &RecordId) -> &[&'a Stored<Payment>] {
        self.payments_by_invoice
            .get(invoice_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn invoices_for_client(&self, client_id: &RecordId) -> &[&'a Stored<Invoice>] {
        self.invoices_by_client
            .get(client_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn job(&self, job_id: &RecordId) -> Option<&'a Stored<Job>> {
        self.jobs_by_id.get(job_id).copied()
    }

    pub fn client(&self, client_id: &RecordId) -> Option<&'a Stored<Client>> {
        self.clients_by_id.get(client_id).copied()
    }

    /// Every non-archived invoice with its resolved items, payments and balances.
    pub fn computed_invoices(&self) -> Vec<InvoiceComputed> {
        self.snapshot
            .invoices
            .iter()
            .filter(|invoice| !invoice.is_archived())
            .map(|invoice| compute_invoice(invoice, self))
            .collect()
    }

    pub fn client_outstanding(&self, client_id: &RecordId) -> f64 {
        self.invoices_for_client(client_id)
            .iter()
            .map(|invoice| compute_invoice(invoice, self).outstanding)
            .fold(0.0, add_currency)
    }

    /// Outstanding balance per client, clients without invoices omitted.
    pub fn outstanding_by_client(&self) -> BTreeMap<RecordId, f64> {
        self.invoices_by_client
            .keys()
            .map(|client_id| ((*client_id).clone(), self.client_outstanding(client_id)))
            .collect()
    }
}
