// Invoice issuing.
//
// Flow
// - Write the invoice, then one item per draft line.
// - Mark the billed time entries and product sales with the invoice id.
// - If any write fails, undo the ones that landed: unmark billed work, then physically
//   delete the items and the invoice. Undo failures are logged and the original error returned.

use crate::modules::billing::core::draft::{InvoiceDraft, LineSource};
use crate::modules::records::core::entities::{
    Invoice, InvoiceItem, InvoiceStatus, ProductSale, ProductSalePatch, TimeEntry, TimeEntryPatch,
};
use crate::modules::records::core::record::Stored;
use crate::modules::records::repository::{Repository, RepositoryError};
use crate::shared::core::clock::Clock;
use crate::shared::core::primitives::{RecordId, Timestamp};
use crate::shared::infrastructure::store_adapter::StoreAdapter;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("invoice draft has no lines")]
    EmptyInvoice,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssuedInvoice {
    pub invoice: Stored<Invoice>,
    pub items: Vec<Stored<InvoiceItem>>,
}

/// Writes that landed so far, in the order they were made.
#[derive(Default)]
struct Written {
    invoice: Option<RecordId>,
    items: Vec<RecordId>,
    time_entries: Vec<Stored<TimeEntry>>,
    product_sales: Vec<Stored<ProductSale>>,
}

pub struct InvoiceIssuer {
    invoices: Repository<Invoice>,
    items: Repository<InvoiceItem>,
    time_entries: Repository<TimeEntry>,
    product_sales: Repository<ProductSale>,
}

impl InvoiceIssuer {
    pub fn new(store: Arc<dyn StoreAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            invoices: Repository::new(store.clone(), clock.clone()),
            items: Repository::new(store.clone(), clock.clone()),
            time_entries: Repository::new(store.clone(), clock.clone()),
            product_sales: Repository::new(store, clock),
        }
    }

    /// Writes the invoice and its items, then marks the billed entries and sales as invoiced.
    /// Either every write lands or, as far as the store allows, none does.
    pub async fn issue(
        &self,
        draft: &InvoiceDraft,
        number: impl Into<String>,
        issued_at: Timestamp,
        due_at: Option<Timestamp>,
    ) -> Result<IssuedInvoice, BillingError> {
        if draft.is_empty() {
            return Err(BillingError::EmptyInvoice);
        }

        let mut written = Written::default();
        match self
            .write(draft, number.into(), issued_at, due_at, &mut written)
            .await
        {
            Ok(issued) => {
                info!(
                    invoice_id = %issued.invoice.id,
                    number = %issued.invoice.data.number,
                    lines = issued.items.len(),
                    total = issued.invoice.data.total,
                    "invoice issued"
                );
                Ok(issued)
            }
            Err(e) => {
                warn!(error = %e, "invoice issue failed, rolling back");
                self.roll_back(written).await;
                Err(e.into())
            }
        }
    }

    async fn write(
        &self,
        draft: &InvoiceDraft,
        number: String,
        issued_at: Timestamp,
        due_at: Option<Timestamp>,
        written: &mut Written,
    ) -> Result<IssuedInvoice, RepositoryError> {
        let invoice = self
            .invoices
            .create(Invoice {
                client_id: draft.client_id.clone(),
                number,
                issued_at,
                due_at,
                total: draft.total,
                status: InvoiceStatus::Sent,
            })
            .await?;
        written.invoice = Some(invoice.id.clone());

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let time_entry_ids = match &line.source {
                LineSource::Time { time_entry_ids, .. } => time_entry_ids.clone(),
                LineSource::ProductSale { .. } => Vec::new(),
            };
            let item = self
                .items
                .create(InvoiceItem {
                    invoice_id: invoice.id.clone(),
                    description: line.description.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    amount: line.amount,
                    time_entry_ids,
                })
                .await?;
            written.items.push(item.id.clone());
            items.push(item);
        }

        for line in &draft.lines {
            match &line.source {
                LineSource::Time { time_entry_ids, .. } => {
                    for id in time_entry_ids {
                        let marked = self
                            .time_entries
                            .update(
                                id,
                                TimeEntryPatch {
                                    invoice_id: Some(invoice.id.clone()),
                                    ..TimeEntryPatch::default()
                                },
                            )
                            .await?;
                        written.time_entries.push(marked);
                    }
                }
                LineSource::ProductSale { sale_id } => {
                    let marked = self
                        .product_sales
                        .update(
                            sale_id,
                            ProductSalePatch {
                                invoice_id: Some(invoice.id.clone()),
                                ..ProductSalePatch::default()
                            },
                        )
                        .await?;
                    written.product_sales.push(marked);
                }
            }
        }

        Ok(IssuedInvoice { invoice, items })
    }

    async fn roll_back(&self, written: Written) {
        for mut entry in written.time_entries {
            entry.data.invoice_id = None;
            if let Err(e) = self.time_entries.put(&entry).await {
                error!(error = %e, time_entry_id = %entry.id, "could not unmark billed time entry");
            }
        }
        for mut sale in written.product_sales {
            sale.data.invoice_id = None;
            if let Err(e) = self.product_sales.put(&sale).await {
                error!(error = %e, sale_id = %sale.id, "could not unmark billed product sale");
            }
        }
        for id in written.items.iter().rev() {
            if let Err(e) = self.items.remove(id).await {
                error!(error = %e, item_id = %id, "could not delete invoice item");
            }
        }
        if let Some(id) = written.invoice {
            if let Err(e) = self.invoices.remove(&id).await {
                error!(error = %e, invoice_id = %id, "could not delete invoice");
            }
        }
    }
}
