use crate::modules::records::core::entities::{
    Client, Invoice, InvoiceItem, Job, Payment, ProductSale, TimeEntry,
};
use crate::modules::records::core::record::Stored;
use crate::modules::records::repository::{Repository, RepositoryError};
use crate::shared::core::clock::Clock;
use crate::shared::infrastructure::store_adapter::StoreAdapter;
use std::sync::Arc;

/// Every record billing derives from, archived ones included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingSnapshot {
    pub clients: Vec<Stored<Client>>,
    pub jobs: Vec<Stored<Job>>,
    pub invoices: Vec<Stored<Invoice>>,
    pub invoice_items: Vec<Stored<InvoiceItem>>,
    pub payments: Vec<Stored<Payment>>,
    pub time_entries: Vec<Stored<TimeEntry>>,
    pub product_sales: Vec<Stored<ProductSale>>,
}

pub async fn load_billing_snapshot(
    store: Arc<dyn StoreAdapter>,
    clock: Arc<dyn Clock>,
) -> Result<BillingSnapshot, RepositoryError> {
    Ok(BillingSnapshot {
        clients: Repository::new(store.clone(), clock.clone()).list().await?,
        jobs: Repository::new(store.clone(), clock.clone()).list().await?,
        invoices: Repository::new(store.clone(), clock.clone()).list().await?,
        invoice_items: Repository::new(store.clone(), clock.clone()).list().await?,
        payments: Repository::new(store.clone(), clock.clone()).list().await?,
        time_entries: Repository::new(store.clone(), clock.clone()).list().await?,
        product_sales: Repository::new(store, clock).list().await?,
    })
}
