use crate::modules::billing::core::index::BillingIndex;
use crate::modules::records::core::entities::{Invoice, InvoiceItem, InvoiceStatus, Payment};
use crate::modules::records::core::record::Stored;
use crate::shared::core::money::{add_currency, round_currency};

/// An invoice with its children resolved and its balances derived. Never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceComputed {
    pub invoice: Stored<Invoice>,
    pub items: Vec<Stored<InvoiceItem>>,
    pub payments: Vec<Stored<Payment>>,
    pub paid_total: f64,
    pub outstanding: f64,
}

/// Void invoices owe nothing. Overpayment never makes the balance negative.
pub fn compute_invoice(invoice: &Stored<Invoice>, index: &BillingIndex<'_>) -> InvoiceComputed {
    let items: Vec<_> = index.items_for(&invoice.id).iter().map(|i| (*i).clone()).collect();
    let payments: Vec<_> = index
        .payments_for(&invoice.id)
        .iter()
        .map(|p| (*p).clone())
        .collect();
    let paid_total = payments
        .iter()
        .map(|payment| payment.data.amount)
        .fold(0.0, add_currency);
    let outstanding = if invoice.data.status == InvoiceStatus::Void {
        0.0
    } else {
        round_currency((round_currency(invoice.data.total) - paid_total).max(0.0))
    };
    InvoiceComputed {
        invoice: invoice.clone(),
        items,
        payments,
        paid_total,
        outstanding,
    }
}
