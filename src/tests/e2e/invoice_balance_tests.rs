use crate::modules::billing::core::computed::compute_invoice;
use crate::modules::billing::core::draft::{BillingWindow, build_invoice_draft};
use crate::modules::billing::core::index::BillingIndex;
use crate::modules::records::core::entities::{
    Invoice, InvoicePatch, InvoiceStatus, Job, Payment, TimeEntry,
};
use crate::modules::records::repository::Repository;
use crate::shared::core::clock::{Clock, ManualClock};
use crate::shared::core::primitives::RecordId;
use crate::shell::config::AppConfig;
use crate::shell::context::AppContext;
use crate::tests::fixtures::entities::{
    DAY, InvoiceBuilder, JobBuilder, MONDAY_W42, TimeEntryBuilder, WEEK, payment,
};
use rstest::rstest;
use std::sync::Arc;

async fn outstanding_of(context: &AppContext, invoice_id: &RecordId) -> (f64, f64) {
    let snapshot = context.billing_snapshot().await.unwrap();
    let index = BillingIndex::build(&snapshot);
    let invoice = snapshot
        .invoices
        .iter()
        .find(|invoice| &invoice.id == invoice_id)
        .unwrap();
    let computed = compute_invoice(invoice, &index);
    (computed.paid_total, computed.outstanding)
}

#[rstest]
#[case(&[123.456], 123.46, 376.54)]
#[case(&[100.0, 150.5], 250.5, 249.5)]
#[case(&[300.0, 300.0], 600.0, 0.0)]
#[tokio::test]
async fn derives_balances_from_payments(
    #[case] amounts: &[f64],
    #[case] paid: f64,
    #[case] outstanding: f64,
) {
    let clock = Arc::new(ManualClock::new(MONDAY_W42));
    let context = AppContext::in_memory(AppConfig::default(), clock.clone());
    let invoice = Repository::<Invoice>::new(context.store.clone(), clock.clone())
        .create(InvoiceBuilder::new().total(500.0).build())
        .await
        .unwrap();
    let payments = Repository::<Payment>::new(context.store.clone(), clock.clone());
    for amount in amounts {
        payments
            .create(payment(invoice.id.as_str(), *amount))
            .await
            .unwrap();
    }

    assert_eq!(outstanding_of(&context, &invoice.id).await, (paid, outstanding));
}

#[rstest]
#[tokio::test]
async fn issues_pays_and_voids_an_invoice_built_from_tracked_time() {
    let clock = Arc::new(ManualClock::new(MONDAY_W42 + WEEK));
    let context = AppContext::in_memory(AppConfig::default(), clock.clone());
    let job = Repository::<Job>::new(context.store.clone(), clock.clone())
        .create(JobBuilder::new().hourly_rate(80.0).build())
        .await
        .unwrap();
    let time_entries = Repository::<TimeEntry>::new(context.store.clone(), clock.clone());
    for day in 0..3 {
        time_entries
            .create(
                TimeEntryBuilder::new()
                    .job_id(job.id.as_str())
                    .starting_at(MONDAY_W42 + day * DAY)
                    .minutes(100)
                    .build(),
            )
            .await
            .unwrap();
    }
    let window = BillingWindow {
        from: MONDAY_W42,
        to: MONDAY_W42 + WEEK,
    };
    let client = RecordId::from("client-1");

    let snapshot = context.billing_snapshot().await.unwrap();
    let draft = build_invoice_draft(&BillingIndex::build(&snapshot), &client, window);
    assert_eq!(draft.lines.len(), 1);
    assert_eq!(draft.lines[0].quantity, 5.0);
    assert_eq!(draft.total, 400.0);

    let issued = context
        .invoices
        .issue(&draft, "INV-0100", clock.now(), None)
        .await
        .unwrap();
    let invoice_id = issued.invoice.id.clone();
    assert_eq!(outstanding_of(&context, &invoice_id).await, (0.0, 400.0));

    let snapshot = context.billing_snapshot().await.unwrap();
    assert!(build_invoice_draft(&BillingIndex::build(&snapshot), &client, window).is_empty());

    Repository::<Payment>::new(context.store.clone(), clock.clone())
        .create(payment(invoice_id.as_str(), 123.456))
        .await
        .unwrap();
    assert_eq!(outstanding_of(&context, &invoice_id).await, (123.46, 276.54));

    let snapshot = context.billing_snapshot().await.unwrap();
    assert_eq!(
        BillingIndex::build(&snapshot).client_outstanding(&client),
        276.54
    );

    Repository::<Invoice>::new(context.store.clone(), clock.clone())
        .update(
            &invoice_id,
            InvoicePatch {
                status: Some(InvoiceStatus::Void),
                ..InvoicePatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outstanding_of(&context, &invoice_id).await, (123.46, 0.0));
    let snapshot = context.billing_snapshot().await.unwrap();
    assert_eq!(BillingIndex::build(&snapshot).client_outstanding(&client), 0.0);
}
