use crate::modules::backup::purge::PURGE_CONFIRMATION;
use crate::modules::billing::core::index::BillingIndex;
use crate::modules::records::core::entities::{Client, Invoice, Payment};
use crate::modules::records::repository::Repository;
use crate::shared::core::primitives::RecordId;
use crate::shared::core::week::WeekBucket;
use crate::shell::cli::{Commands, run};
use crate::shell::config::AppConfig;
use crate::shell::context::AppContext;
use crate::tests::fixtures::entities::{
    ClientBuilder, HOUR, InvoiceBuilder, TimeEntryBuilder, payment,
};
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> AppConfig {
    AppConfig {
        data_dir: dir.path().join("data"),
        ..AppConfig::default()
    }
}

async fn seed(context: &AppContext) -> RecordId {
    let client = Repository::<Client>::new(context.store.clone(), context.clock.clone())
        .create(ClientBuilder::new().name("Acme").build())
        .await
        .unwrap();
    let invoice = Repository::<Invoice>::new(context.store.clone(), context.clock.clone())
        .create(InvoiceBuilder::new().client_id(client.id.as_str()).total(500.0).build())
        .await
        .unwrap();
    Repository::<Payment>::new(context.store.clone(), context.clock.clone())
        .create(payment(invoice.id.as_str(), 123.456))
        .await
        .unwrap();
    let start = WeekBucket::containing(context.clock.now()).starts_at() + 9 * HOUR;
    context
        .time_entries
        .log(TimeEntryBuilder::new().starting_at(start).minutes(90).build())
        .await
        .unwrap();
    client.id
}

#[tokio::test]
async fn exports_purges_and_restores_a_file_backed_store() {
    let dir = TempDir::new().unwrap();
    let bundle_path = dir.path().join("backup.json");
    let context = AppContext::open(config_in(&dir)).await.unwrap();
    context.init().await.unwrap();
    let client_id = seed(&context).await;
    let week = WeekBucket::containing(context.clock.now());
    assert_eq!(context.engine.weekly_totals(week).await.total_minutes, 90);

    let mut out = Vec::new();
    run(
        Commands::Export {
            out: bundle_path.clone(),
        },
        &context,
        &mut out,
    )
    .await
    .unwrap();
    assert!(String::from_utf8(out).unwrap().starts_with("exported 4 records"));

    let report = context.purge(PURGE_CONFIRMATION).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.removed.values().sum::<usize>(), 4);
    assert_eq!(context.export().await.unwrap().record_count(), 0);
    assert_eq!(context.engine.weekly_totals(week).await.total_minutes, 0);

    let mut out = Vec::new();
    run(
        Commands::Import {
            file: bundle_path.clone(),
        },
        &context,
        &mut out,
    )
    .await
    .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "imported 4 of 4 records\n");
    assert_eq!(context.engine.weekly_totals(week).await.total_minutes, 90);
    context.shutdown().await.unwrap();
    drop(context);

    let reopened = AppContext::open(config_in(&dir)).await.unwrap();
    reopened.init().await.unwrap();
    assert_eq!(reopened.engine.weekly_totals(week).await.total_minutes, 90);
    let snapshot = reopened.billing_snapshot().await.unwrap();
    let index = BillingIndex::build(&snapshot);
    assert_eq!(index.client_outstanding(&client_id), 376.54);
    reopened.shutdown().await.unwrap();
}

#[tokio::test]
async fn refuses_a_purge_without_the_phrase() {
    let dir = TempDir::new().unwrap();
    let context = AppContext::open(config_in(&dir)).await.unwrap();
    context.init().await.unwrap();
    seed(&context).await;

    let mut out = Vec::new();
    let result = run(
        Commands::Purge {
            confirm: "yes".into(),
        },
        &context,
        &mut out,
    )
    .await;

    assert!(result.is_err());
    assert_eq!(context.export().await.unwrap().record_count(), 4);
    context.shutdown().await.unwrap();
}
