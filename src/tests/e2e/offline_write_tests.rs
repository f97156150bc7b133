use crate::modules::records::core::entities::{TimeEntry, TimeEntryPatch};
use crate::modules::records::repository::Repository;
use crate::modules::sync_queue::core::operation::OperationKind;
use crate::modules::sync_queue::queue::PENDING_KEY;
use crate::modules::time_entries::use_cases::track_time::handler::WriteOutcome;
use crate::shared::core::clock::ManualClock;
use crate::shared::core::primitives::RecordId;
use crate::shared::core::week::WeekBucket;
use crate::shared::infrastructure::key_value::KeyValueStore;
use crate::shared::infrastructure::key_value::in_memory::InMemoryKeyValue;
use crate::shared::infrastructure::store_adapter::in_memory::InMemoryStore;
use crate::shell::cli::{Commands, run};
use crate::shell::config::AppConfig;
use crate::shell::context::AppContext;
use crate::tests::fixtures::entities::{DAY, MONDAY_W42, TimeEntryBuilder};
use rstest::{fixture, rstest};
use std::sync::Arc;
use std::time::Duration;

type BeforeEachReturn = (Arc<InMemoryStore>, Arc<InMemoryKeyValue>, Arc<ManualClock>, AppContext);

#[fixture]
fn before_each() -> BeforeEachReturn {
    let store = Arc::new(InMemoryStore::new());
    let key_value = Arc::new(InMemoryKeyValue::new());
    let clock = Arc::new(ManualClock::new(MONDAY_W42 + 2 * DAY));
    let context = AppContext::new(
        AppConfig::default(),
        store.clone(),
        key_value.clone(),
        clock.clone(),
    );
    (store, key_value, clock, context)
}

#[rstest]
#[tokio::test]
async fn replays_an_offline_create_update_delete_in_order(before_each: BeforeEachReturn) {
    let (store, key_value, clock, context) = before_each;
    context.init().await.unwrap();
    store.set_offline(true);

    let created = context
        .time_entries
        .log(TimeEntryBuilder::new().build())
        .await
        .unwrap();
    let WriteOutcome::Queued(op) = created else {
        panic!("offline log should be queued");
    };
    let id = op.record_id().clone();
    let edited = context
        .time_entries
        .edit(
            &id,
            TimeEntryPatch {
                note: Some("Edited offline".into()),
                ..TimeEntryPatch::default()
            },
        )
        .await
        .unwrap();
    let archived = context.time_entries.archive(&id).await.unwrap();
    assert!(edited.is_queued() && archived.is_queued());

    let pending = context.queue.pending().await;
    let kinds: Vec<_> = pending.iter().map(|op| op.operation_kind).collect();
    assert_eq!(
        kinds,
        vec![OperationKind::Create, OperationKind::Update, OperationKind::Delete]
    );
    assert!(key_value.get(PENDING_KEY).await.unwrap().is_some());
    assert_eq!(*context.queue.subscribe_depth().borrow(), 3);

    store.set_offline(false);
    let report = context.queue.flush().await;

    assert_eq!(report.succeeded, 3);
    assert_eq!(context.queue.depth().await, 0);
    let stored = Repository::<TimeEntry>::new(store.clone(), clock)
        .get_by_id(&id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.data.note, "Edited offline");
    assert!(stored.is_archived());
    context.shutdown().await.unwrap();
}

#[rstest]
#[tokio::test]
async fn reconciles_statistics_after_a_replayed_write(before_each: BeforeEachReturn) {
    let (store, _, _, context) = before_each;
    context.init().await.unwrap();
    let mut published = context.engine.subscribe();

    store.fail_next_writes(1);
    let outcome = context
        .time_entries
        .log(TimeEntryBuilder::new().minutes(90).build())
        .await
        .unwrap();
    assert!(outcome.is_queued());
    assert_eq!(
        context
            .engine
            .weekly_totals(WeekBucket::containing(MONDAY_W42))
            .await
            .total_minutes,
        0
    );

    assert_eq!(context.queue.flush().await.succeeded, 1);

    let reconciled = tokio::time::timeout(
        Duration::from_secs(5),
        published.wait_for(|totals| totals.is_some_and(|t| t.total_minutes == 90)),
    )
    .await;
    assert!(reconciled.is_ok_and(|seen| seen.is_ok()));
    context.shutdown().await.unwrap();
}

#[rstest]
#[tokio::test]
async fn keeps_an_exhausted_write_visible_across_restarts(before_each: BeforeEachReturn) {
    let (store, key_value, clock, context) = before_each;
    context.init().await.unwrap();
    store.set_offline(true);
    context
        .time_entries
        .log(TimeEntryBuilder::new().build())
        .await
        .unwrap();

    let max = context.queue.policy().max_retry_attempts;
    for _ in 0..max {
        context.queue.flush().await;
    }
    let exhausted = context.queue.exhausted().await;
    assert_eq!(exhausted.len(), 1);
    assert_eq!(exhausted[0].attempts, max);

    let mut out = Vec::new();
    run(Commands::Status, &context, &mut out).await.unwrap();
    assert!(String::from_utf8(out).unwrap().contains("unsynced (1), 1 gave up"));
    context.shutdown().await.unwrap();
    drop(context);

    store.set_offline(false);
    let restarted = AppContext::new(AppConfig::default(), store.clone(), key_value, clock);
    restarted.init().await.unwrap();
    assert_eq!(restarted.queue.exhausted().await.len(), 1);
    assert!(restarted.queue.is_retry_armed());

    let report = restarted.queue.flush().await;
    assert_eq!(report.succeeded, 1);
    assert_eq!(restarted.queue.depth().await, 0);
    assert_eq!(store.len("time_entries").await, 1);
    let discarded = restarted.queue.discard(&RecordId::from("missing")).await;
    assert!(discarded.is_err());
    restarted.shutdown().await.unwrap();
}
