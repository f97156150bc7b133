use crate::modules::records::core::entities::TimeEntryPatch;
use crate::modules::records::core::record::Stored;
use crate::modules::records::core::entities::TimeEntry;
use crate::modules::time_entries::use_cases::track_time::handler::WriteOutcome;
use crate::shared::core::clock::ManualClock;
use crate::shared::core::primitives::{MILLIS_PER_MINUTE, RecordId};
use crate::shared::core::week::WeekBucket;
use crate::shell::config::AppConfig;
use crate::shell::context::AppContext;
use crate::tests::fixtures::entities::{DAY, HOUR, MONDAY_W42, TimeEntryBuilder, WEEK};
use proptest::prelude::*;
use std::sync::Arc;

fn persisted(outcome: WriteOutcome) -> Stored<TimeEntry> {
    match outcome {
        WriteOutcome::Persisted(record) => record,
        WriteOutcome::Queued(op) => panic!("write unexpectedly queued: {}", op.id),
    }
}

#[tokio::test]
async fn tracks_a_ninety_minute_session_through_edit_live_and_archive() {
    let clock = Arc::new(ManualClock::new(MONDAY_W42 + 11 * HOUR));
    let context = AppContext::in_memory(AppConfig::default(), clock.clone());
    context.init().await.unwrap();
    let week = WeekBucket::containing(MONDAY_W42);
    let mut published = context.engine.subscribe();

    let entry = persisted(
        context
            .time_entries
            .log(TimeEntryBuilder::new().job_id("job-1").minutes(90).build())
            .await
            .unwrap(),
    );
    let totals = context.engine.weekly_totals(week).await;
    assert_eq!(totals.total_minutes, 90);
    assert_eq!(totals.target_minutes, 2_400);
    assert_eq!(
        context.engine.per_job_totals(week).await.get(&RecordId::from("job-1")),
        Some(&90)
    );
    assert_eq!(published.borrow_and_update().map(|t| t.total_minutes), Some(90));

    let session_start = MONDAY_W42 + 11 * HOUR;
    clock.advance(25 * MILLIS_PER_MINUTE);
    let live = context.time_entries.refresh_live(session_start).await;
    assert_eq!(live.total_minutes, 115);
    assert_eq!(context.engine.durable_minutes(week).await, 90);

    context
        .time_entries
        .log(
            TimeEntryBuilder::new()
                .job_id("job-2")
                .starting_at(session_start)
                .minutes(25)
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(context.engine.weekly_totals(week).await.total_minutes, 115);
    assert_eq!(published.borrow_and_update().map(|t| t.total_minutes), Some(115));

    context
        .time_entries
        .edit(
            &entry.id,
            TimeEntryPatch {
                end_time: Some(entry.data.start_time + 120 * MILLIS_PER_MINUTE),
                ..TimeEntryPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(context.engine.weekly_totals(week).await.total_minutes, 145);

    context.time_entries.archive(&entry.id).await.unwrap();
    assert_eq!(context.engine.weekly_totals(week).await.total_minutes, 25);
    assert_eq!(
        context.engine.per_job_totals(week).await.get(&RecordId::from("job-1")),
        None
    );

    let incremental = context.engine.weekly_totals(week).await;
    context.backfill(2).await.unwrap();
    assert_eq!(context.engine.weekly_totals(week).await, incremental);
    context.shutdown().await.unwrap();
}

#[derive(Debug, Clone)]
enum Op {
    Log { job: usize, week: usize, minutes: i64 },
    Edit { entry: usize, job: usize, minutes: i64 },
    Archive { entry: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3, 0usize..2, 1i64..300)
            .prop_map(|(job, week, minutes)| Op::Log { job, week, minutes }),
        (0usize..8, 0usize..3, 1i64..300)
            .prop_map(|(entry, job, minutes)| Op::Edit { entry, job, minutes }),
        (0usize..8).prop_map(|entry| Op::Archive { entry }),
    ]
}

const JOBS: [&str; 3] = ["job-a", "job-b", "job-c"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn incremental_statistics_match_a_full_backfill(ops in proptest::collection::vec(op(), 1..30)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let clock = Arc::new(ManualClock::new(MONDAY_W42 + 2 * DAY));
            let context = AppContext::in_memory(AppConfig::default(), clock);
            let weeks = [
                WeekBucket::containing(MONDAY_W42 - WEEK),
                WeekBucket::containing(MONDAY_W42),
            ];
            let mut logged: Vec<Stored<TimeEntry>> = Vec::new();

            for op in &ops {
                match op {
                    Op::Log { job, week, minutes } => {
                        let start = weeks[*week].starts_at() + 9 * HOUR;
                        let entry = TimeEntryBuilder::new()
                            .job_id(JOBS[*job])
                            .starting_at(start)
                            .minutes(*minutes)
                            .build();
                        logged.push(persisted(context.time_entries.log(entry).await.unwrap()));
                    }
                    Op::Edit { entry, job, minutes } => {
                        let Some(target) = (!logged.is_empty()).then(|| &logged[entry % logged.len()]) else {
                            continue;
                        };
                        let patch = TimeEntryPatch {
                            job_id: Some(RecordId::from(JOBS[*job])),
                            end_time: Some(target.data.start_time + minutes * MILLIS_PER_MINUTE),
                            ..TimeEntryPatch::default()
                        };
                        context.time_entries.edit(&target.id, patch).await.unwrap();
                    }
                    Op::Archive { entry } => {
                        if logged.is_empty() {
                            continue;
                        }
                        let id = logged[entry % logged.len()].id.clone();
                        context.time_entries.archive(&id).await.unwrap();
                    }
                }
            }

            let mut incremental = Vec::new();
            for week in weeks {
                incremental.push((
                    context.engine.durable_minutes(week).await,
                    context.engine.per_job_totals(week).await,
                ));
            }
            context.backfill(2).await.unwrap();
            for (week, expected) in weeks.into_iter().zip(incremental) {
                let scanned = (
                    context.engine.durable_minutes(week).await,
                    context.engine.per_job_totals(week).await,
                );
                prop_assert_eq!(scanned, expected);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
