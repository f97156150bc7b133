// Write path for time entries.
//
// Flow
// - Write through the repository.
// - On success, feed the signed minute deltas to the aggregation engine.
// - On a storage failure, hand the write to the retry queue and report it as queued.
//   If the queue cannot persist it either, the write is lost and that error is returned.
// - Any other repository error (NotFound, Corrupt) is returned and never queued.

use crate::modules::records::core::entities::{TimeEntry, TimeEntryPatch};
use crate::modules::records::core::record::{Entity, Stored};
use crate::modules::records::repository::{Repository, RepositoryError};
use crate::modules::statistics::core::totals::{StatsDelta, WeeklyTotals};
use crate::modules::statistics::engine::AggregationEngine;
use crate::modules::sync_queue::core::operation::{QueuedOperation, QueuedPayload};
use crate::modules::sync_queue::queue::{QueueError, RetryQueue};
use crate::shared::core::clock::Clock;
use crate::shared::core::primitives::{RecordId, Timestamp, minutes_between};
use crate::shared::core::week::WeekBucket;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TrackTimeError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("write failed and could not be queued: {0}")]
    Queue(#[from] QueueError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Persisted(Stored<TimeEntry>),
    Queued(QueuedOperation),
}

impl WriteOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, WriteOutcome::Queued(_))
    }
}

pub struct TimeEntryHandler {
    repository: Repository<TimeEntry>,
    engine: Arc<AggregationEngine>,
    queue: Arc<RetryQueue>,
    clock: Arc<dyn Clock>,
}

impl TimeEntryHandler {
    pub fn new(
        repository: Repository<TimeEntry>,
        engine: Arc<AggregationEngine>,
        queue: Arc<RetryQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            engine,
            queue,
            clock,
        }
    }

    pub async fn log(&self, entry: TimeEntry) -> Result<WriteOutcome, TrackTimeError> {
        let record = self.repository.prepare(entry);
        match self.repository.put(&record).await {
            Ok(()) => {
                self.contribute(&record, 1).await;
                Ok(WriteOutcome::Persisted(record))
            }
            Err(e) => {
                let payload = QueuedPayload::Create(TimeEntry::into_record(record));
                self.queue_or_fail(e, payload).await
            }
        }
    }

    pub async fn edit(
        &self,
        id: &RecordId,
        patch: TimeEntryPatch,
    ) -> Result<WriteOutcome, TrackTimeError> {
        let payload = QueuedPayload::Update(TimeEntry::into_patch(id.clone(), patch.clone()));
        let previous = match self.load(id).await {
            Ok(previous) => previous,
            Err(e) => return self.queue_or_fail(e, payload).await,
        };
        match self.repository.update(id, patch).await {
            Ok(updated) => {
                self.apply_change(&previous, &updated).await;
                Ok(WriteOutcome::Persisted(updated))
            }
            Err(e) => self.queue_or_fail(e, payload).await,
        }
    }

    pub async fn archive(&self, id: &RecordId) -> Result<WriteOutcome, TrackTimeError> {
        let payload = QueuedPayload::Delete {
            entity: TimeEntry::KIND,
            id: id.clone(),
        };
        let previous = match self.load(id).await {
            Ok(previous) => previous,
            Err(e) => return self.queue_or_fail(e, payload).await,
        };
        match self.repository.soft_delete(id).await {
            Ok(archived) => {
                if !previous.is_archived() {
                    self.contribute(&previous, -1).await;
                }
                Ok(WriteOutcome::Persisted(archived))
            }
            Err(e) => self.queue_or_fail(e, payload).await,
        }
    }

    /// Shows a running session as the durable week total plus the elapsed minutes.
    pub async fn refresh_live(&self, started_at: Timestamp) -> WeeklyTotals {
        let week = WeekBucket::containing(started_at);
        let elapsed = minutes_between(started_at, self.clock.now());
        let durable = self.engine.durable_minutes(week).await;
        let target = self.engine.target_for(week).await;
        self.engine
            .update_live_minutes(week, durable + elapsed, target)
            .await;
        self.engine.weekly_totals(week).await
    }

    pub async fn clear_live(&self) {
        self.engine.clear_live().await;
    }

    async fn load(&self, id: &RecordId) -> Result<Stored<TimeEntry>, RepositoryError> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                collection: TimeEntry::KIND.collection().to_string(),
                id: id.clone(),
            })
    }

    async fn queue_or_fail(
        &self,
        error: RepositoryError,
        payload: QueuedPayload,
    ) -> Result<WriteOutcome, TrackTimeError> {
        if !error.is_storage_failure() {
            return Err(error.into());
        }
        warn!(error = %error, record_id = %payload.record_id(), "time entry write failed, queueing");
        let operation = self.queue.enqueue(payload).await?;
        Ok(WriteOutcome::Queued(operation))
    }

    async fn apply_change(&self, previous: &Stored<TimeEntry>, next: &Stored<TimeEntry>) {
        let before = contribution(previous);
        let after = contribution(next);
        match (before, after) {
            (Some((week_a, job_a, old)), Some((week_b, job_b, new)))
                if week_a == week_b && job_a == job_b =>
            {
                self.apply(week_a, job_a, new - old).await;
            }
            (before, after) => {
                if let Some((week, job, minutes)) = before {
                    self.apply(week, job, -minutes).await;
                }
                if let Some((week, job, minutes)) = after {
                    self.apply(week, job, minutes).await;
                }
            }
        }
    }

    async fn contribute(&self, record: &Stored<TimeEntry>, sign: i64) {
        if let Some((week, job, minutes)) = contribution(record) {
            self.apply(week, job, sign * minutes).await;
        }
    }

    async fn apply(&self, week: WeekBucket, job_id: Option<RecordId>, delta_minutes: i64) {
        if delta_minutes == 0 {
            return;
        }
        let target = self.engine.target_for(week).await;
        debug!(week = %week, delta_minutes, "applying time entry delta");
        self.engine
            .apply_delta(StatsDelta::new(week, job_id, delta_minutes, target))
            .await;
    }
}

/// What an entry adds to the aggregates: its week, its job and its minutes.
fn contribution(record: &Stored<TimeEntry>) -> Option<(WeekBucket, Option<RecordId>, i64)> {
    if record.is_archived() {
        return None;
    }
    let minutes = record.data.duration_minutes() as i64;
    Some((record.data.week(), record.data.job_id.clone(), minutes))
}
