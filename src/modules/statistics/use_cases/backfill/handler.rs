use crate::modules::records::core::entities::TimeEntry;
use crate::modules::records::repository::{Repository, RepositoryError};
use crate::modules::statistics::core::scan::scan_week;
use crate::modules::statistics::core::totals::WeeklyTotals;
use crate::modules::statistics::engine::AggregationEngine;
use crate::shared::core::clock::Clock;
use crate::shared::core::week::WeekBucket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("a backfill is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillProgress {
    pub done: usize,
    pub total: usize,
    pub week: WeekBucket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    pub weeks: Vec<WeeklyTotals>,
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Recomputes recent week buckets from the stored time entries.
pub struct Backfiller {
    time_entries: Repository<TimeEntry>,
    engine: Arc<AggregationEngine>,
    clock: Arc<dyn Clock>,
    running: AtomicBool,
}

impl Backfiller {
    pub fn new(
        time_entries: Repository<TimeEntry>,
        engine: Arc<AggregationEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            time_entries,
            engine,
            clock,
            running: AtomicBool::new(false),
        }
    }

    /// Replaces the last `weeks_back` buckets, oldest first, ending with the current week.
    /// Each bucket keeps the target it already had.
    #[tracing::instrument(skip(self, on_progress))]
    pub async fn backfill(
        &self,
        weeks_back: usize,
        mut on_progress: impl FnMut(BackfillProgress) + Send,
    ) -> Result<BackfillReport, BackfillError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BackfillError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let weeks = WeekBucket::last_n(self.clock.now(), weeks_back);
        let entries = self.time_entries.list().await?;
        info!(weeks = weeks.len(), entries = entries.len(), "backfill started");

        let total = weeks.len();
        let mut report = BackfillReport {
            weeks: Vec::with_capacity(total),
        };
        for (index, week) in weeks.into_iter().enumerate() {
            let target = self.engine.target_for(week).await;
            let snapshot = scan_week(&entries, week, target);
            report.weeks.push(snapshot.weekly());
            self.engine.replace_week(snapshot, self.clock.now()).await;
            on_progress(BackfillProgress {
                done: index + 1,
                total,
                week,
            });
        }

        info!(weeks = total, "backfill finished");
        Ok(report)
    }
}
