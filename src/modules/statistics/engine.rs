// Incremental statistics aggregation.
//
// Purpose
// - Keep weekly and per-job minute totals current without rescanning every time entry.
//
// Rules
// - A delta for a week newer than the current bucket rolls the engine forward: that week's
//   total is replaced, and it becomes current. Deltas for the current or older weeks add.
// - Totals are clamped at zero, and every clamp is logged.
// - A live overlay shadows one week's total until the next delta or snapshot.
// - Nothing here fails. Out-of-range input degrades to zero totals.

use crate::modules::statistics::core::totals::{
    PerJobTotals, StatsDelta, StatsSnapshot, WeekSnapshot, WeeklyTotals, clamp_add,
};
use crate::shared::core::clock::Clock;
use crate::shared::core::primitives::Timestamp;
use crate::shared::core::week::WeekBucket;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LiveOverlay {
    week: WeekBucket,
    live_minutes: u64,
    target_minutes: u64,
}

#[derive(Debug, Default)]
struct EngineState {
    weeks: BTreeMap<WeekBucket, WeekSnapshot>,
    current_week: Option<WeekBucket>,
    live: Option<LiveOverlay>,
    last_updated: Option<Timestamp>,
}

impl EngineState {
    fn weekly(&self, week: WeekBucket, default_target: u64) -> WeeklyTotals {
        if let Some(live) = self.live.filter(|live| live.week == week) {
            return WeeklyTotals {
                week_bucket: week,
                total_minutes: live.live_minutes,
                target_minutes: live.target_minutes,
            };
        }
        self.weeks
            .get(&week)
            .map(WeekSnapshot::weekly)
            .unwrap_or(WeeklyTotals {
                week_bucket: week,
                total_minutes: 0,
                target_minutes: default_target,
            })
    }

    fn published(&self, default_target: u64) -> Option<WeeklyTotals> {
        let week = self.live.map(|live| live.week).or(self.current_week)?;
        Some(self.weekly(week, default_target))
    }
}

pub struct AggregationEngine {
    state: RwLock<EngineState>,
    clock: Arc<dyn Clock>,
    default_target: u64,
    totals_tx: watch::Sender<Option<WeeklyTotals>>,
}

impl AggregationEngine {
    pub fn new(clock: Arc<dyn Clock>, default_target: u64) -> Self {
        let (totals_tx, _) = watch::channel(None);
        Self {
            state: RwLock::new(EngineState::default()),
            clock,
            default_target,
            totals_tx,
        }
    }

    pub fn default_target(&self) -> u64 {
        self.default_target
    }

    pub async fn apply_delta(&self, delta: StatsDelta) {
        let mut state = self.state.write().await;
        let rolls_forward = delta.affects_weekly
            && state
                .current_week
                .is_none_or(|current| delta.week > current);

        let bucket = state
            .weeks
            .entry(delta.week)
            .or_insert_with(|| WeekSnapshot::empty(delta.week, delta.target_minutes));
        bucket.target_minutes = delta.target_minutes;

        if rolls_forward {
            bucket.total_minutes = delta.delta_minutes.max(0) as u64;
        } else if delta.affects_weekly {
            let (next, clamped) = clamp_add(bucket.total_minutes, delta.delta_minutes);
            if clamped {
                warn!(
                    week = %delta.week,
                    total = bucket.total_minutes,
                    delta = delta.delta_minutes,
                    "weekly total clamped at zero"
                );
            }
            bucket.total_minutes = next;
        }

        if let Some(job_id) = &delta.job_id {
            let current = bucket.per_job.get(job_id).copied().unwrap_or(0);
            let (next, clamped) = clamp_add(current, delta.delta_minutes);
            if clamped {
                warn!(
                    week = %delta.week,
                    job_id = %job_id,
                    total = current,
                    delta = delta.delta_minutes,
                    "per-job total clamped at zero"
                );
            }
            if next == 0 {
                bucket.per_job.remove(job_id);
            } else {
                bucket.per_job.insert(job_id.clone(), next);
            }
        }

        if rolls_forward {
            debug!(week = %delta.week, "rolled into a new week bucket");
            state.current_week = Some(delta.week);
        }
        state.live = None;
        state.last_updated = Some(self.clock.now());
        self.publish(&state);
    }

    pub async fn update_live_minutes(&self, week: WeekBucket, live_minutes: u64, target_minutes: u64) {
        let mut state = self.state.write().await;
        state.live = Some(LiveOverlay {
            week,
            live_minutes,
            target_minutes,
        });
        self.publish(&state);
    }

    pub async fn clear_live(&self) {
        let mut state = self.state.write().await;
        if state.live.take().is_some() {
            self.publish(&state);
        }
    }

    /// Replaces the whole engine state with recomputed ground truth.
    pub async fn set_snapshot(&self, snapshot: StatsSnapshot) {
        let mut state = self.state.write().await;
        let weeks: BTreeMap<_, _> = snapshot
            .weeks
            .into_iter()
            .map(|week| (week.week_bucket, week))
            .collect();
        state.current_week = snapshot
            .current_week
            .or_else(|| weeks.keys().next_back().copied());
        state.weeks = weeks;
        state.live = None;
        state.last_updated = snapshot.last_updated;
        self.publish(&state);
    }

    /// Replaces one bucket. Used by backfill, one week at a time.
    pub async fn replace_week(&self, snapshot: WeekSnapshot, last_updated: Timestamp) {
        let mut state = self.state.write().await;
        let week = snapshot.week_bucket;
        state.weeks.insert(week, snapshot);
        state.current_week = state.current_week.max(Some(week));
        if state.live.is_some_and(|live| live.week == week) {
            state.live = None;
        }
        state.last_updated = Some(last_updated);
        self.publish(&state);
    }

    pub async fn weekly_totals(&self, week: WeekBucket) -> WeeklyTotals {
        self.state.read().await.weekly(week, self.default_target)
    }

    /// The durable total of a week, ignoring any live overlay.
    pub async fn durable_minutes(&self, week: WeekBucket) -> u64 {
        self.state
            .read()
            .await
            .weeks
            .get(&week)
            .map(|bucket| bucket.total_minutes)
            .unwrap_or(0)
    }

    pub async fn per_job_totals(&self, week: WeekBucket) -> PerJobTotals {
        self.state
            .read()
            .await
            .weeks
            .get(&week)
            .map(|bucket| bucket.per_job.clone())
            .unwrap_or_default()
    }

    /// The target a bucket already carries, or the configured default.
    pub async fn target_for(&self, week: WeekBucket) -> u64 {
        self.state
            .read()
            .await
            .weeks
            .get(&week)
            .map(|bucket| bucket.target_minutes)
            .unwrap_or(self.default_target)
    }

    pub async fn current_week(&self) -> Option<WeekBucket> {
        self.state.read().await.current_week
    }

    pub async fn current_totals(&self) -> Option<WeeklyTotals> {
        self.state.read().await.published(self.default_target)
    }

    pub async fn last_updated(&self) -> Option<Timestamp> {
        self.state.read().await.last_updated
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let state = self.state.read().await;
        StatsSnapshot {
            weeks: state.weeks.values().cloned().collect(),
            current_week: state.current_week,
            last_updated: state.last_updated,
        }
    }

    /// Publishes the current week's totals, live overlay included, after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Option<WeeklyTotals>> {
        self.totals_tx.subscribe()
    }

    fn publish(&self, state: &EngineState) {
        self.totals_tx
            .send_replace(state.published(self.default_target));
    }
}
