// Aggregate shapes held by the engine.
//
// Invariants
// - Totals are never negative. Signed deltas are clamped at zero.
// - Per-job maps hold no zero entries, so incremental and scanned state compare equal.

use crate::shared::core::primitives::RecordId;
use crate::shared::core::week::WeekBucket;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type PerJobTotals = BTreeMap<RecordId, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTotals {
    pub week_bucket: WeekBucket,
    pub total_minutes: u64,
    pub target_minutes: u64,
}

/// Everything the engine knows about one week bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSnapshot {
    pub week_bucket: WeekBucket,
    pub total_minutes: u64,
    pub target_minutes: u64,
    #[serde(default)]
    pub per_job: PerJobTotals,
}

impl WeekSnapshot {
    pub fn empty(week_bucket: WeekBucket, target_minutes: u64) -> Self {
        Self {
            week_bucket,
            total_minutes: 0,
            target_minutes,
            per_job: PerJobTotals::new(),
        }
    }

    pub fn weekly(&self) -> WeeklyTotals {
        WeeklyTotals {
            week_bucket: self.week_bucket,
            total_minutes: self.total_minutes,
            target_minutes: self.target_minutes,
        }
    }
}

/// A signed adjustment produced by a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsDelta {
    pub week: WeekBucket,
    pub job_id: Option<RecordId>,
    pub delta_minutes: i64,
    pub target_minutes: u64,
    pub affects_weekly: bool,
}

impl StatsDelta {
    pub fn new(week: WeekBucket, job_id: Option<RecordId>, delta_minutes: i64, target_minutes: u64) -> Self {
        Self {
            week,
            job_id,
            delta_minutes,
            target_minutes,
            affects_weekly: true,
        }
    }
}

/// Full engine state, as replaced by `set_snapshot`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub weeks: Vec<WeekSnapshot>,
    pub current_week: Option<WeekBucket>,
    pub last_updated: Option<i64>,
}

/// Adds a signed delta to a total. The flag is set when the clamp absorbed part of it.
pub fn clamp_add(current: u64, delta: i64) -> (u64, bool) {
    if delta >= 0 {
        return (current.saturating_add(delta as u64), false);
    }
    let decrease = delta.unsigned_abs();
    match current.checked_sub(decrease) {
        Some(next) => (next, false),
        None => (0, true),
    }
}
