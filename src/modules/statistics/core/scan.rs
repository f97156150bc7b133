use crate::modules::records::core::entities::TimeEntry;
use crate::modules::records::core::record::Stored;
use crate::modules::statistics::core::totals::WeekSnapshot;
use crate::shared::core::week::WeekBucket;

/// Derives one bucket from scratch: every non-archived entry starting in `week`.
pub fn scan_week<'a>(
    entries: impl IntoIterator<Item = &'a Stored<TimeEntry>>,
    week: WeekBucket,
    target_minutes: u64,
) -> WeekSnapshot {
    let mut snapshot = WeekSnapshot::empty(week, target_minutes);
    for entry in entries {
        if entry.is_archived() || entry.data.week() != week {
            continue;
        }
        let minutes = entry.data.duration_minutes();
        if minutes == 0 {
            continue;
        }
        snapshot.total_minutes += minutes;
        if let Some(job_id) = &entry.data.job_id {
            *snapshot.per_job.entry(job_id.clone()).or_default() += minutes;
        }
    }
    snapshot
}
