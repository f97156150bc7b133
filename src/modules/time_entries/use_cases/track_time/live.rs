use crate::modules::time_entries::use_cases::track_time::handler::TimeEntryHandler;
use crate::shared::core::primitives::Timestamp;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Refreshes the live overlay of a running session on a fixed period.
///
/// One session runs at a time. Dropping the ticker stops it, leaving the last
/// overlay in place; `stop` also clears it.
pub struct LiveTicker {
    handler: Arc<TimeEntryHandler>,
    task: JoinHandle<()>,
}

impl LiveTicker {
    pub fn start(handler: Arc<TimeEntryHandler>, started_at: Timestamp, period: Duration) -> Self {
        let ticking = handler.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                ticking.refresh_live(started_at).await;
            }
        });
        Self { handler, task }
    }

    pub async fn stop(self) {
        self.task.abort();
        self.handler.clear_live().await;
    }
}

impl Drop for LiveTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
