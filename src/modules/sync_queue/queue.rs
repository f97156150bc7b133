// Durable retry queue.
//
// Purpose
// - Guarantee at-least-once delivery of writes that failed against the local store.
//
// Responsibilities
// - Keep queued operations in FIFO order and mirror them to the key-value store.
// - Replay them sequentially, with exponential backoff between automatic passes.
// - Publish the queue depth for an "unsynced (N)" indicator.
//
// Ordering
// - A failed replay blocks later operations on the same record for the rest of the pass.
//   Operations on other records keep flowing.
// - Exhausted operations stay queued and visible. They are still attempted by every flush,
//   but never arm the timer, and neither do later operations on the same record.
// - Logical replay errors (NotFound, Corrupt, no replayer) exhaust an operation at once.

use crate::modules::sync_queue::core::backoff::RetryPolicy;
use crate::modules::sync_queue::core::operation::{QueuedOperation, QueuedPayload};
use crate::modules::sync_queue::replay::ReplayTable;
use crate::shared::core::clock::Clock;
use crate::shared::core::primitives::RecordId;
use crate::shared::infrastructure::key_value::{KeyValueError, KeyValueStore};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const PENDING_KEY: &str = "sync_queue.pending";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Persistence(#[from] KeyValueError),

    #[error("persisted queue could not be decoded: {0}")]
    Decode(String),

    #[error("operation {0} is not queued")]
    NotQueued(RecordId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub succeeded: usize,
    pub failed: usize,
    pub exhausted: usize,
    pub deferred: usize,
}

struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct RetryQueue {
    operations: Mutex<Vec<QueuedOperation>>,
    replay: ReplayTable,
    key_value: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    flushing: AtomicBool,
    timer: std::sync::Mutex<Option<JoinHandle<()>>>,
    depth_tx: watch::Sender<usize>,
    replayed_tx: watch::Sender<u64>,
    this: Weak<RetryQueue>,
}

impl RetryQueue {
    pub fn new(
        replay: ReplayTable,
        key_value: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Arc<Self> {
        let (depth_tx, _) = watch::channel(0);
        let (replayed_tx, _) = watch::channel(0);
        Arc::new_cyclic(|this| Self {
            operations: Mutex::new(Vec::new()),
            replay,
            key_value,
            clock,
            policy,
            flushing: AtomicBool::new(false),
            timer: std::sync::Mutex::new(None),
            depth_tx,
            replayed_tx,
            this: this.clone(),
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Loads the persisted queue and arms the first pass after the startup grace period.
    #[tracing::instrument(skip(self))]
    pub async fn init(&self) -> Result<usize, QueueError> {
        let loaded: Vec<QueuedOperation> = match self.key_value.get(PENDING_KEY).await? {
            Some(json) => {
                serde_json::from_value(json).map_err(|e| QueueError::Decode(e.to_string()))?
            }
            None => Vec::new(),
        };
        let depth = loaded.len();
        {
            let mut operations = self.operations.lock().await;
            *operations = loaded;
            self.depth_tx.send_replace(operations.len());
        }
        info!(depth, "retry queue loaded");
        if depth > 0 {
            self.schedule_retry(Some(self.policy.startup_grace)).await;
        }
        Ok(depth)
    }

    /// Cancels the timer and persists whatever is still queued.
    pub async fn shutdown(&self) -> Result<(), QueueError> {
        self.disarm();
        let operations = self.operations.lock().await;
        self.persist(&operations).await?;
        info!(depth = operations.len(), "retry queue shut down");
        Ok(())
    }

    /// Queues a write. Nothing is queued unless the queue could be persisted with it.
    pub async fn enqueue(&self, payload: QueuedPayload) -> Result<QueuedOperation, QueueError> {
        let operation = QueuedOperation::new(payload, self.clock.now());
        {
            let mut operations = self.operations.lock().await;
            operations.push(operation.clone());
            if let Err(e) = self.persist(&operations).await {
                operations.pop();
                error!(
                    error = %e,
                    entity = %operation.entity_type,
                    record_id = %operation.record_id(),
                    "write could not be queued"
                );
                return Err(e);
            }
            self.depth_tx.send_replace(operations.len());
        }
        info!(
            op_id = %operation.id,
            entity = %operation.entity_type,
            kind = %operation.operation_kind,
            record_id = %operation.record_id(),
            "write queued for retry"
        );
        self.schedule_retry(None).await;
        Ok(operation)
    }

    /// Replays every queued operation once, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn flush(&self) -> FlushReport {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("flush already in progress");
            return FlushReport::default();
        }
        let _guard = FlushGuard(&self.flushing);

        let batch = self.operations.lock().await.clone();
        let max = self.policy.max_retry_attempts;
        let mut blocked = HashSet::new();
        let mut report = FlushReport::default();

        for queued in batch {
            let record = (queued.entity_type, queued.record_id().clone());
            if blocked.contains(&record) {
                report.deferred += 1;
                continue;
            }
            match self.replay.replay(&queued.payload).await {
                Ok(()) => {
                    let mut operations = self.operations.lock().await;
                    operations.retain(|op| op.id != queued.id);
                    self.persist_or_log(&operations).await;
                    self.depth_tx.send_replace(operations.len());
                    report.succeeded += 1;
                }
                Err(e) => {
                    let mut operations = self.operations.lock().await;
                    if let Some(op) = operations.iter_mut().find(|op| op.id == queued.id) {
                        let transient = e.is_transient();
                        if op.is_exhausted(max) || !transient {
                            report.exhausted += 1;
                        } else {
                            report.failed += 1;
                        }
                        if transient {
                            op.record_failure(e.to_string(), max);
                        } else {
                            op.give_up(e.to_string(), max);
                        }
                        warn!(
                            op_id = %op.id,
                            entity = %op.entity_type,
                            kind = %op.operation_kind,
                            attempts = op.attempts,
                            transient,
                            error = %e,
                            "replay failed"
                        );
                    }
                    self.persist_or_log(&operations).await;
                    blocked.insert(record);
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            exhausted = report.exhausted,
            deferred = report.deferred,
            "flush finished"
        );
        if report.succeeded > 0 {
            self.replayed_tx
                .send_modify(|replayed| *replayed += report.succeeded as u64);
        }
        self.schedule_retry(None).await;
        report
    }

    /// Arms the retry timer, replacing any pending one. Without an explicit delay the
    /// backoff of the first retryable operation is used. When nothing is retryable the
    /// pending timer is cancelled instead.
    pub async fn schedule_retry(&self, delay: Option<Duration>) {
        let delay = match delay {
            Some(delay) => Some(delay),
            None => self.next_backoff(&self.operations.lock().await),
        };
        match delay {
            Some(delay) => self.arm(delay),
            None => self.disarm(),
        }
    }

    /// Backoff of the first operation a pass could still replay. Operations queued behind
    /// an exhausted one on the same record are deferred by every pass, so they do not count.
    fn next_backoff(&self, operations: &[QueuedOperation]) -> Option<Duration> {
        let max = self.policy.max_retry_attempts;
        let mut stuck = HashSet::new();
        for op in operations {
            let record = (op.entity_type, op.record_id());
            if op.is_exhausted(max) {
                stuck.insert(record);
            } else if !stuck.contains(&record) {
                return Some(self.policy.backoff_for(op.attempts));
            }
        }
        None
    }

    // Must stay a plain fn: the task it spawns awaits `flush`, which calls back in here.
    fn arm(&self, delay: Duration) {
        let this = self.this.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(queue) = this.upgrade() else {
                return;
            };
            queue.timer_slot().take();
            queue.flush().await;
        });
        debug!(delay_ms = delay.as_millis() as u64, "retry scheduled");
        if let Some(previous) = self.timer_slot().replace(handle) {
            previous.abort();
        }
    }

    fn disarm(&self) {
        if let Some(timer) = self.timer_slot().take() {
            timer.abort();
        }
    }

    fn timer_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_retry_armed(&self) -> bool {
        self.timer_slot().is_some()
    }

    /// Drops every queued operation, exhausted ones included, and cancels the timer.
    pub async fn clear(&self) -> Result<usize, QueueError> {
        self.disarm();
        let mut operations = self.operations.lock().await;
        let dropped = operations.len();
        operations.clear();
        self.depth_tx.send_replace(0);
        self.persist(&operations).await?;
        warn!(dropped, "retry queue cleared");
        Ok(dropped)
    }

    pub async fn depth(&self) -> usize {
        self.operations.lock().await.len()
    }

    pub async fn pending(&self) -> Vec<QueuedOperation> {
        self.operations.lock().await.clone()
    }

    pub async fn exhausted(&self) -> Vec<QueuedOperation> {
        let max = self.policy.max_retry_attempts;
        self.operations
            .lock()
            .await
            .iter()
            .filter(|op| op.is_exhausted(max))
            .cloned()
            .collect()
    }

    /// Removes an operation without replaying it.
    pub async fn discard(&self, id: &RecordId) -> Result<QueuedOperation, QueueError> {
        let mut operations = self.operations.lock().await;
        let index = operations
            .iter()
            .position(|op| &op.id == id)
            .ok_or_else(|| QueueError::NotQueued(id.clone()))?;
        let removed = operations.remove(index);
        self.persist(&operations).await?;
        self.depth_tx.send_replace(operations.len());
        warn!(op_id = %removed.id, entity = %removed.entity_type, "queued write discarded");
        Ok(removed)
    }

    pub fn subscribe_depth(&self) -> watch::Receiver<usize> {
        self.depth_tx.subscribe()
    }

    /// Running count of successful replays. Replayed writes bypass the aggregation
    /// engine, so listeners use this to recompute statistics.
    pub fn subscribe_replayed(&self) -> watch::Receiver<u64> {
        self.replayed_tx.subscribe()
    }

    async fn persist(&self, operations: &[QueuedOperation]) -> Result<(), QueueError> {
        let json =
            serde_json::to_value(operations).map_err(|e| QueueError::Decode(e.to_string()))?;
        self.key_value.set(PENDING_KEY, json).await?;
        Ok(())
    }

    async fn persist_or_log(&self, operations: &[QueuedOperation]) {
        if let Err(e) = self.persist(operations).await {
            error!(error = %e, depth = operations.len(), "retry queue could not be persisted");
        }
    }
}

impl Drop for RetryQueue {
    fn drop(&mut self) {
        let slot = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = slot.take() {
            timer.abort();
        }
    }
}
