// Composition root.
//
// Responsibilities
// - Instantiate concrete infrastructure (JSON files on disk, or in-memory for tests).
// - Wire the engine, retry queue and use case handlers over one store.
// - Own background work: the queue timer and the reconcile task that re-runs the
//   backfill after queued writes were replayed.

use crate::modules::backup::export::{BackupError, ExportBundle, export_all};
use crate::modules::backup::import::{ImportProgress, ImportReport, import_all};
use crate::modules::backup::purge::{PurgeError, PurgeReport, purge_all};
use crate::modules::billing::snapshot::{BillingSnapshot, load_billing_snapshot};
use crate::modules::billing::use_cases::issue_invoice::handler::InvoiceIssuer;
use crate::modules::records::repository::{Repository, RepositoryError};
use crate::modules::statistics::core::totals::StatsSnapshot;
use crate::modules::statistics::engine::AggregationEngine;
use crate::modules::statistics::use_cases::backfill::handler::{
    BackfillError, BackfillReport, Backfiller,
};
use crate::modules::sync_queue::queue::RetryQueue;
use crate::modules::sync_queue::replay::ReplayTable;
use crate::modules::time_entries::use_cases::track_time::handler::TimeEntryHandler;
use crate::shared::core::clock::{Clock, SystemClock};
use crate::shared::infrastructure::key_value::KeyValueStore;
use crate::shared::infrastructure::key_value::in_memory::InMemoryKeyValue;
use crate::shared::infrastructure::key_value::json_file::JsonFileKeyValue;
use crate::shared::infrastructure::store_adapter::StoreAdapter;
use crate::shared::infrastructure::store_adapter::in_memory::InMemoryStore;
use crate::shared::infrastructure::store_adapter::json_file::JsonFileStore;
use crate::shell::config::AppConfig;
use anyhow::Context as _;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct AppContext {
    pub config: AppConfig,
    pub clock: Arc<dyn Clock>,
    pub store: Arc<dyn StoreAdapter>,
    pub key_value: Arc<dyn KeyValueStore>,
    pub engine: Arc<AggregationEngine>,
    pub queue: Arc<RetryQueue>,
    pub backfiller: Arc<Backfiller>,
    pub time_entries: Arc<TimeEntryHandler>,
    pub invoices: Arc<InvoiceIssuer>,
    reconciler: Mutex<Option<JoinHandle<()>>>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn StoreAdapter>,
        key_value: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = Arc::new(AggregationEngine::new(
            clock.clone(),
            config.weekly_target_minutes,
        ));
        let queue = RetryQueue::new(
            ReplayTable::for_store(store.clone(), clock.clone()),
            key_value.clone(),
            clock.clone(),
            config.retry_policy(),
        );
        let time_entry_repository = Repository::new(store.clone(), clock.clone());
        let backfiller = Arc::new(Backfiller::new(
            time_entry_repository.clone(),
            engine.clone(),
            clock.clone(),
        ));
        let time_entries = Arc::new(TimeEntryHandler::new(
            time_entry_repository,
            engine.clone(),
            queue.clone(),
            clock.clone(),
        ));
        let invoices = Arc::new(InvoiceIssuer::new(store.clone(), clock.clone()));

        Self {
            config,
            clock,
            store,
            key_value,
            engine,
            queue,
            backfiller,
            time_entries,
            invoices,
            reconciler: Mutex::new(None),
        }
    }

    /// File-backed context rooted at `config.data_dir`.
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        let store = JsonFileStore::open(config.store_dir())
            .await
            .with_context(|| format!("opening store at {}", config.store_dir().display()))?;
        let key_value = JsonFileKeyValue::open(config.key_value_path())
            .await
            .with_context(|| {
                format!("opening state at {}", config.key_value_path().display())
            })?;
        info!(data_dir = %config.data_dir.display(), "data directory opened");
        Ok(Self::new(
            config,
            Arc::new(store),
            Arc::new(key_value),
            Arc::new(SystemClock),
        ))
    }

    pub fn in_memory(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryKeyValue::new()),
            clock,
        )
    }

    /// Restores the retry queue, rebuilds recent statistics and starts reconciling replays.
    pub async fn init(&self) -> anyhow::Result<BackfillReport> {
        let depth = self.queue.init().await.context("restoring the retry queue")?;
        let report = self.backfill(self.config.backfill_weeks).await?;
        self.spawn_reconciler();
        info!(
            depth,
            weeks = report.weeks.len(),
            "freelance ops initialized"
        );
        Ok(report)
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        if let Some(task) = self.reconciler_slot().take() {
            task.abort();
        }
        self.queue
            .shutdown()
            .await
            .context("persisting the retry queue")?;
        info!("freelance ops shut down");
        Ok(())
    }

    pub async fn backfill(&self, weeks_back: usize) -> Result<BackfillReport, BackfillError> {
        self.backfiller
            .backfill(weeks_back, |progress| {
                debug!(
                    done = progress.done,
                    total = progress.total,
                    week = %progress.week,
                    "backfill progress"
                );
            })
            .await
    }

    pub async fn stats(&self) -> StatsSnapshot {
        self.engine.snapshot().await
    }

    pub async fn billing_snapshot(&self) -> Result<BillingSnapshot, RepositoryError> {
        load_billing_snapshot(self.store.clone(), self.clock.clone()).await
    }

    pub async fn export(&self) -> Result<ExportBundle, BackupError> {
        export_all(self.store.as_ref(), self.clock.as_ref()).await
    }

    /// Imports a bundle and rebuilds statistics from what landed.
    pub async fn import(
        &self,
        bundle: &ExportBundle,
        on_progress: impl FnMut(ImportProgress),
    ) -> anyhow::Result<ImportReport> {
        let report = import_all(self.store.as_ref(), bundle, on_progress).await?;
        self.backfill(self.config.backfill_weeks).await?;
        Ok(report)
    }

    /// Purges every record and all key-value state, then drops the in-memory queue and
    /// statistics so nothing stale is written back.
    pub async fn purge(&self, confirmation: &str) -> Result<PurgeReport, PurgeError> {
        let mut report = purge_all(self.store.as_ref(), self.key_value.as_ref(), confirmation).await?;
        if let Err(e) = self.queue.clear().await {
            report.errors.push(format!("retry queue: {e}"));
        }
        self.engine.set_snapshot(StatsSnapshot::default()).await;
        Ok(report)
    }

    fn spawn_reconciler(&self) {
        let mut replayed = self.queue.subscribe_replayed();
        let backfiller = self.backfiller.clone();
        let weeks_back = self.config.backfill_weeks;
        let task = tokio::spawn(async move {
            while replayed.changed().await.is_ok() {
                let total = *replayed.borrow_and_update();
                match backfiller.backfill(weeks_back, |_| {}).await {
                    Ok(_) => debug!(replayed = total, "statistics reconciled after replay"),
                    Err(BackfillError::AlreadyRunning) => {
                        debug!("reconcile skipped, backfill already running")
                    }
                    Err(e) => warn!(error = %e, "statistics reconcile failed"),
                }
            }
        });
        if let Some(previous) = self.reconciler_slot().replace(task) {
            previous.abort();
        }
    }

    fn reconciler_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.reconciler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        let slot = self
            .reconciler
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}
