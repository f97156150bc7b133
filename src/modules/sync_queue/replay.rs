// Replay of queued payloads against the repositories.
//
// Structure
// - One Replayer per entity kind, looked up through the ReplayTable.
// - Creates are written as is, so the record keeps the id and timestamps it was queued with.
// - Deletes replay as soft deletes. Replay is last-writer-wins against current state.

use crate::modules::records::core::entities::{
    Client, Invoice, InvoiceItem, Job, Payment, ProductSale, TimeEntry,
};
use crate::modules::records::core::record::{Entity, EntityKind};
use crate::modules::records::repository::{Repository, RepositoryError};
use crate::modules::sync_queue::core::operation::QueuedPayload;
use crate::shared::core::clock::Clock;
use crate::shared::infrastructure::store_adapter::StoreAdapter;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("payload for {found} routed to the {expected} replayer")]
    KindMismatch {
        expected: EntityKind,
        found: EntityKind,
    },

    #[error("no replayer registered for {0}")]
    NoReplayer(EntityKind),
}

impl ReplayError {
    /// Only a failing store can succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReplayError::Repository(e) if e.is_storage_failure())
    }
}

#[async_trait]
pub trait Replayer: Send + Sync {
    async fn replay(&self, payload: &QueuedPayload) -> Result<(), ReplayError>;
}

pub struct RepositoryReplayer<T: Entity> {
    repository: Repository<T>,
}

impl<T: Entity> RepositoryReplayer<T> {
    pub fn new(repository: Repository<T>) -> Self {
        Self { repository }
    }

    fn mismatch(&self, payload: &QueuedPayload) -> ReplayError {
        ReplayError::KindMismatch {
            expected: T::KIND,
            found: payload.entity(),
        }
    }
}

#[async_trait]
impl<T: Entity> Replayer for RepositoryReplayer<T> {
    async fn replay(&self, payload: &QueuedPayload) -> Result<(), ReplayError> {
        match payload {
            QueuedPayload::Create(record) => {
                let record =
                    T::from_record(record.clone()).ok_or_else(|| self.mismatch(payload))?;
                self.repository.put(&record).await?;
            }
            QueuedPayload::Update(patch) => {
                let (id, patch) =
                    T::from_patch(patch.clone()).ok_or_else(|| self.mismatch(payload))?;
                self.repository.update(&id, patch).await?;
            }
            QueuedPayload::Delete { entity, id } => {
                if *entity != T::KIND {
                    return Err(self.mismatch(payload));
                }
                self.repository.soft_delete(id).await?;
            }
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct ReplayTable {
    replayers: HashMap<EntityKind, Arc<dyn Replayer>>,
}

impl ReplayTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with a repository-backed replayer for every entity kind.
    pub fn for_store(store: Arc<dyn StoreAdapter>, clock: Arc<dyn Clock>) -> Self {
        let mut table = Self::new();
        table.register(Repository::<Client>::new(store.clone(), clock.clone()));
        table.register(Repository::<Job>::new(store.clone(), clock.clone()));
        table.register(Repository::<TimeEntry>::new(store.clone(), clock.clone()));
        table.register(Repository::<Invoice>::new(store.clone(), clock.clone()));
        table.register(Repository::<InvoiceItem>::new(store.clone(), clock.clone()));
        table.register(Repository::<Payment>::new(store.clone(), clock.clone()));
        table.register(Repository::<ProductSale>::new(store, clock));
        table
    }

    pub fn register<T: Entity>(&mut self, repository: Repository<T>) {
        self.insert(T::KIND, Arc::new(RepositoryReplayer::new(repository)));
    }

    pub fn insert(&mut self, kind: EntityKind, replayer: Arc<dyn Replayer>) {
        self.replayers.insert(kind, replayer);
    }

    pub async fn replay(&self, payload: &QueuedPayload) -> Result<(), ReplayError> {
        let kind = payload.entity();
        let replayer = self
            .replayers
            .get(&kind)
            .ok_or(ReplayError::NoReplayer(kind))?;
        replayer.replay(payload).await
    }
}
