// Queued write operations.
//
// Lifecycle
// - Created when a write fails with a storage error.
// - attempts grows by one per failed replay, capped at the retry limit.
// - Removed only after a successful replay, or an explicit discard.

use crate::modules::records::core::entities::{EntityPatch, EntityRecord};
use crate::modules::records::core::record::EntityKind;
use crate::shared::core::primitives::{RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum QueuedPayload {
    Create(EntityRecord),
    Update(EntityPatch),
    Delete { entity: EntityKind, id: RecordId },
}

impl QueuedPayload {
    pub fn entity(&self) -> EntityKind {
        match self {
            QueuedPayload::Create(record) => record.kind(),
            QueuedPayload::Update(patch) => patch.kind(),
            QueuedPayload::Delete { entity, .. } => *entity,
        }
    }

    pub fn operation_kind(&self) -> OperationKind {
        match self {
            QueuedPayload::Create(_) => OperationKind::Create,
            QueuedPayload::Update(_) => OperationKind::Update,
            QueuedPayload::Delete { .. } => OperationKind::Delete,
        }
    }

    /// The record this operation writes to.
    pub fn record_id(&self) -> &RecordId {
        match self {
            QueuedPayload::Create(record) => record.id(),
            QueuedPayload::Update(patch) => patch.id(),
            QueuedPayload::Delete { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: RecordId,
    pub entity_type: EntityKind,
    pub operation_kind: OperationKind,
    pub payload: QueuedPayload,
    pub enqueued_at: Timestamp,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueuedOperation {
    pub fn new(payload: QueuedPayload, enqueued_at: Timestamp) -> Self {
        Self {
            id: RecordId::generate(),
            entity_type: payload.entity(),
            operation_kind: payload.operation_kind(),
            payload,
            enqueued_at,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn record_id(&self) -> &RecordId {
        self.payload.record_id()
    }

    pub fn is_exhausted(&self, max_retry_attempts: u32) -> bool {
        self.attempts >= max_retry_attempts
    }

    pub fn record_failure(&mut self, error: impl Into<String>, max_retry_attempts: u32) {
        self.attempts = (self.attempts + 1).min(max_retry_attempts);
        self.last_error = Some(error.into());
    }

    /// Marks the operation exhausted after an error no retry can fix.
    pub fn give_up(&mut self, error: impl Into<String>, max_retry_attempts: u32) {
        self.attempts = self.attempts.max(max_retry_attempts);
        self.last_error = Some(error.into());
    }
}
