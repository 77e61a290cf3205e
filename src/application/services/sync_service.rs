// src/application/services/sync_service.rs
//! Queued mutation descriptors and the sync service interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::application::error::ApplicationResult;
use crate::infrastructure::api::dto::{BookmarkRequest, CollectionRequest, SharingRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEntity {
    Collection,
    Bookmark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

/// Payload of one queued mutation, one variant per wire shape.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncPayload {
    CollectionUpsert(CollectionRequest),
    CollectionSharing(SharingRequest),
    BookmarkUpsert(BookmarkRequest),
    BookmarkFlags {
        is_favorite: Option<bool>,
        is_archived: Option<bool>,
    },
    /// Deletes carry no body; the entity id is enough.
    Tombstone,
}

/// One pending mutation destined for the remote backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncChange {
    pub user_id: String,
    pub entity: SyncEntity,
    /// Local row id at enqueue time; provisional for unsynced creates.
    pub entity_id: i64,
    pub change: ChangeType,
    pub payload: SyncPayload,
    pub queued_at: DateTime<Utc>,
    pub retry_count: u32,
}

impl SyncChange {
    pub fn new(
        user_id: impl Into<String>,
        entity: SyncEntity,
        entity_id: i64,
        change: ChangeType,
        payload: SyncPayload,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            entity,
            entity_id,
            change,
            payload,
            queued_at: Utc::now(),
            retry_count: 0,
        }
    }

    pub fn with_incremented_retry(mut self) -> Self {
        self.retry_count += 1;
        self
    }
}

/// What the drain loop does with a failed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainPolicy {
    /// A failed descriptor is requeued alone (with its retry count bumped);
    /// descriptors after it still dispatch. Permanent failures are dropped
    /// and logged.
    #[default]
    IsolateItems,
    /// On the first failure the entire unprocessed remainder, failed
    /// descriptor included, returns to the front of the queue. Kept
    /// selectable for compatibility with the pre-rewrite behavior.
    ReplayRemainder,
}

/// Best-effort delivery of queued mutations to the remote backend.
///
/// Enqueueing is fire-and-forget: it never blocks or fails the user action
/// that produced the change. Descriptors live in process memory only; after
/// a restart [`SyncService::requeue_pending`] re-derives them from the local
/// store's sync flags.
#[async_trait]
pub trait SyncService: Send + Sync + Debug {
    /// Hand a change to the worker; triggers a drain attempt.
    fn enqueue(&self, change: SyncChange);

    /// Re-derive pending work from the store's `is_synced`/`is_deleted`
    /// flags and enqueue it. Collections go first so bookmark creates can
    /// rely on their collection's server id. Called once on startup.
    async fn requeue_pending(&self) -> ApplicationResult<usize>;

    /// Wait until everything enqueued so far was attempted once.
    async fn flush(&self);

    /// Records still awaiting a push, counted from the store (not from the
    /// transient queue): unsynced rows, unconfirmed deletes, drifted flags.
    async fn pending_count(&self) -> ApplicationResult<usize>;
}
