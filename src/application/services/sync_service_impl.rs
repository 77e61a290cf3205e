// src/application/services/sync_service_impl.rs
//! Channel-fed sync worker.
//!
//! One dedicated task is the only consumer of the change channel, so drains
//! are single-flight by construction: two enqueues can never dispatch the
//! same descriptor twice. Each received batch triggers exactly one drain
//! attempt; descriptors left queued by a failed drain sit until the next
//! enqueue (or flush) triggers another attempt.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, instrument, warn};

use crate::application::error::ApplicationResult;
use crate::application::services::sync_service::{
    ChangeType, DrainPolicy, SyncChange, SyncEntity, SyncPayload, SyncService,
};
use crate::application::watch::ChangeNotifier;
use crate::domain::repositories::bookmark_repository::BookmarkRepository;
use crate::domain::repositories::collection_repository::CollectionRepository;
use crate::infrastructure::api::dto::{ArchivePatch, FavoritePatch};
use crate::infrastructure::api::error::{ApiError, ApiRetryClass};
use crate::infrastructure::api::mapper;
use crate::infrastructure::api::remote::RemoteApi;

enum SyncCommand {
    Push(SyncChange),
    Flush(oneshot::Sender<()>),
}

/// The queue plus its drain logic. Owned by the worker task; tests drive it
/// directly to pin down the drain semantics.
#[derive(Debug)]
pub struct SyncWorker {
    queue: VecDeque<SyncChange>,
    policy: DrainPolicy,
    max_retries: u32,
    remote: Arc<dyn RemoteApi>,
    bookmarks: Arc<dyn BookmarkRepository>,
    collections: Arc<dyn CollectionRepository>,
    notifier: ChangeNotifier,
}

impl SyncWorker {
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        bookmarks: Arc<dyn BookmarkRepository>,
        collections: Arc<dyn CollectionRepository>,
        notifier: ChangeNotifier,
        policy: DrainPolicy,
        max_retries: u32,
    ) -> Self {
        Self {
            queue: VecDeque::new(),
            policy,
            max_retries,
            remote,
            bookmarks,
            collections,
            notifier,
        }
    }

    pub fn push(&mut self, change: SyncChange) {
        self.queue.push_back(change);
    }

    pub fn queued(&self) -> &VecDeque<SyncChange> {
        &self.queue
    }

    /// One drain attempt over the current queue.
    #[instrument(skip(self), level = "debug", fields(queued = self.queue.len(), policy = ?self.policy))]
    pub async fn drain(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let snapshot: Vec<SyncChange> = self.queue.drain(..).collect();

        match self.policy {
            DrainPolicy::ReplayRemainder => self.drain_replay_remainder(snapshot).await,
            DrainPolicy::IsolateItems => self.drain_isolated(snapshot).await,
        }
    }

    /// Pre-rewrite policy: the first failure sends the whole unprocessed
    /// remainder, failed descriptor included, back to the front. Retry
    /// counts are not consulted.
    async fn drain_replay_remainder(&mut self, snapshot: Vec<SyncChange>) {
        for (index, change) in snapshot.iter().enumerate() {
            if let Err(err) = self.dispatch(change).await {
                warn!(
                    "Sync dispatch failed ({:?} {:?} id={}), replaying remainder of {}: {}",
                    change.entity,
                    change.change,
                    change.entity_id,
                    snapshot.len() - index,
                    err
                );
                for queued in snapshot[index..].iter().rev() {
                    self.queue.push_front(queued.clone());
                }
                return;
            }
        }
    }

    /// Corrected policy: one bad descriptor never blocks the others.
    /// Retryable failures requeue with a bumped retry count until the cap;
    /// everything else is dropped and logged (the store's sync flags keep
    /// the work re-derivable).
    async fn drain_isolated(&mut self, snapshot: Vec<SyncChange>) {
        let mut requeue = Vec::new();

        for change in snapshot {
            match self.dispatch(&change).await {
                Ok(()) => {}
                Err(err) => match err.retry_class() {
                    ApiRetryClass::Retryable if change.retry_count < self.max_retries => {
                        warn!(
                            "Sync dispatch failed ({:?} {:?} id={}), requeueing (attempt {}): {}",
                            change.entity, change.change, change.entity_id, change.retry_count, err
                        );
                        requeue.push(change.with_incremented_retry());
                    }
                    ApiRetryClass::Retryable => {
                        error!(
                            "Dropping change after {} attempts ({:?} {:?} id={}): {}",
                            change.retry_count, change.entity, change.change, change.entity_id, err
                        );
                    }
                    ApiRetryClass::ReauthRequired => {
                        warn!(
                            "Dropping change pending re-authentication ({:?} {:?} id={}): {}",
                            change.entity, change.change, change.entity_id, err
                        );
                    }
                    ApiRetryClass::Permanent => {
                        error!(
                            "Dropping change after permanent failure ({:?} {:?} id={}): {}",
                            change.entity, change.change, change.entity_id, err
                        );
                    }
                },
            }
        }

        for change in requeue.into_iter().rev() {
            self.queue.push_front(change);
        }
    }

    /// Deliver one descriptor and fold the confirmation back into the store.
    ///
    /// Store bookkeeping errors after a confirmed remote call are logged but
    /// not returned: retrying the dispatch would duplicate the delivery.
    async fn dispatch(&self, change: &SyncChange) -> Result<(), ApiError> {
        match (change.entity, change.change, &change.payload) {
            (SyncEntity::Collection, ChangeType::Create, SyncPayload::CollectionUpsert(req)) => {
                let dto = self.remote.create_collection(&change.user_id, req).await?;
                let server_id = dto.id;

                if server_id != change.entity_id {
                    if let Err(err) = self.collections.relabel_id(change.entity_id, server_id) {
                        error!(
                            "Failed to relabel collection {} to server id {}: {}",
                            change.entity_id, server_id, err
                        );
                        return Ok(());
                    }
                }
                self.confirm_collection(server_id);
            }
            (SyncEntity::Collection, ChangeType::Update, SyncPayload::CollectionUpsert(req)) => {
                self.remote.update_collection(change.entity_id, req).await?;
                self.confirm_collection(change.entity_id);
            }
            (SyncEntity::Collection, ChangeType::Update, SyncPayload::CollectionSharing(req)) => {
                let already_shared = self
                    .collections
                    .get_by_id_any(change.entity_id)
                    .ok()
                    .flatten()
                    .map(|c| c.share_url.is_some())
                    .unwrap_or(false);

                let share = if req.is_shared && !already_shared {
                    self.remote.share_collection(change.entity_id, req).await?
                } else {
                    self.remote.update_sharing(change.entity_id, req).await?
                };

                // Write the server-assigned share URL back into the row
                match self.collections.get_by_id_any(change.entity_id) {
                    Ok(Some(mut collection)) => {
                        if req.is_shared {
                            collection.share_url = Some(share.share_url);
                            collection.share_expiry = share.expires_at;
                        } else {
                            collection.share_url = None;
                            collection.share_expiry = None;
                        }
                        if let Err(err) = self.collections.update(&collection) {
                            error!("Failed to store share URL for {}: {}", change.entity_id, err);
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        error!("Failed to load collection {}: {}", change.entity_id, err)
                    }
                }
                self.confirm_collection(change.entity_id);
            }
            (SyncEntity::Collection, ChangeType::Delete, SyncPayload::Tombstone) => {
                match self.remote.delete_collection(change.entity_id).await {
                    Ok(()) => {}
                    // Already gone remotely; the local tombstone can go too.
                    Err(err) if err.status_code() == Some(404) => {
                        debug!("Collection {} already deleted remotely", change.entity_id)
                    }
                    Err(err) => return Err(err),
                }
                if let Err(err) = self.collections.purge(change.entity_id) {
                    error!("Failed to purge collection {}: {}", change.entity_id, err);
                }
                self.notifier.notify();
            }
            (SyncEntity::Bookmark, ChangeType::Create, SyncPayload::BookmarkUpsert(req)) => {
                let dto = self.remote.create_bookmark(req).await?;
                let server_id = dto.id;
                let (fav, arch) = (dto.is_favorite, dto.is_archived);

                if server_id != change.entity_id {
                    if let Err(err) = self.bookmarks.relabel_id(change.entity_id, server_id) {
                        error!(
                            "Failed to relabel bookmark {} to server id {}: {}",
                            change.entity_id, server_id, err
                        );
                        return Ok(());
                    }
                }
                self.confirm_bookmark(server_id, Some(fav), Some(arch));
            }
            (SyncEntity::Bookmark, ChangeType::Update, SyncPayload::BookmarkUpsert(req)) => {
                let dto = self.remote.update_bookmark(change.entity_id, req).await?;
                self.confirm_bookmark(
                    change.entity_id,
                    Some(dto.is_favorite),
                    Some(dto.is_archived),
                );
            }
            (
                SyncEntity::Bookmark,
                ChangeType::Update,
                SyncPayload::BookmarkFlags {
                    is_favorite,
                    is_archived,
                },
            ) => {
                if let Some(flag) = is_favorite {
                    self.remote
                        .patch_favorite(change.entity_id, &FavoritePatch { is_favorite: *flag })
                        .await?;
                }
                if let Some(flag) = is_archived {
                    self.remote
                        .patch_archive(change.entity_id, &ArchivePatch { is_archived: *flag })
                        .await?;
                }
                self.confirm_bookmark(change.entity_id, *is_favorite, *is_archived);
            }
            (SyncEntity::Bookmark, ChangeType::Delete, SyncPayload::Tombstone) => {
                match self.remote.delete_bookmark(change.entity_id).await {
                    Ok(()) => {}
                    Err(err) if err.status_code() == Some(404) => {
                        debug!("Bookmark {} already deleted remotely", change.entity_id)
                    }
                    Err(err) => return Err(err),
                }
                if let Err(err) = self.bookmarks.purge(change.entity_id) {
                    error!("Failed to purge bookmark {}: {}", change.entity_id, err);
                }
                self.notifier.notify();
            }
            (entity, change_type, payload) => {
                return Err(ApiError::invalid_request(format!(
                    "Mismatched sync descriptor: {:?} {:?} with {:?}",
                    entity, change_type, payload
                )));
            }
        }

        Ok(())
    }

    fn confirm_collection(&self, id: i64) {
        if let Err(err) = self.collections.mark_synced(id) {
            error!("Failed to mark collection {} synced: {}", id, err);
        }
        self.notifier.notify();
    }

    fn confirm_bookmark(&self, id: i64, server_is_favorite: Option<bool>, server_is_archived: Option<bool>) {
        if let Err(err) = self
            .bookmarks
            .mark_synced(id, server_is_favorite, server_is_archived)
        {
            error!("Failed to mark bookmark {} synced: {}", id, err);
        }
        self.notifier.notify();
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SyncCommand>) {
        while let Some(command) = rx.recv().await {
            let mut acks = Vec::new();
            self.accept(command, &mut acks);

            // Soak up everything already waiting before the drain so a burst
            // of writes becomes one attempt.
            while let Ok(command) = rx.try_recv() {
                self.accept(command, &mut acks);
            }

            self.drain().await;

            for ack in acks {
                let _ = ack.send(());
            }
        }

        // Senders are gone; last chance for anything still queued.
        self.drain().await;
    }

    fn accept(&mut self, command: SyncCommand, acks: &mut Vec<oneshot::Sender<()>>) {
        match command {
            SyncCommand::Push(change) => self.queue.push_back(change),
            SyncCommand::Flush(ack) => acks.push(ack),
        }
    }
}

#[derive(Debug)]
pub struct SyncServiceImpl {
    tx: mpsc::UnboundedSender<SyncCommand>,
    bookmarks: Arc<dyn BookmarkRepository>,
    collections: Arc<dyn CollectionRepository>,
    user_id: String,
}

impl SyncServiceImpl {
    /// Spawn the worker task and return the service handle.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        remote: Arc<dyn RemoteApi>,
        bookmarks: Arc<dyn BookmarkRepository>,
        collections: Arc<dyn CollectionRepository>,
        notifier: ChangeNotifier,
        policy: DrainPolicy,
        max_retries: u32,
        user_id: impl Into<String>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = SyncWorker::new(
            remote,
            Arc::clone(&bookmarks),
            Arc::clone(&collections),
            notifier,
            policy,
            max_retries,
        );
        tokio::spawn(worker.run(rx));

        Self {
            tx,
            bookmarks,
            collections,
            user_id: user_id.into(),
        }
    }

    fn bookmark_change(&self, bookmark: &crate::domain::bookmark::Bookmark) -> SyncChange {
        let change_type = if bookmark.is_local() {
            ChangeType::Create
        } else {
            ChangeType::Update
        };
        SyncChange::new(
            &self.user_id,
            SyncEntity::Bookmark,
            bookmark.id,
            change_type,
            SyncPayload::BookmarkUpsert(mapper::bookmark_to_request(bookmark)),
        )
    }

    fn collection_change(&self, collection: &crate::domain::collection::Collection) -> SyncChange {
        let change_type = if collection.is_local() {
            ChangeType::Create
        } else {
            ChangeType::Update
        };
        SyncChange::new(
            &self.user_id,
            SyncEntity::Collection,
            collection.id,
            change_type,
            SyncPayload::CollectionUpsert(mapper::collection_to_request(collection)),
        )
    }
}

#[async_trait]
impl SyncService for SyncServiceImpl {
    #[instrument(skip(self, change), level = "debug",
                 fields(entity = ?change.entity, change_type = ?change.change, id = change.entity_id))]
    fn enqueue(&self, change: SyncChange) {
        if self.tx.send(SyncCommand::Push(change)).is_err() {
            warn!("Sync worker is gone; change dropped (re-derivable from store flags)");
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn requeue_pending(&self) -> ApplicationResult<usize> {
        let mut queued = 0;

        // Collections first: bookmark creates depend on their collection's
        // server id through the relabel cascade.
        for collection in self.collections.unsynced()? {
            self.enqueue(self.collection_change(&collection));
            queued += 1;
        }
        for collection in self.collections.deleted_unsynced()? {
            if collection.is_local() {
                // Never left the device; nothing to confirm remotely
                self.collections.purge(collection.id)?;
            } else {
                self.enqueue(SyncChange::new(
                    &self.user_id,
                    SyncEntity::Collection,
                    collection.id,
                    ChangeType::Delete,
                    SyncPayload::Tombstone,
                ));
                queued += 1;
            }
        }

        for bookmark in self.bookmarks.unsynced()? {
            self.enqueue(self.bookmark_change(&bookmark));
            queued += 1;
        }
        for bookmark in self.bookmarks.drifted()? {
            self.enqueue(SyncChange::new(
                &self.user_id,
                SyncEntity::Bookmark,
                bookmark.id,
                ChangeType::Update,
                SyncPayload::BookmarkFlags {
                    is_favorite: Some(bookmark.is_favorite),
                    is_archived: Some(bookmark.is_archived),
                },
            ));
            queued += 1;
        }
        for bookmark in self.bookmarks.deleted_unsynced()? {
            if bookmark.is_local() {
                self.bookmarks.purge(bookmark.id)?;
            } else {
                self.enqueue(SyncChange::new(
                    &self.user_id,
                    SyncEntity::Bookmark,
                    bookmark.id,
                    ChangeType::Delete,
                    SyncPayload::Tombstone,
                ));
                queued += 1;
            }
        }

        debug!("Requeued {} pending changes from store flags", queued);
        Ok(queued)
    }

    async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(SyncCommand::Flush(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.await;
    }

    async fn pending_count(&self) -> ApplicationResult<usize> {
        Ok(self.collections.unsynced()?.len()
            + self.collections.deleted_unsynced()?.len()
            + self.bookmarks.unsynced()?.len()
            + self.bookmarks.deleted_unsynced()?.len()
            + self.bookmarks.drifted()?.len())
    }
}
