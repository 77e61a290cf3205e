// src/application/services/bookmark_service_impl.rs
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::bookmark_service::BookmarkService;
use crate::application::services::sync_service::{
    ChangeType, SyncChange, SyncEntity, SyncPayload, SyncService,
};
use crate::application::watch::{ChangeNotifier, LiveQuery};
use crate::domain::bookmark::Bookmark;
use crate::domain::repositories::bookmark_repository::BookmarkRepository;
use crate::domain::repositories::collection_repository::CollectionRepository;
use crate::domain::tag::Tag;
use crate::infrastructure::api::mapper;
use crate::infrastructure::api::remote::RemoteApi;

#[derive(Debug)]
pub struct BookmarkServiceImpl {
    bookmarks: Arc<dyn BookmarkRepository>,
    collections: Arc<dyn CollectionRepository>,
    remote: Arc<dyn RemoteApi>,
    sync: Arc<dyn SyncService>,
    notifier: ChangeNotifier,
    user_id: String,
}

impl BookmarkServiceImpl {
    pub fn new(
        bookmarks: Arc<dyn BookmarkRepository>,
        collections: Arc<dyn CollectionRepository>,
        remote: Arc<dyn RemoteApi>,
        sync: Arc<dyn SyncService>,
        notifier: ChangeNotifier,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            bookmarks,
            collections,
            remote,
            sync,
            notifier,
            user_id: user_id.into(),
        }
    }

    fn validate_url(url: &str) -> ApplicationResult<()> {
        let parsed = Url::parse(url)
            .map_err(|e| ApplicationError::validation("url", format!("Not a valid URL: {}", e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ApplicationError::validation(
                "url",
                "URL must use the http or https scheme",
            ));
        }
        Ok(())
    }

    fn validate_title(title: &str) -> ApplicationResult<()> {
        if title.trim().is_empty() {
            return Err(ApplicationError::validation("title", "Title cannot be empty"));
        }
        Ok(())
    }

    fn enqueue_upsert(&self, bookmark: &Bookmark) {
        let change_type = if bookmark.is_local() {
            ChangeType::Create
        } else {
            ChangeType::Update
        };
        self.sync.enqueue(SyncChange::new(
            &self.user_id,
            SyncEntity::Bookmark,
            bookmark.id,
            change_type,
            SyncPayload::BookmarkUpsert(mapper::bookmark_to_request(bookmark)),
        ));
    }

    /// Flag flips on records the server already knows push a metadata-only
    /// patch. Records still on a provisional id are skipped: their flags are
    /// picked up by the drift sweep once the create has been confirmed.
    fn enqueue_flags(&self, bookmark: &Bookmark) {
        if bookmark.is_local() {
            return;
        }
        self.sync.enqueue(SyncChange::new(
            &self.user_id,
            SyncEntity::Bookmark,
            bookmark.id,
            ChangeType::Update,
            SyncPayload::BookmarkFlags {
                is_favorite: Some(bookmark.is_favorite),
                is_archived: Some(bookmark.is_archived),
            },
        ));
    }

    fn enqueue_tombstone(&self, id: i64) {
        self.sync.enqueue(SyncChange::new(
            &self.user_id,
            SyncEntity::Bookmark,
            id,
            ChangeType::Delete,
            SyncPayload::Tombstone,
        ));
    }

    fn recount(&self, collection_id: i64) -> ApplicationResult<()> {
        self.collections.recount_items(collection_id)?;
        Ok(())
    }
}

#[async_trait]
impl BookmarkService for BookmarkServiceImpl {
    #[instrument(skip(self, tags), level = "debug", fields(url = %url, collection_id = collection_id))]
    async fn create_bookmark(
        &self,
        collection_id: i64,
        url: &str,
        title: &str,
        description: Option<&str>,
        tags: HashSet<Tag>,
    ) -> ApplicationResult<Bookmark> {
        Self::validate_url(url)?;
        Self::validate_title(title)?;

        // URL uniqueness is the store's constraint; a live duplicate fails
        // the insert with DomainError::DuplicateUrl.
        let mut bookmark = Bookmark::new(collection_id, url, title.trim(), description, tags);
        self.bookmarks.add(&mut bookmark)?;

        self.recount(collection_id)?;
        self.notifier.notify();
        self.enqueue_upsert(&bookmark);

        debug!("Created bookmark {} in collection {}", bookmark.id, collection_id);
        Ok(bookmark)
    }

    async fn get_bookmark(&self, id: i64) -> ApplicationResult<Option<Bookmark>> {
        Ok(self.bookmarks.get_by_id(id)?)
    }

    async fn get_all_bookmarks(&self) -> ApplicationResult<Vec<Bookmark>> {
        Ok(self.bookmarks.list_all()?)
    }

    async fn get_bookmarks_by_collection(
        &self,
        collection_id: i64,
    ) -> ApplicationResult<Vec<Bookmark>> {
        Ok(self.bookmarks.list_by_collection(collection_id)?)
    }

    async fn get_favorites(&self) -> ApplicationResult<Vec<Bookmark>> {
        Ok(self.bookmarks.list_favorites()?)
    }

    async fn get_archived(&self) -> ApplicationResult<Vec<Bookmark>> {
        Ok(self.bookmarks.list_archived()?)
    }

    #[instrument(skip(self), level = "debug")]
    async fn search_bookmarks(&self, text: &str) -> ApplicationResult<Vec<Bookmark>> {
        Ok(self.bookmarks.search(text)?)
    }

    #[instrument(skip(self, tags), level = "debug")]
    async fn update_bookmark(
        &self,
        id: i64,
        title: &str,
        description: Option<&str>,
        tags: HashSet<Tag>,
    ) -> ApplicationResult<Bookmark> {
        Self::validate_title(title)?;

        let mut bookmark = self
            .bookmarks
            .get_by_id(id)?
            .ok_or(crate::domain::error::DomainError::BookmarkNotFound(id))?;

        bookmark.update(title.trim().to_string(), description.map(|d| d.to_string()));
        bookmark.set_tags(tags);
        self.bookmarks.update(&bookmark)?;

        self.notifier.notify();
        self.enqueue_upsert(&bookmark);
        Ok(bookmark)
    }

    #[instrument(skip(self), level = "debug")]
    async fn toggle_favorite(&self, id: i64) -> ApplicationResult<Bookmark> {
        let bookmark = self.bookmarks.toggle_favorite(id)?;

        self.notifier.notify();
        self.enqueue_flags(&bookmark);
        Ok(bookmark)
    }

    async fn set_favorite(&self, id: i64, flag: bool) -> ApplicationResult<()> {
        self.bookmarks.set_favorite(id, flag)?;
        self.notifier.notify();

        if let Some(bookmark) = self.bookmarks.get_by_id(id)? {
            self.enqueue_flags(&bookmark);
        }
        Ok(())
    }

    async fn set_archived(&self, id: i64, flag: bool) -> ApplicationResult<()> {
        self.bookmarks.set_archived(id, flag)?;
        self.notifier.notify();

        if let Some(bookmark) = self.bookmarks.get_by_id(id)? {
            self.enqueue_flags(&bookmark);
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug", fields(count = ids.len()))]
    async fn set_favorite_many(&self, ids: &[i64], flag: bool) -> ApplicationResult<()> {
        self.bookmarks.set_favorite_many(ids, flag)?;
        self.notifier.notify();

        for id in ids {
            if let Some(bookmark) = self.bookmarks.get_by_id(*id)? {
                self.enqueue_flags(&bookmark);
            }
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug", fields(count = ids.len()))]
    async fn set_archived_many(&self, ids: &[i64], flag: bool) -> ApplicationResult<()> {
        self.bookmarks.set_archived_many(ids, flag)?;
        self.notifier.notify();

        for id in ids {
            if let Some(bookmark) = self.bookmarks.get_by_id(*id)? {
                self.enqueue_flags(&bookmark);
            }
        }
        Ok(())
    }

    async fn record_open(&self, id: i64) -> ApplicationResult<()> {
        self.bookmarks.record_open(id)?;
        self.notifier.notify();
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn move_to_collection(&self, id: i64, collection_id: i64) -> ApplicationResult<()> {
        let bookmark = self
            .bookmarks
            .get_by_id(id)?
            .ok_or(crate::domain::error::DomainError::BookmarkNotFound(id))?;
        let previous_collection = bookmark.collection_id;

        self.bookmarks.move_to_collection(id, collection_id)?;
        self.recount(previous_collection)?;
        self.recount(collection_id)?;
        self.notifier.notify();

        if let Some(moved) = self.bookmarks.get_by_id(id)? {
            self.enqueue_upsert(&moved);
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_bookmark(&self, id: i64) -> ApplicationResult<bool> {
        let Some(bookmark) = self.bookmarks.get_by_id_any(id)? else {
            return Ok(false);
        };

        if bookmark.is_local() {
            // Never acknowledged by the server; nothing to confirm remotely
            self.bookmarks.purge(id)?;
        } else {
            self.bookmarks.soft_delete(id)?;
            self.enqueue_tombstone(id);
        }

        self.recount(bookmark.collection_id)?;
        self.notifier.notify();
        Ok(true)
    }

    #[instrument(skip(self), level = "debug", fields(count = ids.len()))]
    async fn delete_bookmarks(&self, ids: &[i64]) -> ApplicationResult<()> {
        for id in ids {
            self.delete_bookmark(*id).await?;
        }
        Ok(())
    }

    fn observe_bookmarks(&self) -> LiveQuery<Bookmark> {
        let repository = Arc::clone(&self.bookmarks);
        LiveQuery::new(&self.notifier, move || {
            repository.list_all().map_err(Into::into)
        })
    }

    fn observe_collection(&self, collection_id: i64) -> LiveQuery<Bookmark> {
        let repository = Arc::clone(&self.bookmarks);
        LiveQuery::new(&self.notifier, move || {
            repository
                .list_by_collection(collection_id)
                .map_err(Into::into)
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn refresh_collection(&self, collection_id: i64) -> ApplicationResult<usize> {
        let dtos = self.remote.list_bookmarks(collection_id).await?;
        let fetched = dtos.len();

        let local = self.bookmarks.list_by_collection(collection_id)?;
        let remote_ids: std::collections::HashSet<i64> = dtos.iter().map(|dto| dto.id).collect();

        for dto in dtos {
            // Local edits that have not been pushed yet win over the server
            // copy; they are still queued for sync.
            let keep_local = self
                .bookmarks
                .get_by_id_any(dto.id)?
                .map(|existing| !existing.is_synced)
                .unwrap_or(false);
            if keep_local {
                continue;
            }
            self.bookmarks.replace_from_remote(&mapper::bookmark_from_dto(dto))?;
        }

        // Synced rows the server no longer has are gone for good
        for bookmark in &local {
            if bookmark.is_synced && !bookmark.is_local() && !remote_ids.contains(&bookmark.id) {
                self.bookmarks.purge(bookmark.id)?;
            }
        }

        self.recount(collection_id)?;
        self.notifier.notify();

        debug!("Refreshed {} bookmarks for collection {}", fetched, collection_id);
        Ok(fetched)
    }
}
