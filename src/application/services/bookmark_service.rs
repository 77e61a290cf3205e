// src/application/services/bookmark_service.rs
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt::Debug;

use crate::application::error::ApplicationResult;
use crate::application::watch::LiveQuery;
use crate::domain::bookmark::Bookmark;
use crate::domain::tag::Tag;

/// Service interface for bookmark operations.
///
/// Reads come from the local store only. Writes land in the local store
/// synchronously, then hatch a change descriptor for the sync worker; a
/// later sync failure never rolls the local write back. `refresh_collection`
/// is the one explicitly remote operation.
#[async_trait]
pub trait BookmarkService: Send + Sync + Debug {
    /// Add a new bookmark to a collection
    async fn create_bookmark(
        &self,
        collection_id: i64,
        url: &str,
        title: &str,
        description: Option<&str>,
        tags: HashSet<Tag>,
    ) -> ApplicationResult<Bookmark>;

    /// Get a bookmark by ID
    async fn get_bookmark(&self, id: i64) -> ApplicationResult<Option<Bookmark>>;

    /// All live bookmarks, newest first
    async fn get_all_bookmarks(&self) -> ApplicationResult<Vec<Bookmark>>;

    /// Live bookmarks of one collection, newest first
    async fn get_bookmarks_by_collection(
        &self,
        collection_id: i64,
    ) -> ApplicationResult<Vec<Bookmark>>;

    async fn get_favorites(&self) -> ApplicationResult<Vec<Bookmark>>;

    async fn get_archived(&self) -> ApplicationResult<Vec<Bookmark>>;

    /// Case-insensitive substring search over title, description and tags
    async fn search_bookmarks(&self, text: &str) -> ApplicationResult<Vec<Bookmark>>;

    /// Update a bookmark's title, description and tags
    async fn update_bookmark(
        &self,
        id: i64,
        title: &str,
        description: Option<&str>,
        tags: HashSet<Tag>,
    ) -> ApplicationResult<Bookmark>;

    /// Atomically flip the favorite flag, returning the updated bookmark
    async fn toggle_favorite(&self, id: i64) -> ApplicationResult<Bookmark>;

    async fn set_favorite(&self, id: i64, flag: bool) -> ApplicationResult<()>;

    async fn set_archived(&self, id: i64, flag: bool) -> ApplicationResult<()>;

    /// Batch variant of `set_favorite`
    async fn set_favorite_many(&self, ids: &[i64], flag: bool) -> ApplicationResult<()>;

    /// Batch variant of `set_archived`
    async fn set_archived_many(&self, ids: &[i64], flag: bool) -> ApplicationResult<()>;

    /// Record that a bookmark was opened; local-only, never synced
    async fn record_open(&self, id: i64) -> ApplicationResult<()>;

    /// Move a bookmark to another collection
    async fn move_to_collection(&self, id: i64, collection_id: i64) -> ApplicationResult<()>;

    /// Delete a bookmark. Returns false when no such bookmark exists.
    async fn delete_bookmark(&self, id: i64) -> ApplicationResult<bool>;

    /// Batch variant of `delete_bookmark`
    async fn delete_bookmarks(&self, ids: &[i64]) -> ApplicationResult<()>;

    /// Live view over all bookmarks; re-yields after every local write
    fn observe_bookmarks(&self) -> LiveQuery<Bookmark>;

    /// Live view over one collection's bookmarks
    fn observe_collection(&self, collection_id: i64) -> LiveQuery<Bookmark>;

    /// Fetch one collection's bookmarks from the backend and reconcile them
    /// into the local store. Returns the number of fetched rows. Failures
    /// are retryable by the caller.
    async fn refresh_collection(&self, collection_id: i64) -> ApplicationResult<usize>;
}
