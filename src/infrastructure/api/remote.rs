// src/infrastructure/api/remote.rs
//! Contract of the remote bookmark backend. The backend itself is an
//! external collaborator; the crate only consumes this interface.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::infrastructure::api::dto::{
    ArchivePatch, BookmarkDto, BookmarkRequest, CollectionDto, CollectionRequest, FavoritePatch,
    ShareResponse, SharingRequest,
};
use crate::infrastructure::api::error::ApiResult;

#[async_trait]
pub trait RemoteApi: Send + Sync + Debug {
    // Collections

    async fn list_collections(&self, user_id: &str) -> ApiResult<Vec<CollectionDto>>;

    async fn get_collection(&self, id: i64) -> ApiResult<CollectionDto>;

    /// Create a collection; the response carries the server-assigned id.
    async fn create_collection(
        &self,
        user_id: &str,
        request: &CollectionRequest,
    ) -> ApiResult<CollectionDto>;

    async fn update_collection(
        &self,
        id: i64,
        request: &CollectionRequest,
    ) -> ApiResult<CollectionDto>;

    async fn delete_collection(&self, id: i64) -> ApiResult<()>;

    /// Start sharing a collection; the response carries the share URL.
    async fn share_collection(&self, id: i64, request: &SharingRequest)
        -> ApiResult<ShareResponse>;

    /// Change sharing settings of an already shared collection.
    async fn update_sharing(&self, id: i64, request: &SharingRequest) -> ApiResult<ShareResponse>;

    async fn list_shared_with_me(&self, user_id: &str) -> ApiResult<Vec<CollectionDto>>;

    /// Follow a collection someone else shared, by its share URL.
    async fn follow_shared(&self, share_url: &str) -> ApiResult<CollectionDto>;

    async fn unfollow_shared(&self, id: i64) -> ApiResult<()>;

    // Bookmarks

    async fn list_bookmarks(&self, collection_id: i64) -> ApiResult<Vec<BookmarkDto>>;

    async fn get_bookmark(&self, id: i64) -> ApiResult<BookmarkDto>;

    /// Create a bookmark; the response carries the server-assigned id.
    async fn create_bookmark(&self, request: &BookmarkRequest) -> ApiResult<BookmarkDto>;

    async fn update_bookmark(&self, id: i64, request: &BookmarkRequest) -> ApiResult<BookmarkDto>;

    async fn patch_favorite(&self, id: i64, patch: &FavoritePatch) -> ApiResult<BookmarkDto>;

    async fn patch_archive(&self, id: i64, patch: &ArchivePatch) -> ApiResult<BookmarkDto>;

    async fn delete_bookmark(&self, id: i64) -> ApiResult<()>;

    async fn search_bookmarks(&self, query: &str) -> ApiResult<Vec<BookmarkDto>>;
}
