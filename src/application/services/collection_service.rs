// src/application/services/collection_service.rs
use async_trait::async_trait;
use std::fmt::Debug;

use crate::application::error::ApplicationResult;
use crate::application::watch::LiveQuery;
use crate::domain::collection::{AccessLevel, Collection};

/// Service interface for collection operations.
///
/// Same split as bookmarks: reads and writes go through the local store,
/// with change descriptors hatched for the sync worker. The sharing/follow
/// operations that need a server round trip (`follow_shared`,
/// `unfollow_shared`, `list_shared_with_me`, `refresh_collections`) are
/// explicitly remote and surface retryable errors.
#[async_trait]
pub trait CollectionService: Send + Sync + Debug {
    /// Create a collection for the configured user
    async fn create_collection(
        &self,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
        icon: Option<&str>,
    ) -> ApplicationResult<Collection>;

    /// Get a collection by ID
    async fn get_collection(&self, id: i64) -> ApplicationResult<Option<Collection>>;

    /// The user's live collections, ordered by sort order, then name
    async fn get_collections(&self) -> ApplicationResult<Vec<Collection>>;

    /// The user's default collection, if any
    async fn get_default_collection(&self) -> ApplicationResult<Option<Collection>>;

    /// Update name, description, color and icon
    async fn update_collection(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        color: &str,
        icon: Option<&str>,
    ) -> ApplicationResult<Collection>;

    /// Make one collection the default, clearing any previous default
    async fn set_default_collection(&self, id: i64) -> ApplicationResult<()>;

    /// Persist a new display order; position in the slice becomes the
    /// collection's sort order
    async fn reorder_collections(&self, ordered_ids: &[i64]) -> ApplicationResult<()>;

    /// Start sharing a collection. The share URL is assigned by the server
    /// and lands in the local row once the sync worker has pushed the change.
    async fn share_collection(
        &self,
        id: i64,
        access_level: AccessLevel,
        expiry_days: Option<i64>,
    ) -> ApplicationResult<Collection>;

    /// Stop sharing a collection
    async fn unshare_collection(&self, id: i64) -> ApplicationResult<Collection>;

    /// Collections other users shared with this one; explicit remote fetch
    async fn list_shared_with_me(&self) -> ApplicationResult<Vec<Collection>>;

    /// Follow a shared collection by its share URL; the followed collection
    /// is written into the local store
    async fn follow_shared(&self, share_url: &str) -> ApplicationResult<Collection>;

    /// Stop following a shared collection and drop the local copy
    async fn unfollow_shared(&self, id: i64) -> ApplicationResult<()>;

    /// Delete a collection and its bookmarks. Returns false when no such
    /// collection exists.
    async fn delete_collection(&self, id: i64) -> ApplicationResult<bool>;

    /// Live view over the user's collections
    fn observe_collections(&self) -> LiveQuery<Collection>;

    /// Fetch the user's collections from the backend and reconcile them into
    /// the local store. Returns the number of fetched rows.
    async fn refresh_collections(&self) -> ApplicationResult<usize>;
}
