// src/domain/repositories/collection_repository.rs

use crate::domain::collection::Collection;
use crate::domain::error::DomainError;

/// Repository trait for collection persistence operations.
///
/// Reads exclude soft-deleted rows unless stated otherwise; lists are
/// ordered by `sort_order`, then name.
pub trait CollectionRepository: std::fmt::Debug + Send + Sync {
    /// Get a live collection by its ID
    fn get_by_id(&self, id: i64) -> Result<Option<Collection>, DomainError>;

    /// Get a collection by ID regardless of its deletion flag
    fn get_by_id_any(&self, id: i64) -> Result<Option<Collection>, DomainError>;

    /// Live collections of one user
    fn list_by_user(&self, user_id: &str) -> Result<Vec<Collection>, DomainError>;

    /// Live shared collections of one user
    fn list_shared(&self, user_id: &str) -> Result<Vec<Collection>, DomainError>;

    /// Find a live collection by its share URL
    fn get_by_share_url(&self, share_url: &str) -> Result<Option<Collection>, DomainError>;

    /// The user's current default collection, if any
    fn get_default(&self, user_id: &str) -> Result<Option<Collection>, DomainError>;

    /// Insert a new collection and assign its provisional id. A live row
    /// with the same name for the user fails with
    /// `DomainError::DuplicateName`.
    fn add(&self, collection: &mut Collection) -> Result<(), DomainError>;

    /// Update an existing collection
    fn update(&self, collection: &Collection) -> Result<(), DomainError>;

    /// Make one collection the user's default, clearing every other default
    /// in the same transaction. Returns the ids whose flag was cleared.
    fn set_default(&self, user_id: &str, id: i64) -> Result<Vec<i64>, DomainError>;

    /// Update the display position
    fn set_sort_order(&self, id: i64, sort_order: i32) -> Result<(), DomainError>;

    /// Recompute the denormalized live-bookmark count
    fn recount_items(&self, id: i64) -> Result<(), DomainError>;

    /// Mark a collection as deleted, stamping `deleted_at`
    fn soft_delete(&self, id: i64) -> Result<bool, DomainError>;

    /// Physically remove a row; dependent bookmarks go with it (FK cascade).
    /// Only called after the remote delete was confirmed, or for rows that
    /// never left this device.
    fn purge(&self, id: i64) -> Result<bool, DomainError>;

    /// Relabel a provisional id to the server-assigned one, cascading to
    /// dependent bookmark foreign keys and clearing `is_local_id`, in one
    /// transaction.
    fn relabel_id(&self, old_id: i64, new_id: i64) -> Result<(), DomainError>;

    /// Set `is_synced` and clear `is_local_id` after a confirmed push
    fn mark_synced(&self, id: i64) -> Result<(), DomainError>;

    /// Upsert a row with server state during an explicit refresh
    fn replace_from_remote(&self, collection: &Collection) -> Result<(), DomainError>;

    /// Live rows that were never pushed (`is_synced = false`)
    fn unsynced(&self) -> Result<Vec<Collection>, DomainError>;

    /// Soft-deleted rows whose deletion was not confirmed yet
    fn deleted_unsynced(&self) -> Result<Vec<Collection>, DomainError>;
}
