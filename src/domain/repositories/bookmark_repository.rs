// src/domain/repositories/bookmark_repository.rs

use crate::domain::bookmark::Bookmark;
use crate::domain::error::DomainError;

/// Repository trait for bookmark persistence operations.
///
/// Methods speak in domain terms and hide the storage engine. Reads exclude
/// soft-deleted rows unless stated otherwise; list operations return rows
/// newest-first by creation time.
pub trait BookmarkRepository: std::fmt::Debug + Send + Sync {
    /// Get a live bookmark by its ID
    fn get_by_id(&self, id: i64) -> Result<Option<Bookmark>, DomainError>;

    /// Get a bookmark by ID regardless of its deletion flag
    fn get_by_id_any(&self, id: i64) -> Result<Option<Bookmark>, DomainError>;

    /// Get a live bookmark by its URL
    fn get_by_url(&self, url: &str) -> Result<Option<Bookmark>, DomainError>;

    /// All live bookmarks
    fn list_all(&self) -> Result<Vec<Bookmark>, DomainError>;

    /// Live bookmarks of one collection
    fn list_by_collection(&self, collection_id: i64) -> Result<Vec<Bookmark>, DomainError>;

    /// Live favorite bookmarks
    fn list_favorites(&self) -> Result<Vec<Bookmark>, DomainError>;

    /// Live archived bookmarks
    fn list_archived(&self) -> Result<Vec<Bookmark>, DomainError>;

    /// Case-insensitive substring search over title, description and tag
    /// text, scoped to live rows, newest-first.
    fn search(&self, text: &str) -> Result<Vec<Bookmark>, DomainError>;

    /// Insert a new bookmark and assign its provisional id. A live row with
    /// the same URL fails with `DomainError::DuplicateUrl`.
    fn add(&self, bookmark: &mut Bookmark) -> Result<(), DomainError>;

    /// Update an existing bookmark's content fields
    fn update(&self, bookmark: &Bookmark) -> Result<(), DomainError>;

    /// Atomically flip the favorite flag, returning the updated row
    fn toggle_favorite(&self, id: i64) -> Result<Bookmark, DomainError>;

    /// Set the favorite flag with a single statement
    fn set_favorite(&self, id: i64, flag: bool) -> Result<(), DomainError>;

    /// Set the archived flag with a single statement
    fn set_archived(&self, id: i64, flag: bool) -> Result<(), DomainError>;

    /// Batch variant of `set_favorite`
    fn set_favorite_many(&self, ids: &[i64], flag: bool) -> Result<(), DomainError>;

    /// Batch variant of `set_archived`
    fn set_archived_many(&self, ids: &[i64], flag: bool) -> Result<(), DomainError>;

    /// Bump the open counter and stamp `last_opened`
    fn record_open(&self, id: i64) -> Result<(), DomainError>;

    /// Reassign a bookmark to another collection
    fn move_to_collection(&self, id: i64, collection_id: i64) -> Result<(), DomainError>;

    /// Mark a bookmark as deleted without removing the row
    fn soft_delete(&self, id: i64) -> Result<bool, DomainError>;

    /// Batch variant of `soft_delete`
    fn soft_delete_many(&self, ids: &[i64]) -> Result<(), DomainError>;

    /// Physically remove a row; only called after the remote delete was
    /// confirmed, or for rows that never left this device.
    fn purge(&self, id: i64) -> Result<bool, DomainError>;

    /// Relabel a provisional id to the server-assigned one and clear
    /// `is_local_id`, in one transaction.
    fn relabel_id(&self, old_id: i64, new_id: i64) -> Result<(), DomainError>;

    /// Store confirmed server flag state, set `is_synced` and clear
    /// `is_local_id`. `None` leaves the respective shadow field untouched.
    fn mark_synced(
        &self,
        id: i64,
        server_is_favorite: Option<bool>,
        server_is_archived: Option<bool>,
    ) -> Result<(), DomainError>;

    /// Upsert a row with server state during an explicit refresh
    fn replace_from_remote(&self, bookmark: &Bookmark) -> Result<(), DomainError>;

    /// Live rows that were never pushed (`is_synced = false`)
    fn unsynced(&self) -> Result<Vec<Bookmark>, DomainError>;

    /// Soft-deleted rows whose deletion was not confirmed yet
    fn deleted_unsynced(&self) -> Result<Vec<Bookmark>, DomainError>;

    /// Synced live rows whose favorite/archived flags drifted from the
    /// server shadow copy
    fn drifted(&self) -> Result<Vec<Bookmark>, DomainError>;
}
