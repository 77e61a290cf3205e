// src/domain/bookmark.rs
use crate::domain::error::DomainResult;
use crate::domain::tag::Tag;
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use std::collections::HashSet;
use std::fmt;

/// Bookmark domain entity.
///
/// `id == 0` marks an entity that has not been persisted yet. `is_local_id`
/// stays true until the remote create has been confirmed and the provisional
/// id was relabeled to the server-assigned one.
///
/// `server_is_favorite` / `server_is_archived` mirror the last-known-synced
/// server state; drift against the local flags on an otherwise synced record
/// signals a pending metadata-only push.
#[derive(Builder, Clone, PartialEq)]
#[builder(setter(into))]
pub struct Bookmark {
    #[builder(default)]
    pub id: i64,
    pub collection_id: i64,
    pub title: String,
    pub url: String,
    #[builder(default)]
    pub description: Option<String>,
    #[builder(default)]
    pub favicon_url: Option<String>,
    #[builder(default)]
    pub image_url: Option<String>,
    #[builder(default)]
    pub is_favorite: bool,
    #[builder(default)]
    pub is_archived: bool,
    #[builder(default)]
    pub server_is_favorite: bool,
    #[builder(default)]
    pub server_is_archived: bool,
    #[builder(default)]
    pub tags: HashSet<Tag>,
    #[builder(default = "Utc::now()")]
    pub created_at: DateTime<Utc>,
    #[builder(default = "Utc::now()")]
    pub updated_at: DateTime<Utc>,
    #[builder(default)]
    pub last_opened: Option<DateTime<Utc>>,
    #[builder(default)]
    pub open_count: i32,
    #[builder(default)]
    pub is_synced: bool,
    #[builder(default)]
    pub is_deleted: bool,
    #[builder(default = "true")]
    pub is_local_id: bool,
}

impl Bookmark {
    /// Create a new, not-yet-persisted bookmark.
    pub fn new<S: AsRef<str>>(
        collection_id: i64,
        url: S,
        title: S,
        description: Option<S>,
        tags: HashSet<Tag>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: 0,
            collection_id,
            title: title.as_ref().to_string(),
            url: url.as_ref().to_string(),
            description: description.map(|d| d.as_ref().to_string()),
            favicon_url: None,
            image_url: None,
            is_favorite: false,
            is_archived: false,
            server_is_favorite: false,
            server_is_archived: false,
            tags,
            created_at: now,
            updated_at: now,
            last_opened: None,
            open_count: 0,
            is_synced: false,
            is_deleted: false,
            is_local_id: true,
        }
    }

    /// Whether this entity still carries a locally assigned identifier.
    ///
    /// Zero and negative identifiers are always provisional; persisted rows
    /// carry the flag explicitly.
    pub fn is_local(&self) -> bool {
        self.id <= 0 || self.is_local_id
    }

    /// Update title and description, marking the record unsynced.
    pub fn update(&mut self, title: String, description: Option<String>) {
        self.title = title;
        self.description = description;
        self.is_synced = false;
        self.updated_at = Utc::now();
    }

    /// Flip the favorite flag. Flag flips keep `is_synced` untouched: the
    /// drift against `server_is_favorite` is what marks the pending push.
    pub fn set_favorite(&mut self, flag: bool) {
        self.is_favorite = flag;
        self.updated_at = Utc::now();
    }

    pub fn set_archived(&mut self, flag: bool) {
        self.is_archived = flag;
        self.updated_at = Utc::now();
    }

    /// Record that the bookmark was opened. Open bumps are local-only and do
    /// not dirty the sync state.
    pub fn record_open(&mut self) {
        self.open_count += 1;
        let now = Utc::now();
        self.last_opened = Some(now);
        self.updated_at = now;
    }

    /// Move to another collection, marking the record unsynced.
    pub fn move_to(&mut self, collection_id: i64) {
        self.collection_id = collection_id;
        self.is_synced = false;
        self.updated_at = Utc::now();
    }

    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
        self.is_synced = false;
        self.updated_at = Utc::now();
    }

    /// Fold in the confirmed server state after a successful push.
    pub fn mark_synced(&mut self, server_is_favorite: bool, server_is_archived: bool) {
        self.server_is_favorite = server_is_favorite;
        self.server_is_archived = server_is_archived;
        self.is_synced = true;
        self.is_local_id = false;
        self.updated_at = Utc::now();
    }

    /// A synced record whose flags drifted from the server copy needs a
    /// metadata-only push.
    pub fn needs_flag_push(&self) -> bool {
        self.is_synced
            && !self.is_deleted
            && (self.is_favorite != self.server_is_favorite
                || self.is_archived != self.server_is_archived)
    }

    /// Add a tag to the bookmark
    pub fn add_tag(&mut self, tag: Tag) -> DomainResult<()> {
        self.tags.insert(tag);
        self.is_synced = false;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a tag from the bookmark
    pub fn remove_tag(&mut self, tag: &Tag) -> DomainResult<()> {
        if !self.tags.remove(tag) {
            return Err(crate::domain::error::DomainError::TagOperationFailed(
                format!("Tag '{}' not found on bookmark", tag),
            ));
        }

        self.is_synced = false;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Set all tags at once (replacing existing tags)
    pub fn set_tags(&mut self, tags: HashSet<Tag>) {
        self.tags = tags;
        self.is_synced = false;
        self.updated_at = Utc::now();
    }

    /// Get formatted tag string in the format ",tag1,tag2,"
    pub fn formatted_tags(&self) -> String {
        Tag::format_tags(&self.tags)
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            if self.id == 0 {
                "New".to_string()
            } else {
                self.id.to_string()
            },
            self.title,
            self.url,
            Tag::format_tags(&self.tags)
        )
    }
}

impl fmt::Debug for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bookmark")
            .field("id", &self.id)
            .field("collection_id", &self.collection_id)
            .field("title", &self.title)
            .field("url", &self.url)
            .field("tags", &self.tags)
            .field("is_favorite", &self.is_favorite)
            .field("is_archived", &self.is_archived)
            .field("server_is_favorite", &self.server_is_favorite)
            .field("server_is_archived", &self.server_is_archived)
            .field("open_count", &self.open_count)
            .field("is_synced", &self.is_synced)
            .field("is_deleted", &self.is_deleted)
            .field("is_local_id", &self.is_local_id)
            .finish()
    }
}
