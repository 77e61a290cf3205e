// src/domain/collection.rs
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use std::fmt;

pub const DEFAULT_COLOR: &str = "#6366F1";

/// Access level for shared collections. Stored and transmitted as a plain
/// string; parsing is lenient and falls back to `View`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessLevel {
    #[default]
    View,
    Edit,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::View => "view",
            AccessLevel::Edit => "edit",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "edit" => AccessLevel::Edit,
            _ => AccessLevel::View,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sharing state applied to a collection by the owner.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareSettings {
    pub is_shared: bool,
    pub access_level: AccessLevel,
    pub share_url: Option<String>,
    pub share_expiry: Option<DateTime<Utc>>,
    pub expiry_days: Option<i64>,
}

/// Collection domain entity: a named, user-owned grouping of bookmarks.
///
/// At most one collection per user carries `is_default = true`; the store
/// clears prior defaults in the same transaction that sets a new one.
#[derive(Builder, Clone, PartialEq)]
#[builder(setter(into))]
pub struct Collection {
    #[builder(default)]
    pub id: i64,
    pub user_id: String,
    pub name: String,
    #[builder(default)]
    pub description: Option<String>,
    #[builder(default = "DEFAULT_COLOR.to_string()")]
    pub color: String,
    #[builder(default)]
    pub icon: Option<String>,
    #[builder(default = "Utc::now()")]
    pub created_at: DateTime<Utc>,
    #[builder(default = "Utc::now()")]
    pub updated_at: DateTime<Utc>,
    #[builder(default)]
    pub item_count: i32,
    #[builder(default)]
    pub is_default: bool,
    #[builder(default)]
    pub is_shared: bool,
    #[builder(default)]
    pub share_url: Option<String>,
    #[builder(default)]
    pub share_expiry: Option<DateTime<Utc>>,
    #[builder(default)]
    pub access_level: AccessLevel,
    #[builder(default)]
    pub sort_order: i32,
    #[builder(default)]
    pub is_deleted: bool,
    #[builder(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[builder(default)]
    pub is_synced: bool,
    #[builder(default = "true")]
    pub is_local_id: bool,
}

impl Collection {
    /// Create a new, not-yet-persisted collection.
    pub fn new<S: AsRef<str>>(
        user_id: S,
        name: S,
        description: Option<S>,
        color: Option<S>,
        icon: Option<S>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: 0,
            user_id: user_id.as_ref().to_string(),
            name: name.as_ref().trim().to_string(),
            description: description.map(|d| d.as_ref().trim().to_string()),
            color: color
                .map(|c| c.as_ref().to_string())
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            icon: icon.map(|i| i.as_ref().to_string()),
            created_at: now,
            updated_at: now,
            item_count: 0,
            is_default: false,
            is_shared: false,
            share_url: None,
            share_expiry: None,
            access_level: AccessLevel::View,
            sort_order: 0,
            is_deleted: false,
            deleted_at: None,
            is_synced: false,
            is_local_id: true,
        }
    }

    /// Whether this entity still carries a locally assigned identifier.
    pub fn is_local(&self) -> bool {
        self.id <= 0 || self.is_local_id
    }

    /// Update name, description, color and icon, marking the record unsynced.
    pub fn update(
        &mut self,
        name: String,
        description: Option<String>,
        color: String,
        icon: Option<String>,
    ) {
        self.name = name.trim().to_string();
        self.description = description.map(|d| d.trim().to_string());
        self.color = color;
        self.icon = icon;
        self.is_synced = false;
        self.updated_at = Utc::now();
    }

    /// Apply sharing settings, marking the record unsynced.
    pub fn apply_sharing(&mut self, settings: &ShareSettings) {
        self.is_shared = settings.is_shared;
        self.access_level = settings.access_level;
        self.share_url = settings.share_url.clone();
        self.share_expiry = settings.share_expiry;
        self.is_synced = false;
        self.updated_at = Utc::now();
    }

    pub fn soft_delete(&mut self) {
        let now = Utc::now();
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.is_synced = false;
        self.updated_at = now;
    }

    pub fn mark_synced(&mut self) {
        self.is_synced = true;
        self.is_local_id = false;
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} items)",
            if self.id == 0 {
                "New".to_string()
            } else {
                self.id.to_string()
            },
            self.name,
            self.item_count
        )
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("name", &self.name)
            .field("item_count", &self.item_count)
            .field("is_default", &self.is_default)
            .field("is_shared", &self.is_shared)
            .field("sort_order", &self.sort_order)
            .field("is_synced", &self.is_synced)
            .field("is_deleted", &self.is_deleted)
            .field("is_local_id", &self.is_local_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_collection_trims_and_defaults() {
        let collection = Collection::new("user-1", " Reading ", Some(" long reads "), None, None);

        assert_eq!(collection.name, "Reading");
        assert_eq!(collection.description.as_deref(), Some("long reads"));
        assert_eq!(collection.color, DEFAULT_COLOR);
        assert!(collection.is_local());
        assert!(!collection.is_synced);
    }

    #[test]
    fn test_access_level_parse_is_lenient() {
        assert_eq!(AccessLevel::parse("edit"), AccessLevel::Edit);
        assert_eq!(AccessLevel::parse("EDIT"), AccessLevel::Edit);
        assert_eq!(AccessLevel::parse("view"), AccessLevel::View);
        assert_eq!(AccessLevel::parse("garbage"), AccessLevel::View);
    }

    #[test]
    fn test_soft_delete_sets_timestamp() {
        let mut collection = Collection::new("user-1", "Reading", None, None, None);
        collection.mark_synced();

        collection.soft_delete();
        assert!(collection.is_deleted);
        assert!(collection.deleted_at.is_some());
        assert!(!collection.is_synced);
    }

    #[test]
    fn test_apply_sharing() {
        let mut collection = Collection::new("user-1", "Reading", None, None, None);
        collection.apply_sharing(&ShareSettings {
            is_shared: true,
            access_level: AccessLevel::Edit,
            share_url: Some("https://share.example.com/abc".to_string()),
            share_expiry: None,
            expiry_days: Some(7),
        });

        assert!(collection.is_shared);
        assert_eq!(collection.access_level, AccessLevel::Edit);
        assert_eq!(
            collection.share_url.as_deref(),
            Some("https://share.example.com/abc")
        );
    }
}
