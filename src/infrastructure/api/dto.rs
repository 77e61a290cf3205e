// src/infrastructure/api/dto.rs
//! Wire representations for the bookmark backend. Keys are snake_case,
//! instants are ISO-8601 (chrono's serde encoding).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkDto {
    pub id: i64,
    pub collection_id: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub favicon_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_opened: Option<DateTime<Utc>>,
    #[serde(default)]
    pub open_count: i32,
}

/// Request body for creating or updating a bookmark. Favorite/archived
/// state travels through the dedicated patch endpoints, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkRequest {
    pub collection_id: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoritePatch {
    pub is_favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivePatch {
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDto {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub item_count: i32,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub share_url: Option<String>,
    #[serde(default)]
    pub share_expiry: Option<DateTime<Utc>>,
    pub access_level: String,
    #[serde(default)]
    pub sort_order: i32,
}

/// Request body for creating or updating a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_shared: bool,
    pub access_level: String,
}

/// Request body for sharing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharingRequest {
    pub is_shared: bool,
    pub access_level: String,
    #[serde(default)]
    pub expiry_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareResponse {
    pub share_url: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Error body the backend returns for non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
}
