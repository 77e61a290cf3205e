// src/infrastructure/repositories/sqlite/model.rs
use chrono::NaiveDateTime;
use diesel::{AsChangeset, Identifiable, Insertable, Queryable};

/// Bookmark row as stored. Also Insertable so refresh can replace a row
/// with its server-assigned id.
#[derive(Queryable, Identifiable, Insertable, Clone, Debug)]
#[diesel(table_name = crate::infrastructure::repositories::sqlite::schema::bookmarks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BookmarkRow {
    pub id: i64,
    pub collection_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub favicon_url: Option<String>,
    pub image_url: Option<String>,
    pub is_favorite: bool,
    pub is_archived: bool,
    pub server_is_favorite: bool,
    pub server_is_archived: bool,
    pub tags: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub last_opened: Option<NaiveDateTime>,
    pub open_count: i32,
    pub is_synced: bool,
    pub is_deleted: bool,
    pub is_local_id: bool,
}

/// New bookmark for insertion; the provisional id comes from the database.
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::infrastructure::repositories::sqlite::schema::bookmarks)]
pub struct NewBookmarkRow {
    pub collection_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub favicon_url: Option<String>,
    pub image_url: Option<String>,
    pub is_favorite: bool,
    pub is_archived: bool,
    pub server_is_favorite: bool,
    pub server_is_archived: bool,
    pub tags: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub last_opened: Option<NaiveDateTime>,
    pub open_count: i32,
    pub is_synced: bool,
    pub is_deleted: bool,
    pub is_local_id: bool,
}

/// Content changes for updating a bookmark
#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::infrastructure::repositories::sqlite::schema::bookmarks)]
pub struct BookmarkChanges {
    pub collection_id: i64,
    pub title: String,
    pub url: String,
    #[diesel(treat_none_as_null = true)]
    pub description: Option<String>,
    #[diesel(treat_none_as_null = true)]
    pub favicon_url: Option<String>,
    #[diesel(treat_none_as_null = true)]
    pub image_url: Option<String>,
    pub is_favorite: bool,
    pub is_archived: bool,
    pub tags: String,
    pub updated_at: NaiveDateTime,
    pub is_synced: bool,
}

/// Collection row as stored. Also Insertable for remote-refresh upserts.
#[derive(Queryable, Identifiable, Insertable, Clone, Debug)]
#[diesel(table_name = crate::infrastructure::repositories::sqlite::schema::collections)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CollectionRow {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub item_count: i32,
    pub is_default: bool,
    pub is_shared: bool,
    pub share_url: Option<String>,
    pub share_expiry: Option<NaiveDateTime>,
    pub access_level: String,
    pub sort_order: i32,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub is_synced: bool,
    pub is_local_id: bool,
}

/// New collection for insertion; the provisional id comes from the database.
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::infrastructure::repositories::sqlite::schema::collections)]
pub struct NewCollectionRow {
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub item_count: i32,
    pub is_default: bool,
    pub is_shared: bool,
    pub share_url: Option<String>,
    pub share_expiry: Option<NaiveDateTime>,
    pub access_level: String,
    pub sort_order: i32,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub is_synced: bool,
    pub is_local_id: bool,
}

/// Content and sharing changes for updating a collection
#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::infrastructure::repositories::sqlite::schema::collections)]
pub struct CollectionChanges {
    pub name: String,
    #[diesel(treat_none_as_null = true)]
    pub description: Option<String>,
    pub color: String,
    #[diesel(treat_none_as_null = true)]
    pub icon: Option<String>,
    pub is_shared: bool,
    #[diesel(treat_none_as_null = true)]
    pub share_url: Option<String>,
    #[diesel(treat_none_as_null = true)]
    pub share_expiry: Option<NaiveDateTime>,
    pub access_level: String,
    pub sort_order: i32,
    pub updated_at: NaiveDateTime,
    pub is_synced: bool,
}
