// src/infrastructure/repositories/sqlite/bookmark_repository.rs

use chrono::{DateTime, Utc};
use diesel::dsl::not;
use diesel::prelude::*;
use tracing::instrument;

use super::connection::{ConnectionPool, PooledConnection};
use super::error::{SqliteRepositoryError, SqliteResult};
use crate::domain::bookmark::Bookmark;
use crate::domain::error::DomainError;
use crate::domain::tag::Tag;
use crate::infrastructure::repositories::sqlite::model::{
    BookmarkChanges, BookmarkRow, NewBookmarkRow,
};
use crate::infrastructure::repositories::sqlite::schema::bookmarks;
use crate::infrastructure::repositories::sqlite::schema::bookmarks::dsl;

type BoxedBookmarkQuery = bookmarks::BoxedQuery<'static, diesel::sqlite::Sqlite>;

#[derive(Clone, Debug)]
pub struct SqliteBookmarkRepository {
    pool: ConnectionPool,
}

impl SqliteBookmarkRepository {
    /// Create a new SQLite repository with the provided connection pool
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    #[instrument(skip_all, level = "trace")]
    pub fn get_connection(&self) -> SqliteResult<PooledConnection> {
        self.pool
            .get()
            .map_err(|e| SqliteRepositoryError::ConnectionPoolError(e.to_string()))
    }

    /// Convert a database row to a domain entity.
    ///
    /// Total by construction: stored tag fragments that fail validation are
    /// dropped rather than failing the conversion.
    #[instrument(skip_all, level = "trace")]
    fn to_domain_model(row: BookmarkRow) -> Bookmark {
        Bookmark {
            id: row.id,
            collection_id: row.collection_id,
            title: row.title,
            url: row.url,
            description: row.description,
            favicon_url: row.favicon_url,
            image_url: row.image_url,
            is_favorite: row.is_favorite,
            is_archived: row.is_archived,
            server_is_favorite: row.server_is_favorite,
            server_is_archived: row.server_is_archived,
            tags: Tag::parse_stored(&row.tags),
            created_at: DateTime::<Utc>::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::<Utc>::from_naive_utc_and_offset(row.updated_at, Utc),
            last_opened: row
                .last_opened
                .map(|ts| DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc)),
            open_count: row.open_count,
            is_synced: row.is_synced,
            is_deleted: row.is_deleted,
            is_local_id: row.is_local_id,
        }
    }

    /// Convert a domain entity to an insertable row.
    ///
    /// `is_local_id` is computed here: zero or negative identifiers mean the
    /// record has never been acknowledged by the server, which is what the
    /// sync layer later reads to pick create over update.
    fn to_new_row(bookmark: &Bookmark) -> NewBookmarkRow {
        NewBookmarkRow {
            collection_id: bookmark.collection_id,
            title: bookmark.title.clone(),
            url: bookmark.url.clone(),
            description: bookmark.description.clone(),
            favicon_url: bookmark.favicon_url.clone(),
            image_url: bookmark.image_url.clone(),
            is_favorite: bookmark.is_favorite,
            is_archived: bookmark.is_archived,
            server_is_favorite: bookmark.server_is_favorite,
            server_is_archived: bookmark.server_is_archived,
            tags: bookmark.formatted_tags(),
            created_at: bookmark.created_at.naive_utc(),
            updated_at: bookmark.updated_at.naive_utc(),
            last_opened: bookmark.last_opened.map(|ts| ts.naive_utc()),
            open_count: bookmark.open_count,
            is_synced: bookmark.is_synced,
            is_deleted: bookmark.is_deleted,
            is_local_id: bookmark.id <= 0,
        }
    }

    /// Content changes for an update; sync bookkeeping fields are written by
    /// their dedicated operations.
    fn to_changes(bookmark: &Bookmark) -> BookmarkChanges {
        BookmarkChanges {
            collection_id: bookmark.collection_id,
            title: bookmark.title.clone(),
            url: bookmark.url.clone(),
            description: bookmark.description.clone(),
            favicon_url: bookmark.favicon_url.clone(),
            image_url: bookmark.image_url.clone(),
            is_favorite: bookmark.is_favorite,
            is_archived: bookmark.is_archived,
            tags: bookmark.formatted_tags(),
            updated_at: bookmark.updated_at.naive_utc(),
            is_synced: bookmark.is_synced,
        }
    }

    /// Full row for remote-refresh upserts; the server id is authoritative.
    fn to_full_row(bookmark: &Bookmark) -> BookmarkRow {
        BookmarkRow {
            id: bookmark.id,
            collection_id: bookmark.collection_id,
            title: bookmark.title.clone(),
            url: bookmark.url.clone(),
            description: bookmark.description.clone(),
            favicon_url: bookmark.favicon_url.clone(),
            image_url: bookmark.image_url.clone(),
            is_favorite: bookmark.is_favorite,
            is_archived: bookmark.is_archived,
            server_is_favorite: bookmark.server_is_favorite,
            server_is_archived: bookmark.server_is_archived,
            tags: bookmark.formatted_tags(),
            created_at: bookmark.created_at.naive_utc(),
            updated_at: bookmark.updated_at.naive_utc(),
            last_opened: bookmark.last_opened.map(|ts| ts.naive_utc()),
            open_count: bookmark.open_count,
            is_synced: bookmark.is_synced,
            is_deleted: bookmark.is_deleted,
            is_local_id: false,
        }
    }

    fn load_live(
        &self,
        conn: &mut PooledConnection,
        filter: impl FnOnce(BoxedBookmarkQuery) -> BoxedBookmarkQuery,
    ) -> SqliteResult<Vec<Bookmark>> {
        let query = filter(
            dsl::bookmarks
                .into_boxed()
                .filter(dsl::is_deleted.eq(false)),
        )
        .order(dsl::created_at.desc());

        let rows = query
            .load::<BookmarkRow>(conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(rows.into_iter().map(Self::to_domain_model).collect())
    }
}

impl crate::domain::repositories::bookmark_repository::BookmarkRepository
    for SqliteBookmarkRepository
{
    #[instrument(skip_all, level = "debug")]
    fn get_by_id(&self, id: i64) -> Result<Option<Bookmark>, DomainError> {
        let mut conn = self.get_connection()?;

        let row = dsl::bookmarks
            .filter(dsl::id.eq(id))
            .filter(dsl::is_deleted.eq(false))
            .first::<BookmarkRow>(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(row.map(Self::to_domain_model))
    }

    #[instrument(skip_all, level = "debug")]
    fn get_by_id_any(&self, id: i64) -> Result<Option<Bookmark>, DomainError> {
        let mut conn = self.get_connection()?;

        let row = dsl::bookmarks
            .filter(dsl::id.eq(id))
            .first::<BookmarkRow>(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(row.map(Self::to_domain_model))
    }

    #[instrument(skip_all, level = "debug")]
    fn get_by_url(&self, url: &str) -> Result<Option<Bookmark>, DomainError> {
        let mut conn = self.get_connection()?;

        let row = dsl::bookmarks
            .filter(dsl::url.eq(url))
            .filter(dsl::is_deleted.eq(false))
            .first::<BookmarkRow>(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(row.map(Self::to_domain_model))
    }

    #[instrument(skip_all, level = "debug")]
    fn list_all(&self) -> Result<Vec<Bookmark>, DomainError> {
        let mut conn = self.get_connection()?;
        Ok(self.load_live(&mut conn, |q| q)?)
    }

    #[instrument(skip_all, level = "debug")]
    fn list_by_collection(&self, collection_id: i64) -> Result<Vec<Bookmark>, DomainError> {
        let mut conn = self.get_connection()?;
        Ok(self.load_live(&mut conn, |q| q.filter(dsl::collection_id.eq(collection_id)))?)
    }

    #[instrument(skip_all, level = "debug")]
    fn list_favorites(&self) -> Result<Vec<Bookmark>, DomainError> {
        let mut conn = self.get_connection()?;
        Ok(self.load_live(&mut conn, |q| q.filter(dsl::is_favorite.eq(true)))?)
    }

    #[instrument(skip_all, level = "debug")]
    fn list_archived(&self) -> Result<Vec<Bookmark>, DomainError> {
        let mut conn = self.get_connection()?;
        Ok(self.load_live(&mut conn, |q| q.filter(dsl::is_archived.eq(true)))?)
    }

    #[instrument(skip(self), level = "debug")]
    fn search(&self, text: &str) -> Result<Vec<Bookmark>, DomainError> {
        let mut conn = self.get_connection()?;
        // SQLite LIKE is case-insensitive for ASCII, which matches the
        // search contract here.
        let pattern = format!("%{}%", text);

        Ok(self.load_live(&mut conn, move |q| {
            q.filter(
                dsl::title
                    .like(pattern.clone())
                    .nullable()
                    .or(dsl::description.like(pattern.clone()))
                    .or(dsl::tags.like(pattern).nullable()),
            )
        })?)
    }

    #[instrument(skip_all, level = "debug")]
    fn add(&self, bookmark: &mut Bookmark) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        let id = conn
            .transaction::<i64, diesel::result::Error, _>(|conn| {
                let row = Self::to_new_row(bookmark);

                diesel::insert_into(dsl::bookmarks)
                    .values(&row)
                    .execute(conn)?;

                diesel::select(diesel::dsl::sql::<diesel::sql_types::BigInt>(
                    "last_insert_rowid()",
                ))
                .get_result::<i64>(conn)
            })
            .map_err(SqliteRepositoryError::DatabaseError)?;

        bookmark.id = id;
        Ok(())
    }

    #[instrument(skip_all, level = "debug")]
    fn update(&self, bookmark: &Bookmark) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        if bookmark.id <= 0 {
            return Err(SqliteRepositoryError::OperationFailed(
                "Bookmark has no ID".to_string(),
            )
            .into());
        }

        let changes = Self::to_changes(bookmark);

        let affected = diesel::update(dsl::bookmarks.filter(dsl::id.eq(bookmark.id)))
            .set(&changes)
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        if affected == 0 {
            return Err(SqliteRepositoryError::BookmarkNotFound(bookmark.id).into());
        }

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn toggle_favorite(&self, id: i64) -> Result<Bookmark, DomainError> {
        let mut conn = self.get_connection()?;

        let row = conn
            .transaction::<BookmarkRow, diesel::result::Error, _>(|conn| {
                let affected = diesel::update(
                    dsl::bookmarks
                        .filter(dsl::id.eq(id))
                        .filter(dsl::is_deleted.eq(false)),
                )
                .set((
                    dsl::is_favorite.eq(not(dsl::is_favorite)),
                    dsl::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)?;

                if affected == 0 {
                    return Err(diesel::result::Error::NotFound);
                }

                dsl::bookmarks.filter(dsl::id.eq(id)).first(conn)
            })
            .map_err(|e| match e {
                diesel::result::Error::NotFound => SqliteRepositoryError::BookmarkNotFound(id),
                other => SqliteRepositoryError::DatabaseError(other),
            })?;

        Ok(Self::to_domain_model(row))
    }

    #[instrument(skip(self), level = "debug")]
    fn set_favorite(&self, id: i64, flag: bool) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        let affected = diesel::update(
            dsl::bookmarks
                .filter(dsl::id.eq(id))
                .filter(dsl::is_deleted.eq(false)),
        )
        .set((
            dsl::is_favorite.eq(flag),
            dsl::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;

        if affected == 0 {
            return Err(SqliteRepositoryError::BookmarkNotFound(id).into());
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn set_archived(&self, id: i64, flag: bool) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        let affected = diesel::update(
            dsl::bookmarks
                .filter(dsl::id.eq(id))
                .filter(dsl::is_deleted.eq(false)),
        )
        .set((
            dsl::is_archived.eq(flag),
            dsl::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;

        if affected == 0 {
            return Err(SqliteRepositoryError::BookmarkNotFound(id).into());
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn set_favorite_many(&self, ids: &[i64], flag: bool) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        diesel::update(dsl::bookmarks.filter(dsl::id.eq_any(ids.iter().copied())))
            .set((
                dsl::is_favorite.eq(flag),
                dsl::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn set_archived_many(&self, ids: &[i64], flag: bool) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        diesel::update(dsl::bookmarks.filter(dsl::id.eq_any(ids.iter().copied())))
            .set((
                dsl::is_archived.eq(flag),
                dsl::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn record_open(&self, id: i64) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;
        let now = Utc::now().naive_utc();

        let affected = diesel::update(
            dsl::bookmarks
                .filter(dsl::id.eq(id))
                .filter(dsl::is_deleted.eq(false)),
        )
        .set((
            dsl::open_count.eq(dsl::open_count + 1),
            dsl::last_opened.eq(now),
            dsl::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;

        if affected == 0 {
            return Err(SqliteRepositoryError::BookmarkNotFound(id).into());
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn move_to_collection(&self, id: i64, collection_id: i64) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        let affected = diesel::update(
            dsl::bookmarks
                .filter(dsl::id.eq(id))
                .filter(dsl::is_deleted.eq(false)),
        )
        .set((
            dsl::collection_id.eq(collection_id),
            dsl::is_synced.eq(false),
            dsl::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;

        if affected == 0 {
            return Err(SqliteRepositoryError::BookmarkNotFound(id).into());
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn soft_delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut conn = self.get_connection()?;

        let affected = diesel::update(dsl::bookmarks.filter(dsl::id.eq(id)))
            .set((
                dsl::is_deleted.eq(true),
                dsl::is_synced.eq(false),
                dsl::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(affected > 0)
    }

    #[instrument(skip(self), level = "debug")]
    fn soft_delete_many(&self, ids: &[i64]) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        diesel::update(dsl::bookmarks.filter(dsl::id.eq_any(ids.iter().copied())))
            .set((
                dsl::is_deleted.eq(true),
                dsl::is_synced.eq(false),
                dsl::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn purge(&self, id: i64) -> Result<bool, DomainError> {
        let mut conn = self.get_connection()?;

        let affected = diesel::delete(dsl::bookmarks.filter(dsl::id.eq(id)))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(affected > 0)
    }

    #[instrument(skip(self), level = "debug")]
    fn relabel_id(&self, old_id: i64, new_id: i64) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        let affected = diesel::update(dsl::bookmarks.filter(dsl::id.eq(old_id)))
            .set((
                dsl::id.eq(new_id),
                dsl::is_local_id.eq(false),
                dsl::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        if affected == 0 {
            return Err(SqliteRepositoryError::BookmarkNotFound(old_id).into());
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn mark_synced(
        &self,
        id: i64,
        server_is_favorite: Option<bool>,
        server_is_archived: Option<bool>,
    ) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;
        let now = Utc::now().naive_utc();

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            // A confirmed push means the server knows this record
            diesel::update(dsl::bookmarks.filter(dsl::id.eq(id)))
                .set((
                    dsl::is_synced.eq(true),
                    dsl::is_local_id.eq(false),
                    dsl::updated_at.eq(now),
                ))
                .execute(conn)?;

            if let Some(flag) = server_is_favorite {
                diesel::update(dsl::bookmarks.filter(dsl::id.eq(id)))
                    .set(dsl::server_is_favorite.eq(flag))
                    .execute(conn)?;
            }

            if let Some(flag) = server_is_archived {
                diesel::update(dsl::bookmarks.filter(dsl::id.eq(id)))
                    .set(dsl::server_is_archived.eq(flag))
                    .execute(conn)?;
            }

            Ok(())
        })
        .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(())
    }

    #[instrument(skip_all, level = "debug")]
    fn replace_from_remote(&self, bookmark: &Bookmark) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        let row = Self::to_full_row(bookmark);
        diesel::replace_into(dsl::bookmarks)
            .values(&row)
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(())
    }

    #[instrument(skip_all, level = "debug")]
    fn unsynced(&self) -> Result<Vec<Bookmark>, DomainError> {
        let mut conn = self.get_connection()?;

        let rows = dsl::bookmarks
            .filter(dsl::is_synced.eq(false))
            .filter(dsl::is_deleted.eq(false))
            .order(dsl::created_at.asc())
            .load::<BookmarkRow>(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(rows.into_iter().map(Self::to_domain_model).collect())
    }

    #[instrument(skip_all, level = "debug")]
    fn deleted_unsynced(&self) -> Result<Vec<Bookmark>, DomainError> {
        let mut conn = self.get_connection()?;

        let rows = dsl::bookmarks
            .filter(dsl::is_deleted.eq(true))
            .filter(dsl::is_synced.eq(false))
            .load::<BookmarkRow>(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(rows.into_iter().map(Self::to_domain_model).collect())
    }

    #[instrument(skip_all, level = "debug")]
    fn drifted(&self) -> Result<Vec<Bookmark>, DomainError> {
        let mut conn = self.get_connection()?;

        let rows = dsl::bookmarks
            .filter(dsl::is_synced.eq(true))
            .filter(dsl::is_deleted.eq(false))
            .filter(
                dsl::is_favorite
                    .ne(dsl::server_is_favorite)
                    .or(dsl::is_archived.ne(dsl::server_is_archived)),
            )
            .load::<BookmarkRow>(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(rows.into_iter().map(Self::to_domain_model).collect())
    }
}
