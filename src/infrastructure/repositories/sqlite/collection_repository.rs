// src/infrastructure/repositories/sqlite/collection_repository.rs

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tracing::instrument;

use super::connection::{ConnectionPool, PooledConnection};
use super::error::{SqliteRepositoryError, SqliteResult};
use crate::domain::collection::{AccessLevel, Collection};
use crate::domain::error::DomainError;
use crate::infrastructure::repositories::sqlite::model::{
    CollectionChanges, CollectionRow, NewCollectionRow,
};
use crate::infrastructure::repositories::sqlite::schema::bookmarks;
use crate::infrastructure::repositories::sqlite::schema::collections::dsl;

#[derive(Clone, Debug)]
pub struct SqliteCollectionRepository {
    pool: ConnectionPool,
}

impl SqliteCollectionRepository {
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

    /// Convert a database row to a domain entity. Total: the stored access
    /// level parses leniently.
    #[instrument(skip_all, level = "trace")]
    fn to_domain_model(row: CollectionRow) -> Collection {
        Collection {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            color: row.color,
            icon: row.icon,
            created_at: DateTime::<Utc>::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::<Utc>::from_naive_utc_and_offset(row.updated_at, Utc),
            item_count: row.item_count,
            is_default: row.is_default,
            is_shared: row.is_shared,
            share_url: row.share_url,
            share_expiry: row
                .share_expiry
                .map(|ts| DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc)),
            access_level: AccessLevel::parse(&row.access_level),
            sort_order: row.sort_order,
            is_deleted: row.is_deleted,
            deleted_at: row
                .deleted_at
                .map(|ts| DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc)),
            is_synced: row.is_synced,
            is_local_id: row.is_local_id,
        }
    }

    /// Convert a domain entity to an insertable row. Like bookmarks,
    /// `is_local_id` is computed from the identifier.
    fn to_new_row(collection: &Collection) -> NewCollectionRow {
        NewCollectionRow {
            user_id: collection.user_id.clone(),
            name: collection.name.clone(),
            description: collection.description.clone(),
            color: collection.color.clone(),
            icon: collection.icon.clone(),
            created_at: collection.created_at.naive_utc(),
            updated_at: collection.updated_at.naive_utc(),
            item_count: collection.item_count,
            is_default: collection.is_default,
            is_shared: collection.is_shared,
            share_url: collection.share_url.clone(),
            share_expiry: collection.share_expiry.map(|ts| ts.naive_utc()),
            access_level: collection.access_level.as_str().to_string(),
            sort_order: collection.sort_order,
            is_deleted: collection.is_deleted,
            deleted_at: collection.deleted_at.map(|ts| ts.naive_utc()),
            is_synced: collection.is_synced,
            is_local_id: collection.id <= 0,
        }
    }

    fn to_changes(collection: &Collection) -> CollectionChanges {
        CollectionChanges {
            name: collection.name.clone(),
            description: collection.description.clone(),
            color: collection.color.clone(),
            icon: collection.icon.clone(),
            is_shared: collection.is_shared,
            share_url: collection.share_url.clone(),
            share_expiry: collection.share_expiry.map(|ts| ts.naive_utc()),
            access_level: collection.access_level.as_str().to_string(),
            sort_order: collection.sort_order,
            updated_at: collection.updated_at.naive_utc(),
            is_synced: collection.is_synced,
        }
    }

    fn to_full_row(collection: &Collection) -> CollectionRow {
        CollectionRow {
            id: collection.id,
            user_id: collection.user_id.clone(),
            name: collection.name.clone(),
            description: collection.description.clone(),
            color: collection.color.clone(),
            icon: collection.icon.clone(),
            created_at: collection.created_at.naive_utc(),
            updated_at: collection.updated_at.naive_utc(),
            item_count: collection.item_count,
            is_default: collection.is_default,
            is_shared: collection.is_shared,
            share_url: collection.share_url.clone(),
            share_expiry: collection.share_expiry.map(|ts| ts.naive_utc()),
            access_level: collection.access_level.as_str().to_string(),
            sort_order: collection.sort_order,
            is_deleted: collection.is_deleted,
            deleted_at: collection.deleted_at.map(|ts| ts.naive_utc()),
            is_synced: collection.is_synced,
            is_local_id: false,
        }
    }
}

impl crate::domain::repositories::collection_repository::CollectionRepository
    for SqliteCollectionRepository
{
    #[instrument(skip_all, level = "debug")]
    fn get_by_id(&self, id: i64) -> Result<Option<Collection>, DomainError> {
        let mut conn = self.get_connection()?;

        let row = dsl::collections
            .filter(dsl::id.eq(id))
            .filter(dsl::is_deleted.eq(false))
            .first::<CollectionRow>(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(row.map(Self::to_domain_model))
    }

    #[instrument(skip_all, level = "debug")]
    fn get_by_id_any(&self, id: i64) -> Result<Option<Collection>, DomainError> {
        let mut conn = self.get_connection()?;

        let row = dsl::collections
            .filter(dsl::id.eq(id))
            .first::<CollectionRow>(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(row.map(Self::to_domain_model))
    }

    #[instrument(skip(self), level = "debug")]
    fn list_by_user(&self, user_id: &str) -> Result<Vec<Collection>, DomainError> {
        let mut conn = self.get_connection()?;

        let rows = dsl::collections
            .filter(dsl::user_id.eq(user_id))
            .filter(dsl::is_deleted.eq(false))
            .order((dsl::sort_order.asc(), dsl::name.asc()))
            .load::<CollectionRow>(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(rows.into_iter().map(Self::to_domain_model).collect())
    }

    #[instrument(skip(self), level = "debug")]
    fn list_shared(&self, user_id: &str) -> Result<Vec<Collection>, DomainError> {
        let mut conn = self.get_connection()?;

        let rows = dsl::collections
            .filter(dsl::user_id.eq(user_id))
            .filter(dsl::is_shared.eq(true))
            .filter(dsl::is_deleted.eq(false))
            .order(dsl::name.asc())
            .load::<CollectionRow>(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(rows.into_iter().map(Self::to_domain_model).collect())
    }

    #[instrument(skip(self), level = "debug")]
    fn get_by_share_url(&self, share_url: &str) -> Result<Option<Collection>, DomainError> {
        let mut conn = self.get_connection()?;

        let row = dsl::collections
            .filter(dsl::share_url.eq(share_url))
            .filter(dsl::is_deleted.eq(false))
            .first::<CollectionRow>(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(row.map(Self::to_domain_model))
    }

    #[instrument(skip(self), level = "debug")]
    fn get_default(&self, user_id: &str) -> Result<Option<Collection>, DomainError> {
        let mut conn = self.get_connection()?;

        let row = dsl::collections
            .filter(dsl::user_id.eq(user_id))
            .filter(dsl::is_default.eq(true))
            .filter(dsl::is_deleted.eq(false))
            .first::<CollectionRow>(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(row.map(Self::to_domain_model))
    }

    #[instrument(skip_all, level = "debug")]
    fn add(&self, collection: &mut Collection) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        let id = conn
            .transaction::<i64, diesel::result::Error, _>(|conn| {
                let row = Self::to_new_row(collection);

                diesel::insert_into(dsl::collections)
                    .values(&row)
                    .execute(conn)?;

                diesel::select(diesel::dsl::sql::<diesel::sql_types::BigInt>(
                    "last_insert_rowid()",
                ))
                .get_result::<i64>(conn)
            })
            .map_err(SqliteRepositoryError::DatabaseError)?;

        collection.id = id;
        Ok(())
    }

    #[instrument(skip_all, level = "debug")]
    fn update(&self, collection: &Collection) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        if collection.id <= 0 {
            return Err(SqliteRepositoryError::OperationFailed(
                "Collection has no ID".to_string(),
            )
            .into());
        }

        let changes = Self::to_changes(collection);

        let affected = diesel::update(dsl::collections.filter(dsl::id.eq(collection.id)))
            .set(&changes)
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        if affected == 0 {
            return Err(SqliteRepositoryError::CollectionNotFound(collection.id).into());
        }

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn set_default(&self, user_id: &str, id: i64) -> Result<Vec<i64>, DomainError> {
        let mut conn = self.get_connection()?;
        let now = Utc::now().naive_utc();

        // Clearing previous defaults and setting the new one must be one
        // transaction so concurrent writers cannot leave two defaults.
        let cleared = conn
            .transaction::<Vec<i64>, diesel::result::Error, _>(|conn| {
                let cleared: Vec<i64> = dsl::collections
                    .filter(dsl::user_id.eq(user_id))
                    .filter(dsl::is_default.eq(true))
                    .filter(dsl::id.ne(id))
                    .select(dsl::id)
                    .load::<i64>(conn)?;

                if !cleared.is_empty() {
                    diesel::update(
                        dsl::collections.filter(dsl::id.eq_any(cleared.iter().copied())),
                    )
                    .set((dsl::is_default.eq(false), dsl::updated_at.eq(now)))
                    .execute(conn)?;
                }

                let affected = diesel::update(
                    dsl::collections
                        .filter(dsl::id.eq(id))
                        .filter(dsl::user_id.eq(user_id))
                        .filter(dsl::is_deleted.eq(false)),
                )
                .set((dsl::is_default.eq(true), dsl::updated_at.eq(now)))
                .execute(conn)?;

                if affected == 0 {
                    return Err(diesel::result::Error::NotFound);
                }

                Ok(cleared)
            })
            .map_err(|e| match e {
                diesel::result::Error::NotFound => SqliteRepositoryError::CollectionNotFound(id),
                other => SqliteRepositoryError::DatabaseError(other),
            })?;

        Ok(cleared)
    }

    #[instrument(skip(self), level = "debug")]
    fn set_sort_order(&self, id: i64, sort_order: i32) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        let affected = diesel::update(dsl::collections.filter(dsl::id.eq(id)))
            .set((
                dsl::sort_order.eq(sort_order),
                dsl::is_synced.eq(false),
                dsl::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        if affected == 0 {
            return Err(SqliteRepositoryError::CollectionNotFound(id).into());
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn recount_items(&self, id: i64) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        let count: i64 = bookmarks::dsl::bookmarks
            .filter(bookmarks::dsl::collection_id.eq(id))
            .filter(bookmarks::dsl::is_deleted.eq(false))
            .count()
            .get_result(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        diesel::update(dsl::collections.filter(dsl::id.eq(id)))
            .set(dsl::item_count.eq(count as i32))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn soft_delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut conn = self.get_connection()?;
        let now = Utc::now().naive_utc();

        let affected = diesel::update(dsl::collections.filter(dsl::id.eq(id)))
            .set((
                dsl::is_deleted.eq(true),
                dsl::deleted_at.eq(now),
                dsl::is_synced.eq(false),
                dsl::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(affected > 0)
    }

    #[instrument(skip(self), level = "debug")]
    fn purge(&self, id: i64) -> Result<bool, DomainError> {
        let mut conn = self.get_connection()?;

        // Dependent bookmarks are removed by the FK cascade
        let affected = diesel::delete(dsl::collections.filter(dsl::id.eq(id)))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(affected > 0)
    }

    #[instrument(skip(self), level = "debug")]
    fn relabel_id(&self, old_id: i64, new_id: i64) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;
        let now = Utc::now().naive_utc();

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            // SQLite ignores `PRAGMA foreign_keys` toggles inside an active
            // transaction, but `defer_foreign_keys` applies to the current
            // transaction and validates constraints at commit time. Updating the
            // collection's primary key before carrying its bookmarks over would
            // otherwise trip the FK constraint mid-transaction.
            diesel::sql_query("PRAGMA defer_foreign_keys = ON").execute(conn)?;

            let affected = diesel::update(dsl::collections.filter(dsl::id.eq(old_id)))
                .set((
                    dsl::id.eq(new_id),
                    dsl::is_local_id.eq(false),
                    dsl::updated_at.eq(now),
                ))
                .execute(conn)?;

            if affected == 0 {
                return Err(diesel::result::Error::NotFound);
            }

            // Carry dependent bookmarks over to the server-assigned id
            diesel::update(
                bookmarks::dsl::bookmarks.filter(bookmarks::dsl::collection_id.eq(old_id)),
            )
            .set(bookmarks::dsl::collection_id.eq(new_id))
            .execute(conn)?;

            Ok(())
        })
        .map_err(|e| match e {
            diesel::result::Error::NotFound => SqliteRepositoryError::CollectionNotFound(old_id),
            other => SqliteRepositoryError::DatabaseError(other),
        })?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn mark_synced(&self, id: i64) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        // A confirmed push means the server knows this record
        diesel::update(dsl::collections.filter(dsl::id.eq(id)))
            .set((
                dsl::is_synced.eq(true),
                dsl::is_local_id.eq(false),
                dsl::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(())
    }

    #[instrument(skip_all, level = "debug")]
    fn replace_from_remote(&self, collection: &Collection) -> Result<(), DomainError> {
        let mut conn = self.get_connection()?;

        let row = Self::to_full_row(collection);
        diesel::replace_into(dsl::collections)
            .values(&row)
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(())
    }

    #[instrument(skip_all, level = "debug")]
    fn unsynced(&self) -> Result<Vec<Collection>, DomainError> {
        let mut conn = self.get_connection()?;

        let rows = dsl::collections
            .filter(dsl::is_synced.eq(false))
            .filter(dsl::is_deleted.eq(false))
            .order(dsl::created_at.asc())
            .load::<CollectionRow>(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(rows.into_iter().map(Self::to_domain_model).collect())
    }

    #[instrument(skip_all, level = "debug")]
    fn deleted_unsynced(&self) -> Result<Vec<Collection>, DomainError> {
        let mut conn = self.get_connection()?;

        let rows = dsl::collections
            .filter(dsl::is_deleted.eq(true))
            .filter(dsl::is_synced.eq(false))
            .load::<CollectionRow>(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        Ok(rows.into_iter().map(Self::to_domain_model).collect())
    }
}
