// src/infrastructure/repositories/sqlite/error.rs

use diesel::r2d2;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DieselError),

    #[error("Diesel connection error: {0}")]
    ConnectionError(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(String),

    #[error("Bookmark not found with ID: {0}")]
    BookmarkNotFound(i64),

    #[error("Collection not found with ID: {0}")]
    CollectionNotFound(i64),

    #[error("Failed to convert entity: {0}")]
    ConversionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Repository operation failed: {0}")]
    OperationFailed(String),
}

pub type SqliteResult<T> = Result<T, SqliteRepositoryError>;

impl From<r2d2::Error> for SqliteRepositoryError {
    fn from(err: r2d2::Error) -> Self {
        SqliteRepositoryError::ConnectionPoolError(err.to_string())
    }
}

impl From<SqliteRepositoryError> for crate::domain::error::DomainError {
    fn from(err: SqliteRepositoryError) -> Self {
        use crate::domain::error::DomainError;

        match err {
            SqliteRepositoryError::BookmarkNotFound(id) => DomainError::BookmarkNotFound(id),
            SqliteRepositoryError::CollectionNotFound(id) => DomainError::CollectionNotFound(id),
            SqliteRepositoryError::DatabaseError(diesel_err) => match diesel_err {
                DieselError::NotFound => {
                    DomainError::BookmarkOperationFailed("Resource not found".to_string())
                }
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                    // SQLite reports the violated column or index in the
                    // message, which is enough to pick the typed error.
                    let message = info.message().to_string();
                    if message.contains("bookmarks") {
                        DomainError::DuplicateUrl(message)
                    } else if message.contains("collections") {
                        DomainError::DuplicateName(message)
                    } else {
                        DomainError::BookmarkOperationFailed(format!(
                            "Unique constraint violation: {}",
                            message
                        ))
                    }
                }
                DieselError::DatabaseError(_, info) => DomainError::BookmarkOperationFailed(
                    format!("Database error: {}", info.message()),
                ),
                _ => DomainError::BookmarkOperationFailed(format!(
                    "Database error: {}",
                    diesel_err
                )),
            },
            SqliteRepositoryError::ConnectionError(e) => {
                DomainError::BookmarkOperationFailed(format!("Database connection error: {}", e))
            }
            SqliteRepositoryError::ConnectionPoolError(e) => {
                DomainError::BookmarkOperationFailed(format!("Connection pool error: {}", e))
            }
            SqliteRepositoryError::ConversionError(e) => {
                DomainError::BookmarkOperationFailed(format!("Data conversion error: {}", e))
            }
            SqliteRepositoryError::IoError(e) => {
                DomainError::BookmarkOperationFailed(format!("IO error: {}", e))
            }
            SqliteRepositoryError::MigrationError(e) => {
                DomainError::BookmarkOperationFailed(format!("Migration error: {}", e))
            }
            SqliteRepositoryError::OperationFailed(e) => DomainError::BookmarkOperationFailed(e),
        }
    }
}
