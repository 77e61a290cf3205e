// src/domain/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Tag operation failed: {0}")]
    TagOperationFailed(String),

    #[error("Bookmark URL already exists: {0}")]
    DuplicateUrl(String),

    #[error("Collection name already exists: {0}")]
    DuplicateName(String),

    #[error("Bookmark not found: {0}")]
    BookmarkNotFound(i64),

    #[error("Collection not found: {0}")]
    CollectionNotFound(i64),

    #[error("Bookmark operation failed: {0}")]
    BookmarkOperationFailed(String),

    #[error("Collection operation failed: {0}")]
    CollectionOperationFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
