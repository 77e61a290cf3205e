// src/application/error.rs
use crate::domain::error::DomainError;
use crate::infrastructure::api::error::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// A remote call during an explicit refresh failed; retryable by the
    /// caller. Queued sync failures never surface through this variant.
    #[error("Network error: {0}")]
    Network(#[from] ApiError),

    #[error("{0}")]
    Other(String),
}

impl ApplicationError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        ApplicationError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Whether retrying the same operation can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApplicationError::Network(api) => {
                api.retry_class() == crate::infrastructure::api::error::ApiRetryClass::Retryable
            }
            _ => false,
        }
    }
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;
