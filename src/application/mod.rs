// src/application/mod.rs
pub mod error;
pub mod services;
pub mod watch;

// Re-export key services for easier imports
pub use services::bookmark_service_impl::BookmarkServiceImpl;
pub use services::collection_service_impl::CollectionServiceImpl;
pub use services::sync_service_impl::SyncServiceImpl;
