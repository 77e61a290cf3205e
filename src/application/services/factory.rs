// src/application/services/factory.rs
use std::sync::Arc;

use crate::application::error::ApplicationResult;
use crate::application::services::bookmark_service::BookmarkService;
use crate::application::services::collection_service::CollectionService;
use crate::application::services::sync_service::{DrainPolicy, SyncService};
use crate::application::watch::ChangeNotifier;
use crate::application::{BookmarkServiceImpl, CollectionServiceImpl, SyncServiceImpl};
use crate::config::Settings;
use crate::domain::error::DomainError;
use crate::domain::repositories::bookmark_repository::BookmarkRepository;
use crate::domain::repositories::collection_repository::CollectionRepository;
use crate::infrastructure::api::client::HttpRemoteApi;
use crate::infrastructure::api::remote::RemoteApi;
use crate::infrastructure::repositories::sqlite::bookmark_repository::SqliteBookmarkRepository;
use crate::infrastructure::repositories::sqlite::collection_repository::SqliteCollectionRepository;
use crate::infrastructure::repositories::sqlite::connection::init_pool;

/// The wired application: both façades plus the sync service they feed.
#[derive(Debug, Clone)]
pub struct ServiceContainer {
    pub bookmarks: Arc<dyn BookmarkService>,
    pub collections: Arc<dyn CollectionService>,
    pub sync: Arc<dyn SyncService>,
}

/// Build the full service stack from settings: pool + migrations, the
/// repositories, the remote client, the sync worker and both façades.
///
/// Must run inside a tokio runtime; the sync worker is spawned here. The
/// startup sweep (`sync.requeue_pending()`) is left to the caller so
/// embedders can decide when the first network activity happens.
pub fn create_services(settings: &Settings) -> ApplicationResult<ServiceContainer> {
    let pool = init_pool(&settings.db_url).map_err(DomainError::from)?;

    let bookmark_repository: Arc<dyn BookmarkRepository> =
        Arc::new(SqliteBookmarkRepository::new(pool.clone()));
    let collection_repository: Arc<dyn CollectionRepository> =
        Arc::new(SqliteCollectionRepository::new(pool));

    let remote: Arc<dyn RemoteApi> = Arc::new(HttpRemoteApi::new(
        &settings.api_base_url,
        Some(settings.api_token.clone()),
    )?);

    let notifier = ChangeNotifier::new();
    let policy = if settings.sync.isolate_failures {
        DrainPolicy::IsolateItems
    } else {
        DrainPolicy::ReplayRemainder
    };

    let sync: Arc<dyn SyncService> = Arc::new(SyncServiceImpl::start(
        Arc::clone(&remote),
        Arc::clone(&bookmark_repository),
        Arc::clone(&collection_repository),
        notifier.clone(),
        policy,
        settings.sync.max_retries,
        &settings.user_id,
    ));

    let bookmarks: Arc<dyn BookmarkService> = Arc::new(BookmarkServiceImpl::new(
        Arc::clone(&bookmark_repository),
        Arc::clone(&collection_repository),
        Arc::clone(&remote),
        Arc::clone(&sync),
        notifier.clone(),
        &settings.user_id,
    ));

    let collections: Arc<dyn CollectionService> = Arc::new(CollectionServiceImpl::new(
        collection_repository,
        bookmark_repository,
        remote,
        Arc::clone(&sync),
        notifier,
        &settings.user_id,
    ));

    Ok(ServiceContainer {
        bookmarks,
        collections,
        sync,
    })
}
