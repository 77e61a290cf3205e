// src/application/services/collection_service_impl.rs
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::collection_service::CollectionService;
use crate::application::services::sync_service::{
    ChangeType, SyncChange, SyncEntity, SyncPayload, SyncService,
};
use crate::application::watch::{ChangeNotifier, LiveQuery};
use crate::domain::collection::{AccessLevel, Collection, ShareSettings};
use crate::domain::repositories::bookmark_repository::BookmarkRepository;
use crate::domain::repositories::collection_repository::CollectionRepository;
use crate::infrastructure::api::mapper;
use crate::infrastructure::api::remote::RemoteApi;

#[derive(Debug)]
pub struct CollectionServiceImpl {
    collections: Arc<dyn CollectionRepository>,
    bookmarks: Arc<dyn BookmarkRepository>,
    remote: Arc<dyn RemoteApi>,
    sync: Arc<dyn SyncService>,
    notifier: ChangeNotifier,
    user_id: String,
}

impl CollectionServiceImpl {
    pub fn new(
        collections: Arc<dyn CollectionRepository>,
        bookmarks: Arc<dyn BookmarkRepository>,
        remote: Arc<dyn RemoteApi>,
        sync: Arc<dyn SyncService>,
        notifier: ChangeNotifier,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            collections,
            bookmarks,
            remote,
            sync,
            notifier,
            user_id: user_id.into(),
        }
    }

    fn validate_name(name: &str) -> ApplicationResult<()> {
        if name.trim().is_empty() {
            return Err(ApplicationError::validation("name", "Name cannot be empty"));
        }
        Ok(())
    }

    fn enqueue_upsert(&self, collection: &Collection) {
        let change_type = if collection.is_local() {
            ChangeType::Create
        } else {
            ChangeType::Update
        };
        self.sync.enqueue(SyncChange::new(
            &self.user_id,
            SyncEntity::Collection,
            collection.id,
            change_type,
            SyncPayload::CollectionUpsert(mapper::collection_to_request(collection)),
        ));
    }

    fn enqueue_sharing(&self, collection: &Collection, expiry_days: Option<i64>) {
        // Sharing a collection the server has never seen rides on the
        // create: the upsert payload carries is_shared and access_level.
        if collection.is_local() {
            self.enqueue_upsert(collection);
            return;
        }
        self.sync.enqueue(SyncChange::new(
            &self.user_id,
            SyncEntity::Collection,
            collection.id,
            ChangeType::Update,
            SyncPayload::CollectionSharing(mapper::sharing_to_request(&ShareSettings {
                is_shared: collection.is_shared,
                access_level: collection.access_level,
                share_url: collection.share_url.clone(),
                share_expiry: collection.share_expiry,
                expiry_days,
            })),
        ));
    }
}

#[async_trait]
impl CollectionService for CollectionServiceImpl {
    #[instrument(skip(self), level = "debug", fields(name = %name))]
    async fn create_collection(
        &self,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
        icon: Option<&str>,
    ) -> ApplicationResult<Collection> {
        Self::validate_name(name)?;

        // Name uniqueness per user is the store's constraint; a live
        // duplicate fails the insert with DomainError::DuplicateName.
        let mut collection =
            Collection::new(self.user_id.as_str(), name, description, color, icon);
        self.collections.add(&mut collection)?;

        self.notifier.notify();
        self.enqueue_upsert(&collection);

        debug!("Created collection {} ({})", collection.id, collection.name);
        Ok(collection)
    }

    async fn get_collection(&self, id: i64) -> ApplicationResult<Option<Collection>> {
        Ok(self.collections.get_by_id(id)?)
    }

    async fn get_collections(&self) -> ApplicationResult<Vec<Collection>> {
        Ok(self.collections.list_by_user(&self.user_id)?)
    }

    async fn get_default_collection(&self) -> ApplicationResult<Option<Collection>> {
        Ok(self.collections.get_default(&self.user_id)?)
    }

    #[instrument(skip(self), level = "debug")]
    async fn update_collection(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        color: &str,
        icon: Option<&str>,
    ) -> ApplicationResult<Collection> {
        Self::validate_name(name)?;

        let mut collection = self
            .collections
            .get_by_id(id)?
            .ok_or(crate::domain::error::DomainError::CollectionNotFound(id))?;

        collection.update(
            name.to_string(),
            description.map(|d| d.to_string()),
            color.to_string(),
            icon.map(|i| i.to_string()),
        );
        self.collections.update(&collection)?;

        self.notifier.notify();
        self.enqueue_upsert(&collection);
        Ok(collection)
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_default_collection(&self, id: i64) -> ApplicationResult<()> {
        let cleared = self.collections.set_default(&self.user_id, id)?;
        self.notifier.notify();

        // The new default and every cleared one changed; push them all
        for changed_id in cleared.into_iter().chain(std::iter::once(id)) {
            if let Some(collection) = self.collections.get_by_id(changed_id)? {
                self.enqueue_upsert(&collection);
            }
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug", fields(count = ordered_ids.len()))]
    async fn reorder_collections(&self, ordered_ids: &[i64]) -> ApplicationResult<()> {
        for (position, id) in ordered_ids.iter().enumerate() {
            self.collections.set_sort_order(*id, position as i32)?;
        }
        self.notifier.notify();

        for id in ordered_ids {
            if let Some(collection) = self.collections.get_by_id(*id)? {
                self.enqueue_upsert(&collection);
            }
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn share_collection(
        &self,
        id: i64,
        access_level: AccessLevel,
        expiry_days: Option<i64>,
    ) -> ApplicationResult<Collection> {
        let mut collection = self
            .collections
            .get_by_id(id)?
            .ok_or(crate::domain::error::DomainError::CollectionNotFound(id))?;

        collection.apply_sharing(&ShareSettings {
            is_shared: true,
            access_level,
            // URL and expiry instant are server-assigned; they land once the
            // sync worker has pushed the change
            share_url: collection.share_url.clone(),
            share_expiry: collection.share_expiry,
            expiry_days,
        });
        self.collections.update(&collection)?;

        self.notifier.notify();
        self.enqueue_sharing(&collection, expiry_days);
        Ok(collection)
    }

    #[instrument(skip(self), level = "debug")]
    async fn unshare_collection(&self, id: i64) -> ApplicationResult<Collection> {
        let mut collection = self
            .collections
            .get_by_id(id)?
            .ok_or(crate::domain::error::DomainError::CollectionNotFound(id))?;

        collection.apply_sharing(&ShareSettings {
            is_shared: false,
            access_level: collection.access_level,
            share_url: None,
            share_expiry: None,
            expiry_days: None,
        });
        self.collections.update(&collection)?;

        self.notifier.notify();
        self.enqueue_sharing(&collection, None);
        Ok(collection)
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_shared_with_me(&self) -> ApplicationResult<Vec<Collection>> {
        let dtos = self.remote.list_shared_with_me(&self.user_id).await?;
        Ok(dtos.into_iter().map(mapper::collection_from_dto).collect())
    }

    #[instrument(skip(self), level = "debug")]
    async fn follow_shared(&self, share_url: &str) -> ApplicationResult<Collection> {
        let dto = self.remote.follow_shared(share_url).await?;
        let collection = mapper::collection_from_dto(dto);

        self.collections.replace_from_remote(&collection)?;
        self.notifier.notify();
        Ok(collection)
    }

    #[instrument(skip(self), level = "debug")]
    async fn unfollow_shared(&self, id: i64) -> ApplicationResult<()> {
        self.remote.unfollow_shared(id).await?;

        self.collections.purge(id)?;
        self.notifier.notify();
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_collection(&self, id: i64) -> ApplicationResult<bool> {
        let Some(collection) = self.collections.get_by_id_any(id)? else {
            return Ok(false);
        };

        if collection.is_local() {
            // Never acknowledged by the server; the FK cascade removes any
            // dependent bookmarks with it
            self.collections.purge(id)?;
        } else {
            // Bookmarks disappear with the collection. The server cascades
            // the delete, so no per-bookmark tombstones are queued; locally
            // they stay soft-deleted until the collection purge cascades.
            let bookmark_ids: Vec<i64> = self
                .bookmarks
                .list_by_collection(id)?
                .iter()
                .map(|b| b.id)
                .collect();
            if !bookmark_ids.is_empty() {
                self.bookmarks.soft_delete_many(&bookmark_ids)?;
            }

            self.collections.soft_delete(id)?;
            self.sync.enqueue(SyncChange::new(
                &self.user_id,
                SyncEntity::Collection,
                id,
                ChangeType::Delete,
                SyncPayload::Tombstone,
            ));
        }

        self.notifier.notify();
        Ok(true)
    }

    fn observe_collections(&self) -> LiveQuery<Collection> {
        let repository = Arc::clone(&self.collections);
        let user_id = self.user_id.clone();
        LiveQuery::new(&self.notifier, move || {
            repository.list_by_user(&user_id).map_err(Into::into)
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn refresh_collections(&self) -> ApplicationResult<usize> {
        let dtos = self.remote.list_collections(&self.user_id).await?;
        let fetched = dtos.len();

        let local = self.collections.list_by_user(&self.user_id)?;
        let remote_ids: std::collections::HashSet<i64> = dtos.iter().map(|dto| dto.id).collect();

        for dto in dtos {
            let keep_local = self
                .collections
                .get_by_id_any(dto.id)?
                .map(|existing| !existing.is_synced)
                .unwrap_or(false);
            if keep_local {
                continue;
            }
            self.collections
                .replace_from_remote(&mapper::collection_from_dto(dto))?;
        }

        for collection in &local {
            if collection.is_synced
                && !collection.is_local()
                && !remote_ids.contains(&collection.id)
            {
                self.collections.purge(collection.id)?;
            }
        }

        self.notifier.notify();

        debug!("Refreshed {} collections", fetched);
        Ok(fetched)
    }
}
