// tests/common/mod.rs
//! Shared test fixtures: a scriptable in-memory remote backend.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use linkstash::application::services::bookmark_service::BookmarkService;
use linkstash::application::services::collection_service::CollectionService;
use linkstash::application::services::sync_service::{DrainPolicy, SyncService};
use linkstash::application::watch::ChangeNotifier;
use linkstash::application::{BookmarkServiceImpl, CollectionServiceImpl, SyncServiceImpl};
use linkstash::domain::repositories::bookmark_repository::BookmarkRepository;
use linkstash::domain::repositories::collection_repository::CollectionRepository;
use linkstash::infrastructure::api::dto::{
    ArchivePatch, BookmarkDto, BookmarkRequest, CollectionDto, CollectionRequest, FavoritePatch,
    ShareResponse, SharingRequest,
};
use linkstash::infrastructure::api::error::{ApiError, ApiResult};
use linkstash::infrastructure::api::remote::RemoteApi;
use linkstash::util::testing::{init_test_env, setup_test_db, TestDb};

/// The full service stack wired against a throwaway database and the
/// backend double. Must be built inside a tokio runtime (the sync worker
/// is spawned here).
pub struct TestStack {
    pub db: TestDb,
    pub mock: Arc<MockRemoteApi>,
    pub bookmarks: Arc<dyn BookmarkService>,
    pub collections: Arc<dyn CollectionService>,
    pub sync: Arc<dyn SyncService>,
}

pub fn build_stack(policy: DrainPolicy, max_retries: u32) -> TestStack {
    init_test_env();
    let db = setup_test_db();
    let mock = Arc::new(MockRemoteApi::new());

    let bookmark_repository: Arc<dyn BookmarkRepository> = Arc::new(db.bookmarks());
    let collection_repository: Arc<dyn CollectionRepository> = Arc::new(db.collections());
    let notifier = ChangeNotifier::new();

    let sync: Arc<dyn SyncService> = Arc::new(SyncServiceImpl::start(
        mock.clone(),
        Arc::clone(&bookmark_repository),
        Arc::clone(&collection_repository),
        notifier.clone(),
        policy,
        max_retries,
        "user-1",
    ));

    let bookmarks: Arc<dyn BookmarkService> = Arc::new(BookmarkServiceImpl::new(
        Arc::clone(&bookmark_repository),
        Arc::clone(&collection_repository),
        mock.clone(),
        Arc::clone(&sync),
        notifier.clone(),
        "user-1",
    ));

    let collections: Arc<dyn CollectionService> = Arc::new(CollectionServiceImpl::new(
        collection_repository,
        bookmark_repository,
        mock.clone(),
        Arc::clone(&sync),
        notifier,
        "user-1",
    ));

    TestStack {
        db,
        mock,
        bookmarks,
        collections,
        sync,
    }
}

/// Scriptable backend double: records every call, can fail the nth call (or
/// every call) with a chosen HTTP status, assigns server ids from 1000 up.
#[derive(Debug, Default)]
pub struct MockRemoteApi {
    calls: Mutex<Vec<String>>,
    // 1-based call index -> status; index 0 fails every call
    failures: Mutex<HashMap<usize, u16>>,
    call_count: AtomicUsize,
    next_id: AtomicI64,
    remote_bookmarks: Mutex<Vec<BookmarkDto>>,
    remote_collections: Mutex<Vec<CollectionDto>>,
}

impl MockRemoteApi {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1000),
            ..Default::default()
        }
    }

    pub fn fail_on_call(&self, index: usize, status: u16) {
        self.failures.lock().unwrap().insert(index, status);
    }

    pub fn fail_all(&self, status: u16) {
        self.failures.lock().unwrap().insert(0, status);
    }

    pub fn succeed(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn set_remote_bookmarks(&self, dtos: Vec<BookmarkDto>) {
        *self.remote_bookmarks.lock().unwrap() = dtos;
    }

    pub fn set_remote_collections(&self, dtos: Vec<CollectionDto>) {
        *self.remote_collections.lock().unwrap() = dtos;
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, label: String) -> ApiResult<()> {
        self.calls.lock().unwrap().push(label.clone());
        let index = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;

        let failures = self.failures.lock().unwrap();
        if let Some(status) = failures.get(&0).or_else(|| failures.get(&index)) {
            return Err(ApiError::api(
                *status,
                format!("injected failure on {}", label),
            ));
        }
        Ok(())
    }

    fn server_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn bookmark_dto(id: i64, collection_id: i64, title: &str, url: &str) -> BookmarkDto {
        let now = Utc::now();
        BookmarkDto {
            id,
            collection_id,
            title: title.to_string(),
            url: url.to_string(),
            description: None,
            favicon_url: None,
            image_url: None,
            is_favorite: false,
            is_archived: false,
            tags: vec![],
            created_at: now,
            updated_at: now,
            last_opened: None,
            open_count: 0,
        }
    }

    fn bookmark_from_request(id: i64, request: &BookmarkRequest) -> BookmarkDto {
        let now = Utc::now();
        BookmarkDto {
            id,
            collection_id: request.collection_id,
            title: request.title.clone(),
            url: request.url.clone(),
            description: request.description.clone(),
            favicon_url: None,
            image_url: None,
            is_favorite: false,
            is_archived: false,
            tags: request.tags.clone(),
            created_at: now,
            updated_at: now,
            last_opened: None,
            open_count: 0,
        }
    }

    pub fn collection_dto(id: i64, user_id: &str, name: &str) -> CollectionDto {
        let now = Utc::now();
        CollectionDto {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: None,
            color: "#6366F1".to_string(),
            icon: None,
            created_at: now,
            updated_at: now,
            item_count: 0,
            is_default: false,
            is_shared: false,
            share_url: None,
            share_expiry: None,
            access_level: "view".to_string(),
            sort_order: 0,
        }
    }

    fn collection_from_request(id: i64, user_id: &str, request: &CollectionRequest) -> CollectionDto {
        let now = Utc::now();
        CollectionDto {
            id,
            user_id: user_id.to_string(),
            name: request.name.clone(),
            description: request.description.clone(),
            color: request.color.clone(),
            icon: request.icon.clone(),
            created_at: now,
            updated_at: now,
            item_count: 0,
            is_default: request.is_default,
            is_shared: request.is_shared,
            share_url: None,
            share_expiry: None,
            access_level: request.access_level.clone(),
            sort_order: 0,
        }
    }
}

#[async_trait]
impl RemoteApi for MockRemoteApi {
    async fn list_collections(&self, _user_id: &str) -> ApiResult<Vec<CollectionDto>> {
        self.record("list_collections".to_string())?;
        Ok(self.remote_collections.lock().unwrap().clone())
    }

    async fn get_collection(&self, id: i64) -> ApiResult<CollectionDto> {
        self.record(format!("get_collection:{}", id))?;
        Ok(Self::collection_dto(id, "user-1", "remote"))
    }

    async fn create_collection(
        &self,
        user_id: &str,
        request: &CollectionRequest,
    ) -> ApiResult<CollectionDto> {
        self.record(format!("create_collection:{}", request.name))?;
        Ok(Self::collection_from_request(
            self.server_id(),
            user_id,
            request,
        ))
    }

    async fn update_collection(
        &self,
        id: i64,
        request: &CollectionRequest,
    ) -> ApiResult<CollectionDto> {
        self.record(format!("update_collection:{}", id))?;
        Ok(Self::collection_from_request(id, "user-1", request))
    }

    async fn delete_collection(&self, id: i64) -> ApiResult<()> {
        self.record(format!("delete_collection:{}", id))
    }

    async fn share_collection(
        &self,
        id: i64,
        _request: &SharingRequest,
    ) -> ApiResult<ShareResponse> {
        self.record(format!("share_collection:{}", id))?;
        Ok(ShareResponse {
            share_url: format!("https://share.example.com/c{}", id),
            expires_at: None,
        })
    }

    async fn update_sharing(&self, id: i64, _request: &SharingRequest) -> ApiResult<ShareResponse> {
        self.record(format!("update_sharing:{}", id))?;
        Ok(ShareResponse {
            share_url: format!("https://share.example.com/c{}", id),
            expires_at: None,
        })
    }

    async fn list_shared_with_me(&self, _user_id: &str) -> ApiResult<Vec<CollectionDto>> {
        self.record("list_shared_with_me".to_string())?;
        Ok(self.remote_collections.lock().unwrap().clone())
    }

    async fn follow_shared(&self, share_url: &str) -> ApiResult<CollectionDto> {
        self.record(format!("follow_shared:{}", share_url))?;
        let mut dto = Self::collection_dto(self.server_id(), "other-user", "followed");
        dto.is_shared = true;
        dto.share_url = Some(share_url.to_string());
        Ok(dto)
    }

    async fn unfollow_shared(&self, id: i64) -> ApiResult<()> {
        self.record(format!("unfollow_shared:{}", id))
    }

    async fn list_bookmarks(&self, collection_id: i64) -> ApiResult<Vec<BookmarkDto>> {
        self.record(format!("list_bookmarks:{}", collection_id))?;
        Ok(self.remote_bookmarks.lock().unwrap().clone())
    }

    async fn get_bookmark(&self, id: i64) -> ApiResult<BookmarkDto> {
        self.record(format!("get_bookmark:{}", id))?;
        Ok(Self::bookmark_dto(id, 1, "remote", "https://example.com"))
    }

    async fn create_bookmark(&self, request: &BookmarkRequest) -> ApiResult<BookmarkDto> {
        self.record(format!("create_bookmark:{}", request.url))?;
        Ok(Self::bookmark_from_request(self.server_id(), request))
    }

    async fn update_bookmark(&self, id: i64, request: &BookmarkRequest) -> ApiResult<BookmarkDto> {
        self.record(format!("update_bookmark:{}", id))?;
        Ok(Self::bookmark_from_request(id, request))
    }

    async fn patch_favorite(&self, id: i64, patch: &FavoritePatch) -> ApiResult<BookmarkDto> {
        self.record(format!("patch_favorite:{}:{}", id, patch.is_favorite))?;
        let mut dto = Self::bookmark_dto(id, 1, "remote", "https://example.com");
        dto.is_favorite = patch.is_favorite;
        Ok(dto)
    }

    async fn patch_archive(&self, id: i64, patch: &ArchivePatch) -> ApiResult<BookmarkDto> {
        self.record(format!("patch_archive:{}:{}", id, patch.is_archived))?;
        let mut dto = Self::bookmark_dto(id, 1, "remote", "https://example.com");
        dto.is_archived = patch.is_archived;
        Ok(dto)
    }

    async fn delete_bookmark(&self, id: i64) -> ApiResult<()> {
        self.record(format!("delete_bookmark:{}", id))
    }

    async fn search_bookmarks(&self, query: &str) -> ApiResult<Vec<BookmarkDto>> {
        self.record(format!("search_bookmarks:{}", query))?;
        Ok(self.remote_bookmarks.lock().unwrap().clone())
    }
}
