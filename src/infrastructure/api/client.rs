// src/infrastructure/api/client.rs
//! reqwest implementation of the remote backend contract.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

use crate::infrastructure::api::dto::{
    ApiErrorResponse, ArchivePatch, BookmarkDto, BookmarkRequest, CollectionDto,
    CollectionRequest, FavoritePatch, ShareResponse, SharingRequest,
};
use crate::infrastructure::api::error::{ApiError, ApiResult};
use crate::infrastructure::api::remote::RemoteApi;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Client for the linkstash backend REST API.
#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemoteApi {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the backend (e.g., "https://api.linkstash.app")
    /// * `token` - Optional bearer token; `None` sends unauthenticated requests
    pub fn new(base_url: &str, token: Option<String>) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn headers(&self) -> ApiResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.token {
            let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::invalid_request("Invalid access token format"))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    fn error_from_body(status: reqwest::StatusCode, body: &str) -> ApiError {
        if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(body) {
            return ApiError::api(
                status.as_u16(),
                format!("{}: {}", error.code, error.message),
            );
        }
        ApiError::api(status.as_u16(), format!("Request failed: {}", body))
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> ApiResult<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::error_from_body(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            debug!("Failed to deserialize response. Body: {}, Error: {}", body, e);
            ApiError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    /// Parse a response whose body is irrelevant on success (deletes).
    async fn parse_empty_response(response: reqwest::Response) -> ApiResult<()> {
        let status = response.status();
        if status.is_success() {
            debug!("API response status: {}", status);
            return Ok(());
        }

        let body = response.text().await?;
        Self::log_response(status, &body);
        Err(Self::error_from_body(status, &body))
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    /// GET /api/v1/collections?user_id={userId}
    async fn list_collections(&self, user_id: &str) -> ApiResult<Vec<CollectionDto>> {
        let url = format!("{}/api/v1/collections", self.base_url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[("user_id", user_id)])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// GET /api/v1/collections/{id}
    async fn get_collection(&self, id: i64) -> ApiResult<CollectionDto> {
        let url = format!("{}/api/v1/collections/{}", self.base_url, id);

        let response = self.client.get(&url).headers(self.headers()?).send().await?;

        Self::parse_response(response).await
    }

    /// POST /api/v1/collections?user_id={userId}
    async fn create_collection(
        &self,
        user_id: &str,
        request: &CollectionRequest,
    ) -> ApiResult<CollectionDto> {
        let url = format!("{}/api/v1/collections", self.base_url);
        debug!("Creating collection: {}", request.name);

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .query(&[("user_id", user_id)])
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// PUT /api/v1/collections/{id}
    async fn update_collection(
        &self,
        id: i64,
        request: &CollectionRequest,
    ) -> ApiResult<CollectionDto> {
        let url = format!("{}/api/v1/collections/{}", self.base_url, id);

        let response = self
            .client
            .put(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// DELETE /api/v1/collections/{id}
    async fn delete_collection(&self, id: i64) -> ApiResult<()> {
        let url = format!("{}/api/v1/collections/{}", self.base_url, id);

        let response = self
            .client
            .delete(&url)
            .headers(self.headers()?)
            .send()
            .await?;

        Self::parse_empty_response(response).await
    }

    /// POST /api/v1/collections/{id}/share
    async fn share_collection(
        &self,
        id: i64,
        request: &SharingRequest,
    ) -> ApiResult<ShareResponse> {
        let url = format!("{}/api/v1/collections/{}/share", self.base_url, id);

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// PATCH /api/v1/collections/{id}/share
    async fn update_sharing(&self, id: i64, request: &SharingRequest) -> ApiResult<ShareResponse> {
        let url = format!("{}/api/v1/collections/{}/share", self.base_url, id);

        let response = self
            .client
            .patch(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// GET /api/v1/collections/shared-with-me?user_id={userId}
    async fn list_shared_with_me(&self, user_id: &str) -> ApiResult<Vec<CollectionDto>> {
        let url = format!("{}/api/v1/collections/shared-with-me", self.base_url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[("user_id", user_id)])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// POST /api/v1/collections/follow
    async fn follow_shared(&self, share_url: &str) -> ApiResult<CollectionDto> {
        let url = format!("{}/api/v1/collections/follow", self.base_url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&serde_json::json!({ "share_url": share_url }))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// DELETE /api/v1/collections/{id}/follow
    async fn unfollow_shared(&self, id: i64) -> ApiResult<()> {
        let url = format!("{}/api/v1/collections/{}/follow", self.base_url, id);

        let response = self
            .client
            .delete(&url)
            .headers(self.headers()?)
            .send()
            .await?;

        Self::parse_empty_response(response).await
    }

    /// GET /api/v1/collections/{collectionId}/bookmarks
    async fn list_bookmarks(&self, collection_id: i64) -> ApiResult<Vec<BookmarkDto>> {
        let url = format!(
            "{}/api/v1/collections/{}/bookmarks",
            self.base_url, collection_id
        );

        let response = self.client.get(&url).headers(self.headers()?).send().await?;

        Self::parse_response(response).await
    }

    /// GET /api/v1/bookmarks/{id}
    async fn get_bookmark(&self, id: i64) -> ApiResult<BookmarkDto> {
        let url = format!("{}/api/v1/bookmarks/{}", self.base_url, id);

        let response = self.client.get(&url).headers(self.headers()?).send().await?;

        Self::parse_response(response).await
    }

    /// POST /api/v1/bookmarks
    async fn create_bookmark(&self, request: &BookmarkRequest) -> ApiResult<BookmarkDto> {
        let url = format!("{}/api/v1/bookmarks", self.base_url);
        debug!("Creating bookmark: {}", request.url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// PUT /api/v1/bookmarks/{id}
    async fn update_bookmark(&self, id: i64, request: &BookmarkRequest) -> ApiResult<BookmarkDto> {
        let url = format!("{}/api/v1/bookmarks/{}", self.base_url, id);

        let response = self
            .client
            .put(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// PATCH /api/v1/bookmarks/{id}/favorite
    async fn patch_favorite(&self, id: i64, patch: &FavoritePatch) -> ApiResult<BookmarkDto> {
        let url = format!("{}/api/v1/bookmarks/{}/favorite", self.base_url, id);

        let response = self
            .client
            .patch(&url)
            .headers(self.headers()?)
            .json(patch)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// PATCH /api/v1/bookmarks/{id}/archive
    async fn patch_archive(&self, id: i64, patch: &ArchivePatch) -> ApiResult<BookmarkDto> {
        let url = format!("{}/api/v1/bookmarks/{}/archive", self.base_url, id);

        let response = self
            .client
            .patch(&url)
            .headers(self.headers()?)
            .json(patch)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// DELETE /api/v1/bookmarks/{id}
    async fn delete_bookmark(&self, id: i64) -> ApiResult<()> {
        let url = format!("{}/api/v1/bookmarks/{}", self.base_url, id);

        let response = self
            .client
            .delete(&url)
            .headers(self.headers()?)
            .send()
            .await?;

        Self::parse_empty_response(response).await
    }

    /// GET /api/v1/bookmarks/search?q={query}
    async fn search_bookmarks(&self, query: &str) -> ApiResult<Vec<BookmarkDto>> {
        let url = format!("{}/api/v1/bookmarks/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[("q", query)])
            .send()
            .await?;

        Self::parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = HttpRemoteApi::new("https://api.example.com/", None).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
    }

    #[test]
    fn empty_token_means_unauthenticated() {
        let client = HttpRemoteApi::new("https://api.example.com", Some(String::new())).unwrap();
        assert!(client.token.is_none());

        let headers = client.headers().unwrap();
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn token_lands_in_authorization_header() {
        let client =
            HttpRemoteApi::new("https://api.example.com", Some("secret".to_string())).unwrap();

        let headers = client.headers().unwrap();
        assert_eq!(
            headers.get(AUTHORIZATION).unwrap().to_str().unwrap(),
            "Bearer secret"
        );
    }
}
