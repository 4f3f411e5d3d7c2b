//! HTTP client for the blob store backend.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::blob::{BlobApi, ObjectInfo};
use crate::error::{Result, StoreError};

/// Timeout for blob calls. Uploads carry media payloads, so this is looser
/// than the workbook timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the bucket API.
#[derive(Debug, Clone)]
pub struct BucketClient {
    client: Client,
    base_url: String,
    bucket: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    objects: Vec<ObjectEntry>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    name: String,
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct SignRequest {
    ttl_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    url: String,
}

impl BucketClient {
    /// Create a new bucket client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base URL (e.g. `"https://blobs.example.com"`)
    /// * `bucket` - bucket name
    /// * `api_token` - bearer token for the API
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            api_token: api_token.into(),
        }
    }

    fn bucket_url(&self) -> String {
        format!(
            "{}/v1/buckets/{}",
            self.base_url,
            urlencoding::encode(&self.bucket)
        )
    }

    /// Object names contain slashes; they travel percent-encoded as a
    /// single path segment.
    fn object_url(&self, name: &str) -> String {
        format!("{}/objects/{}", self.bucket_url(), urlencoding::encode(name))
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.api_token)
    }
}

#[async_trait]
impl BlobApi for BucketClient {
    async fn list_objects(
        &self,
        prefix: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<ObjectInfo>> {
        tracing::debug!(prefix = %prefix, "listing objects");
        let url = format!("{}/objects", self.bucket_url());
        let mut request = self
            .client
            .get(&url)
            .query(&[("prefix", prefix)])
            .header("Authorization", self.auth());
        if let Some(max) = max_results {
            request = request.query(&[("max_results", max)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::read(prefix, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::read(prefix, format!("status {status}: {body}")));
        }
        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| StoreError::read(prefix, format!("invalid response body: {e}")))?;

        Ok(body
            .objects
            .into_iter()
            .map(|o| ObjectInfo {
                name: o.name,
                content_type: o.content_type,
                size: o.size,
                updated: o.updated,
            })
            .collect())
    }

    async fn put_object(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        tracing::debug!(object = %name, size = bytes.len(), "putting object");
        let url = format!("{}/objects", self.bucket_url());
        let response = self
            .client
            .post(&url)
            .query(&[("name", name)])
            .header("Authorization", self.auth())
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::write(name, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::write(name, format!("status {status}: {body}")));
        }
        Ok(())
    }

    async fn delete_object(&self, name: &str) -> Result<()> {
        tracing::debug!(object = %name, "deleting object");
        let response = self
            .client
            .delete(self.object_url(name))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| StoreError::write(name, e.to_string()))?;
        let status = response.status();
        // Deletion is idempotent: a missing object is already gone.
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::write(name, format!("status {status}: {body}")));
        }
        Ok(())
    }

    async fn sign_url(&self, name: &str, ttl_seconds: u64) -> Result<String> {
        tracing::debug!(object = %name, ttl_seconds, "signing url");
        let url = format!("{}:signedUrl", self.object_url(name));
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .json(&SignRequest { ttl_seconds })
            .send()
            .await
            .map_err(|e| StoreError::read(name, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::read(name, format!("status {status}: {body}")));
        }
        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| StoreError::read(name, format!("invalid response body: {e}")))?;
        Ok(body.url)
    }
}
