//! The blob store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Metadata for one stored object, as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Full object name (slash-separated path within the bucket).
    pub name: String,
    /// Content type recorded at upload.
    pub content_type: String,
    /// Object size in bytes.
    pub size: u64,
    /// When the object was last written, if the backend reports it.
    pub updated: Option<DateTime<Utc>>,
}

/// Access to the remote blob store.
///
/// Object names are plain strings; the `{owner}/...` layout is imposed by
/// the [`crate::MediaStore`] adapter on top, not by this contract. Puts and
/// deletes are atomic per object; nothing spanning objects is. No method
/// retries.
#[async_trait]
pub trait BlobApi: Send + Sync {
    /// List objects under a name prefix, lexicographically ordered.
    ///
    /// `max_results` caps the listing server-side; existence probes pass 1.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Read`] if the call fails.
    async fn list_objects(&self, prefix: &str, max_results: Option<u32>)
        -> Result<Vec<ObjectInfo>>;

    /// Write an object, replacing any existing object of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Write`] on failure; the write may still
    /// have landed if the failure was a timeout.
    async fn put_object(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Delete an object. Deleting a missing object is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Write`] on failure.
    async fn delete_object(&self, name: &str) -> Result<()>;

    /// Mint a signed URL valid for `ttl_seconds`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Read`] if the call fails.
    async fn sign_url(&self, name: &str, ttl_seconds: u64) -> Result<String>;
}
