//! The media store adapter.
//!
//! Sits on top of [`BlobApi`] and owns everything the service knows about
//! stored media: the `{owner}/{filename}` / `{owner}/compressed/{filename}`
//! layout, folder placeholders, task-name recovery from filenames, and
//! signed-URL minting behind a TTL cache.

use std::sync::Arc;
use std::time::Duration;

use scavhunt_core::media::{task_display, task_from_filename, task_safe};
use scavhunt_core::{MediaObject, Variant};

use crate::blob::BlobApi;
use crate::error::Result;
use crate::url_cache::SignedUrlCache;

/// Content type for the zero-byte folder placeholder objects.
const FOLDER_CONTENT_TYPE: &str = "application/x-directory";

/// Media operations over the blob store.
pub struct MediaStore {
    blob: Arc<dyn BlobApi>,
    bucket: String,
    cache: SignedUrlCache,
    url_ttl: Duration,
}

impl MediaStore {
    /// Create a media store over a blob backend.
    ///
    /// `url_ttl` is the validity window requested for signed URLs; minted
    /// URLs are cached for 90% of it so a cached URL is never handed out
    /// close to its expiry.
    #[must_use]
    pub fn new(blob: Arc<dyn BlobApi>, bucket: impl Into<String>, url_ttl: Duration) -> Self {
        Self {
            blob,
            bucket: bucket.into(),
            cache: SignedUrlCache::new(),
            url_ttl,
        }
    }

    /// Mint (or reuse) a signed URL for an object path.
    ///
    /// # Errors
    ///
    /// Returns a read error if the backend refuses to sign.
    pub async fn signed_url(&self, path: &str) -> Result<String> {
        if let Some(url) = self.cache.get(&self.bucket, path).await {
            return Ok(url);
        }
        let url = self.blob.sign_url(path, self.url_ttl.as_secs()).await?;
        self.cache
            .insert(&self.bucket, path, url.clone(), self.url_ttl.mul_f64(0.9))
            .await;
        Ok(url)
    }

    /// Make sure the owner's folder placeholders exist.
    ///
    /// Probes with a single-result listing first to skip the redundant
    /// writes. Two concurrent first uploads may both create the
    /// placeholders; the duplicate put is harmless.
    ///
    /// # Errors
    ///
    /// Returns a store error if the probe or a placeholder write fails.
    pub async fn ensure_owner_folders(&self, owner: &str) -> Result<()> {
        let prefix = Variant::Original.prefix(owner);
        let existing = self.blob.list_objects(&prefix, Some(1)).await?;
        if !existing.is_empty() {
            return Ok(());
        }
        tracing::debug!(owner = %owner, "creating media folders");
        self.blob
            .put_object(&prefix, Vec::new(), FOLDER_CONTENT_TYPE)
            .await?;
        self.blob
            .put_object(&Variant::Compressed.prefix(owner), Vec::new(), FOLDER_CONTENT_TYPE)
            .await?;
        Ok(())
    }

    /// Store one variant of an upload. Returns the object path.
    ///
    /// # Errors
    ///
    /// Returns a write error if the put fails; the object may still have
    /// landed if the failure was a timeout.
    pub async fn upload(
        &self,
        owner: &str,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
        variant: Variant,
    ) -> Result<String> {
        let path = variant.object_path(owner, filename);
        tracing::debug!(object = %path, size = bytes.len(), "storing media");
        self.blob.put_object(&path, bytes, content_type).await?;
        Ok(path)
    }

    /// List one owner's media (the compressed variants, which are what
    /// reviewers and galleries see), each with a signed URL attached and
    /// the task name recovered from the filename. Sorted by upload time
    /// ascending; objects without a timestamp sort last.
    ///
    /// # Errors
    ///
    /// Returns a read error if the listing or any URL signing fails.
    pub async fn list_media(&self, owner: &str) -> Result<Vec<MediaObject>> {
        let prefix = Variant::Compressed.prefix(owner);
        let objects = self.blob.list_objects(&prefix, None).await?;

        let mut media = Vec::with_capacity(objects.len());
        for object in objects {
            if object.name.ends_with('/') {
                continue; // folder placeholder
            }
            let Some(filename) = object.name.strip_prefix(&prefix) else {
                continue;
            };
            let filename = filename.to_string();
            let task = task_from_filename(&filename)
                .unwrap_or_else(|| task_display(&filename));
            let url = self.signed_url(&object.name).await?;
            media.push(MediaObject {
                path: object.name,
                filename,
                owner: owner.to_string(),
                task,
                content_type: object.content_type,
                url,
                uploaded_at: object.updated,
            });
        }

        media.sort_by(|a, b| {
            let key = |m: &MediaObject| (m.uploaded_at.is_none(), m.uploaded_at, m.filename.clone());
            key(a).cmp(&key(b))
        });
        Ok(media)
    }

    /// Delete every object of one variant whose filename belongs to
    /// `(owner, task)`. Returns how many objects were removed; zero
    /// matches is not an error.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing or a delete fails.
    pub async fn delete_media(&self, owner: &str, task: &str, variant: Variant) -> Result<usize> {
        let prefix = variant.prefix(owner);
        let needle = format!("{}_", task_safe(task));
        let objects = self.blob.list_objects(&prefix, None).await?;

        let mut deleted = 0;
        for object in objects {
            let Some(filename) = object.name.strip_prefix(&prefix) else {
                continue;
            };
            if filename.starts_with(&needle) {
                self.blob.delete_object(&object.name).await?;
                deleted += 1;
            }
        }
        tracing::debug!(owner = %owner, task = %task, deleted, "deleted media");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use scavhunt_core::media::encode_filename;

    use crate::memory::MemoryBucket;

    fn store(bucket: Arc<MemoryBucket>, url_ttl: Duration) -> MediaStore {
        MediaStore::new(bucket, "hunt-media", url_ttl)
    }

    #[tokio::test]
    async fn upload_then_list_round_trip() {
        let bucket = Arc::new(MemoryBucket::new());
        let media = store(Arc::clone(&bucket), Duration::from_secs(60));

        let filename = encode_filename("Find a cat", "proof.jpg");
        media
            .upload("alice", &filename, vec![1, 2], "image/jpeg", Variant::Original)
            .await
            .unwrap();
        media
            .upload("alice", &filename, vec![3], "image/jpeg", Variant::Compressed)
            .await
            .unwrap();

        let listed = media.list_media("alice").await.unwrap();
        assert_eq!(listed.len(), 1);
        let object = &listed[0];
        assert_eq!(object.task, "Find a cat");
        assert_eq!(object.owner, "alice");
        assert_eq!(object.filename, "Find-a-cat_proof.jpg");
        assert!(object.is_image());
        assert!(object.url.starts_with("https://blobs.test/"));
    }

    #[tokio::test]
    async fn folder_placeholders_are_created_once_and_never_listed() {
        let bucket = Arc::new(MemoryBucket::new());
        let media = store(Arc::clone(&bucket), Duration::from_secs(60));

        media.ensure_owner_folders("alice").await.unwrap();
        assert_eq!(bucket.object_count().await, 2);

        // Second call probes and skips the writes.
        media.ensure_owner_folders("alice").await.unwrap();
        assert_eq!(bucket.object_count().await, 2);

        assert!(media.list_media("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_media_matches_the_task_prefix_only() {
        let bucket = Arc::new(MemoryBucket::new());
        let media = store(Arc::clone(&bucket), Duration::from_secs(60));

        for task in ["Find a cat", "Find a dog"] {
            let filename = encode_filename(task, "proof.jpg");
            media
                .upload("alice", &filename, vec![1], "image/jpeg", Variant::Original)
                .await
                .unwrap();
            media
                .upload("alice", &filename, vec![2], "image/jpeg", Variant::Compressed)
                .await
                .unwrap();
        }

        let deleted = media
            .delete_media("alice", "Find a cat", Variant::Compressed)
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(!bucket.contains("alice/compressed/Find-a-cat_proof.jpg").await);
        assert!(bucket.contains("alice/compressed/Find-a-dog_proof.jpg").await);
        // The original variant is untouched until asked.
        assert!(bucket.contains("alice/Find-a-cat_proof.jpg").await);

        let none = media
            .delete_media("alice", "Find a fox", Variant::Original)
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn signed_urls_are_reused_within_the_ttl() {
        let bucket = Arc::new(MemoryBucket::new());
        let media = store(Arc::clone(&bucket), Duration::from_secs(60));

        let first = media.signed_url("alice/x.jpg").await.unwrap();
        let second = media.signed_url("alice/x.jpg").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn signed_urls_are_reminted_after_expiry() {
        let bucket = Arc::new(MemoryBucket::new());
        // 100ms validity caches for 90ms.
        let media = store(Arc::clone(&bucket), Duration::from_millis(100));

        let first = media.signed_url("alice/x.jpg").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        let second = media.signed_url("alice/x.jpg").await.unwrap();
        assert_ne!(first, second);
    }
}
