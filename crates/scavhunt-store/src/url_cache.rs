//! Signed-URL cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// A process-local cache of signed URLs, keyed by `(bucket, object path)`.
///
/// Entries expire passively: an expired entry is dropped when it is next
/// looked up, never by a background sweep. The map is unbounded; the key
/// space is one entry per stored object, which stays small for a hunt.
/// Access is serialized through a mutex; two tasks racing to populate the
/// same key both mint, and the later insert wins, which is harmless since
/// both URLs are valid.
pub struct SignedUrlCache {
    entries: Mutex<HashMap<(String, String), CacheEntry>>,
}

struct CacheEntry {
    url: String,
    expires_at: Instant,
}

impl SignedUrlCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a cached URL, dropping it if it has expired.
    pub async fn get(&self, bucket: &str, path: &str) -> Option<String> {
        let key = (bucket.to_string(), path.to_string());
        let mut entries = self.entries.lock().await;
        match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.url.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Cache a URL for `ttl`.
    pub async fn insert(&self, bucket: &str, path: &str, url: String, ttl: Duration) {
        let key = (bucket.to_string(), path.to_string());
        self.entries.lock().await.insert(
            key,
            CacheEntry {
                url,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl Default for SignedUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hit_within_ttl() {
        let cache = SignedUrlCache::new();
        cache
            .insert("b", "a/x.jpg", "https://signed/1".into(), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("b", "a/x.jpg").await.as_deref(), Some("https://signed/1"));
    }

    #[tokio::test]
    async fn keys_are_scoped_by_bucket() {
        let cache = SignedUrlCache::new();
        cache
            .insert("b1", "a/x.jpg", "https://signed/1".into(), Duration::from_secs(60))
            .await;
        assert!(cache.get("b2", "a/x.jpg").await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_read() {
        let cache = SignedUrlCache::new();
        cache
            .insert("b", "a/x.jpg", "https://signed/1".into(), Duration::from_millis(10))
            .await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(cache.get("b", "a/x.jpg").await.is_none());
        assert_eq!(cache.len().await, 0);
    }
}
