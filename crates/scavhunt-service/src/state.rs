//! Application state.

use std::sync::Arc;
use std::time::Duration;

use scavhunt_ledger::Ledger;
use scavhunt_store::{BlobApi, MediaStore, TableApi};

use crate::auth::SessionStore;
use crate::config::ServiceConfig;
use crate::upload::ChunkStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The activity ledger over the tabular store.
    pub ledger: Ledger,

    /// Media storage with variant layout and signed URL minting.
    pub media: Arc<MediaStore>,

    /// In-memory bearer-token sessions.
    pub sessions: SessionStore,

    /// Scratch area for chunked uploads.
    pub chunks: ChunkStore,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state over table and blob backends.
    #[must_use]
    pub fn new(tables: Arc<dyn TableApi>, blob: Arc<dyn BlobApi>, config: ServiceConfig) -> Self {
        let ledger = Ledger::new(tables, config.utc_offset_minutes);
        let media = Arc::new(MediaStore::new(
            blob,
            config.blob_bucket.clone(),
            Duration::from_secs(config.signed_url_ttl_seconds),
        ));
        let sessions = SessionStore::new(Duration::from_secs(config.session_ttl_seconds));
        let chunks = ChunkStore::new(&config.scratch_dir);

        if config.organizer_access_key.is_none() {
            tracing::warn!("Organizer access key not configured - review endpoints are locked");
        }

        Self {
            ledger,
            media,
            sessions,
            chunks,
            config,
        }
    }
}
