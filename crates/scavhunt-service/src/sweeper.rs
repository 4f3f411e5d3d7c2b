//! Background sweep of abandoned upload chunks.
//!
//! A client that never sends its final chunk leaves parts behind in the
//! scratch directory. A periodic task removes parts older than the
//! configured TTL so the scratch disk cannot fill up.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::upload::ChunkStore;

/// Spawn the periodic chunk sweeper.
///
/// The task runs until `shutdown` observes a change, then exits.
pub fn start_chunk_sweeper(
    chunks: ChunkStore,
    ttl: Duration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => match chunks.sweep(ttl).await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "Swept stale upload chunks"),
                    Err(error) => tracing::warn!(%error, "Chunk sweep failed"),
                },
                _ = shutdown.changed() => {
                    tracing::debug!("Chunk sweeper stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn sweeper_clears_stale_parts_and_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let chunks = ChunkStore::new(dir.path());
        chunks.save_chunk("alice", "clip.mp4", 0, b"x").await.unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = start_chunk_sweeper(
            chunks,
            Duration::from_millis(1),
            Duration::from_millis(10),
            rx,
        );

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!dir.path().join("alice").join("clip.mp4.part0").exists());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn sweeper_spares_fresh_parts() {
        let dir = TempDir::new().unwrap();
        let chunks = ChunkStore::new(dir.path());
        chunks.save_chunk("alice", "clip.mp4", 0, b"x").await.unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = start_chunk_sweeper(
            chunks,
            Duration::from_secs(3600),
            Duration::from_millis(10),
            rx,
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(dir.path().join("alice").join("clip.mp4.part0").exists());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
