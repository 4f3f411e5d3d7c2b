//! Chunked upload scratch area.
//!
//! Large files arrive as numbered multipart chunks, one request each.
//! Chunks land on local disk as `{scratch}/{owner}/{file}.part{index}` and
//! are only stitched together once the final chunk arrives. Abandoned parts
//! are swept by age (see `sweeper`).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Failures in the upload pipeline, from chunk receipt to compression.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// A chunk never arrived before reassembly.
    #[error("missing chunk {index} of \"{file}\"")]
    MissingChunk {
        /// Sanitized file name the chunks belong to.
        file: String,
        /// Index of the first missing chunk.
        index: u32,
    },

    /// The file extension matches neither the image nor the video list.
    #[error("unsupported media type: .{extension}")]
    UnsupportedMediaType {
        /// Lowercased extension, empty if the name has none.
        extension: String,
    },

    /// Recompression failed.
    #[error("{0}")]
    Compression(String),

    /// The scratch directory could not be read or written.
    #[error("scratch I/O error: {0}")]
    Scratch(#[from] std::io::Error),
}

/// On-disk store for upload chunks awaiting reassembly.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn part_path(&self, owner: &str, file: &str, index: u32) -> PathBuf {
        self.root.join(owner).join(format!("{file}.part{index}"))
    }

    /// Persist one chunk of a file.
    ///
    /// # Errors
    ///
    /// Returns a scratch error if the part cannot be written.
    pub async fn save_chunk(
        &self,
        owner: &str,
        file: &str,
        index: u32,
        bytes: &[u8],
    ) -> Result<(), UploadError> {
        tokio::fs::create_dir_all(self.root.join(owner)).await?;
        tokio::fs::write(self.part_path(owner, file, index), bytes).await?;
        Ok(())
    }

    /// Stitch all `total` chunks back into one byte buffer, then delete
    /// the parts.
    ///
    /// # Errors
    ///
    /// Returns `MissingChunk` for the first absent part; the present parts
    /// are left in place for the sweeper in that case.
    pub async fn reassemble(
        &self,
        owner: &str,
        file: &str,
        total: u32,
    ) -> Result<Vec<u8>, UploadError> {
        let mut assembled = Vec::new();
        for index in 0..total {
            let path = self.part_path(owner, file, index);
            match tokio::fs::read(&path).await {
                Ok(mut bytes) => assembled.append(&mut bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(UploadError::MissingChunk {
                        file: file.to_string(),
                        index,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        for index in 0..total {
            let path = self.part_path(owner, file, index);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::debug!(path = %path.display(), error = %e, "Failed to remove spent chunk");
            }
        }

        Ok(assembled)
    }

    /// Delete parts older than `ttl`. Returns how many files were removed.
    ///
    /// # Errors
    ///
    /// Returns a scratch error if a directory listing fails; a missing
    /// scratch root counts as nothing to sweep.
    pub async fn sweep(&self, ttl: Duration) -> Result<usize, UploadError> {
        let mut owners = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(owner) = owners.next_entry().await? {
            if !owner.file_type().await?.is_dir() {
                continue;
            }
            removed += sweep_dir(&owner.path(), ttl).await?;
        }
        Ok(removed)
    }
}

async fn sweep_dir(dir: &Path, ttl: Duration) -> Result<usize, UploadError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let age = metadata
            .modified()
            .ok()
            .and_then(|t| t.elapsed().ok())
            .unwrap_or(Duration::ZERO);
        if age >= ttl {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}
