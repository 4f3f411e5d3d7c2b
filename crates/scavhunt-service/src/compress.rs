//! Media recompression.
//!
//! Every upload is stored twice: the original bytes untouched, and a
//! smaller copy for review and gallery pages. Images are re-encoded as
//! reduced-quality JPEG in-process; videos are handed to an external
//! encoder (ffmpeg by default) at a reduced bitrate, keeping their
//! container format.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use uuid::Uuid;

use crate::upload::UploadError;

/// Extensions handled by the in-process image path.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Extensions handed to the external video encoder.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

/// Which compression path a file takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Re-encoded as JPEG in-process.
    Image,
    /// Re-encoded by the external video encoder.
    Video,
}

/// A recompressed copy ready for the blob store.
#[derive(Debug)]
pub struct Compressed {
    /// The recompressed bytes.
    pub bytes: Vec<u8>,
    /// Content type of the recompressed copy.
    pub content_type: String,
}

/// Decide the compression path from the file extension.
///
/// # Errors
///
/// Returns `UnsupportedMediaType` for anything outside the two lists.
pub fn classify(filename: &str) -> Result<MediaKind, UploadError> {
    let extension = extension_of(filename);
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Ok(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Ok(MediaKind::Video)
    } else {
        Err(UploadError::UnsupportedMediaType { extension })
    }
}

/// Produce the compressed copy of an upload.
///
/// # Errors
///
/// Returns `UnsupportedMediaType` for unknown extensions and
/// `Compression` when either encoder fails.
pub async fn compress(
    filename: &str,
    bytes: Vec<u8>,
    quality: u8,
    bitrate: &str,
    encoder: &str,
) -> Result<Compressed, UploadError> {
    match classify(filename)? {
        MediaKind::Image => compress_image(bytes, quality).await,
        MediaKind::Video => compress_video(filename, bytes, bitrate, encoder).await,
    }
}

async fn compress_image(bytes: Vec<u8>, quality: u8) -> Result<Compressed, UploadError> {
    let quality = quality.clamp(1, 100);
    let encoded = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, image::ImageError> {
        let decoded = image::load_from_memory(&bytes)?;
        let rgb = decoded.to_rgb8();
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
        encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;
        Ok(out)
    })
    .await
    .map_err(|e| UploadError::Compression(format!("image encoding task failed: {e}")))?
    .map_err(|e| UploadError::Compression(e.to_string()))?;

    Ok(Compressed {
        bytes: encoded,
        content_type: "image/jpeg".to_string(),
    })
}

async fn compress_video(
    filename: &str,
    bytes: Vec<u8>,
    bitrate: &str,
    encoder: &str,
) -> Result<Compressed, UploadError> {
    let extension = extension_of(filename);
    let scratch = std::env::temp_dir();
    let input = scratch.join(format!("{}-in.{extension}", Uuid::new_v4()));
    let output = scratch.join(format!("{}-out.{extension}", Uuid::new_v4()));

    tokio::fs::write(&input, &bytes).await?;

    let run = tokio::process::Command::new(encoder)
        .arg("-y")
        .args(["-loglevel", "error"])
        .arg("-i")
        .arg(&input)
        .args(["-b:v", bitrate])
        .arg(&output)
        .status()
        .await;

    // The input copy is spent either way.
    let _ = tokio::fs::remove_file(&input).await;

    let status =
        run.map_err(|e| UploadError::Compression(format!("failed to run {encoder}: {e}")))?;
    if !status.success() {
        let _ = tokio::fs::remove_file(&output).await;
        return Err(UploadError::Compression(format!(
            "{encoder} exited with {status}"
        )));
    }

    let compressed = tokio::fs::read(&output).await?;
    let _ = tokio::fs::remove_file(&output).await;

    Ok(Compressed {
        bytes: compressed,
        content_type: mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string(),
    })
}

fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}
