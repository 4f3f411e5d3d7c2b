//! Task list and chunked upload handlers.

use std::sync::Arc;

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use scavhunt_core::media::{encode_filename, folder_name, sanitize_filename};
use scavhunt_core::{CellStatus, Variant};
use scavhunt_ledger::standing_of;

use crate::auth::AuthUser;
use crate::compress;
use crate::error::ApiError;
use crate::state::AppState;

/// One media file attached to a task.
#[derive(Debug, Serialize)]
pub struct TaskMedia {
    /// Stored filename.
    pub filename: String,
    /// Content type reported by the blob store.
    pub content_type: String,
    /// Signed URL for the compressed copy.
    pub url: String,
}

/// One task crossed with the player's own cell.
#[derive(Debug, Serialize)]
pub struct TaskEntry {
    /// The task name.
    pub task: String,
    /// The player's cell for this task.
    pub status: CellStatus,
    /// The player's media for this task.
    pub media: Vec<TaskMedia>,
}

/// One tier of tasks for the signed-in player.
#[derive(Debug, Serialize)]
pub struct TierTasks {
    /// Human tier label, e.g. "1 point".
    pub tier: String,
    /// Points per approved task in this tier.
    pub points: u32,
    /// How many of the tier's tasks the player has approved.
    pub approved: usize,
    /// How many tasks the tier holds.
    pub total: usize,
    /// Every task in the tier with the player's status and media.
    pub tasks: Vec<TaskEntry>,
}

/// Task overview response.
#[derive(Debug, Serialize)]
pub struct TasksResponse {
    /// The player's points.
    pub points: i64,
    /// The player's 1-based rank.
    pub rank: usize,
    /// Whether uploads are currently accepted.
    pub submissions_open: bool,
    /// All tiers in ascending point order.
    pub tiers: Vec<TierTasks>,
}

/// Every task in every tier, with the signed-in player's status and media.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<TasksResponse>, ApiError> {
    let tables = state.ledger.activity_tables().await?;
    let totals = state.ledger.totals().await?;
    let media = state.media.list_media(&folder_name(&auth.username)).await?;

    let (points, rank) = standing_of(&totals, &auth.username);

    let tiers = tables
        .iter()
        .map(|table| {
            let tasks: Vec<TaskEntry> = table
                .statuses_for_user(&auth.username)
                .into_iter()
                .map(|(task, status)| {
                    let attached = media
                        .iter()
                        .filter(|o| o.task == task)
                        .map(|o| TaskMedia {
                            filename: o.filename.clone(),
                            content_type: o.content_type.clone(),
                            url: o.url.clone(),
                        })
                        .collect();
                    TaskEntry {
                        task,
                        status,
                        media: attached,
                    }
                })
                .collect();
            TierTasks {
                tier: table.tier.table_name().replace('_', " "),
                points: table.tier.points(),
                approved: table.approved_count(&auth.username),
                total: table.tasks().count(),
                tasks,
            }
        })
        .collect();

    Ok(Json(TasksResponse {
        points,
        rank,
        submissions_open: state.config.submissions_open(Utc::now()),
        tiers,
    }))
}

/// Response to one upload request.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// "receiving" until the final chunk lands, then "done".
    pub state: String,
    /// Index of the chunk this request carried.
    pub chunk_index: u32,
    /// Total chunks the file is split into.
    pub total_chunks: u32,
    /// Stored filename, present once the file is done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Receive one chunk of a task submission.
///
/// Multipart fields: `task`, `file_name`, `chunk_index`, `total_chunks`
/// and the `chunk` bytes, one chunk per request. The chunk carrying the
/// highest index triggers reassembly, compression, both blob writes and
/// the ledger update; if an earlier chunk is still missing at that point
/// the stored parts stay put, so re-sending the final chunk after the
/// stragglers completes the file.
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    if !state.config.submissions_open(Utc::now()) {
        return Err(ApiError::SubmissionsClosed);
    }

    let mut task = None;
    let mut file_name = None;
    let mut chunk_index = None;
    let mut total_chunks = None;
    let mut chunk: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("task") => task = Some(read_text(field).await?),
            Some("file_name") => file_name = Some(read_text(field).await?),
            Some("chunk_index") => chunk_index = Some(read_number(field).await?),
            Some("total_chunks") => total_chunks = Some(read_number(field).await?),
            Some("chunk") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable chunk: {e}")))?;
                chunk = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let task = require(task, "task")?;
    let file_name = require(file_name, "file_name")?;
    let chunk_index = require(chunk_index, "chunk_index")?;
    let total_chunks = require(total_chunks, "total_chunks")?;
    let chunk = require(chunk, "chunk")?;

    if task.trim().is_empty() {
        return Err(ApiError::BadRequest("task must not be empty".into()));
    }
    if total_chunks == 0 || chunk_index >= total_chunks {
        return Err(ApiError::BadRequest(format!(
            "chunk index {chunk_index} out of range for {total_chunks} chunks"
        )));
    }

    let owner = folder_name(&auth.username);
    let file_safe = sanitize_filename(&file_name);
    state
        .chunks
        .save_chunk(&owner, &file_safe, chunk_index, &chunk)
        .await?;

    if chunk_index + 1 < total_chunks {
        return Ok(Json(UploadResponse {
            state: "receiving".to_string(),
            chunk_index,
            total_chunks,
            filename: None,
        }));
    }

    let filename =
        finish_upload(&state, &auth.username, &owner, &task, &file_safe, total_chunks).await?;

    Ok(Json(UploadResponse {
        state: "done".to_string(),
        chunk_index,
        total_chunks,
        filename: Some(filename),
    }))
}

/// Drive a completed file through the rest of the pipeline: reassemble,
/// compress, store both variants, then mark the cell pending and append
/// the status row. The blob writes come before the ledger writes so a
/// failure part-way never leaves a pending cell without its media.
async fn finish_upload(
    state: &AppState,
    username: &str,
    owner: &str,
    task: &str,
    file_safe: &str,
    total_chunks: u32,
) -> Result<String, ApiError> {
    let bytes = state.chunks.reassemble(owner, file_safe, total_chunks).await?;

    let compressed = compress::compress(
        file_safe,
        bytes.clone(),
        state.config.image_quality,
        &state.config.video_bitrate,
        &state.config.video_encoder,
    )
    .await?;

    let filename = encode_filename(task, file_safe);
    let content_type = mime_guess::from_path(file_safe)
        .first_or_octet_stream()
        .to_string();

    state.media.ensure_owner_folders(owner).await?;
    // Both variant writes run before either failure surfaces; a failed pair
    // member leaves a partial upload behind for review cleanup.
    let original_write = state
        .media
        .upload(owner, &filename, bytes, &content_type, Variant::Original)
        .await;
    let compressed_write = state
        .media
        .upload(
            owner,
            &filename,
            compressed.bytes,
            &compressed.content_type,
            Variant::Compressed,
        )
        .await;
    original_write?;
    compressed_write?;

    let tier = state
        .ledger
        .find_tier_of_task(task)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task not found: {task}")))?;
    state
        .ledger
        .change_task_cell(tier, task, username, CellStatus::Pending)
        .await?;
    state.ledger.append_task_status(username, task).await?;

    tracing::info!(username, task, filename = %filename, "Submission stored");
    Ok(filename)
}

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable field: {e}")))
}

async fn read_number(field: Field<'_>) -> Result<u32, ApiError> {
    let name = field.name().unwrap_or("field").to_string();
    let text = read_text(field).await?;
    text.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{name} is not a number: {text}")))
}

fn require<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::BadRequest(format!("missing field: {name}")))
}
