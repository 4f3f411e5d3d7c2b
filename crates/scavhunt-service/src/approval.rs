//! The organizer review workflow.
//!
//! Approving or denying a submission is a short sequence of store writes
//! with no transaction around them. The steps run in a fixed order chosen
//! so that an interruption leaves the ledger explainable:
//!
//! - approve: activity cell to `'1'`, history append, totals rewrite,
//!   status log resolution;
//! - deny: activity cell back to `''`, both media deletions, status log
//!   resolution carrying the organizer's message.
//!
//! A failure part-way through is reported with the step that stopped it,
//! and `POST /approve/recompute` repairs any points drift it left behind.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;

use scavhunt_core::media::folder_name;
use scavhunt_core::{CellStatus, MediaObject, ReviewStatus, Tier, Variant};
use scavhunt_ledger::{Ledger, LedgerError};
use scavhunt_store::MediaStore;

use crate::error::ApiError;

/// A review sequence stopped part-way through its writes.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// An approval step failed.
    #[error("approving \"{task}\" for {user} failed at step {step}: {message}")]
    Approval {
        /// Task under review.
        task: String,
        /// Submitting user.
        user: String,
        /// The step that failed: "cell", "history", "totals" or "status".
        step: &'static str,
        /// The underlying failure.
        message: String,
    },

    /// A denial step failed.
    #[error("denying \"{task}\" for {user} failed at step {step}: {message}")]
    Denial {
        /// Task under review.
        task: String,
        /// Submitting user.
        user: String,
        /// The step that failed: "cell", "media" or "status".
        step: &'static str,
        /// The underlying failure.
        message: String,
    },
}

/// One media file attached to a pending submission.
#[derive(Debug, Serialize)]
pub struct PendingMedia {
    /// Stored filename.
    pub filename: String,
    /// Content type reported by the blob store.
    pub content_type: String,
    /// Signed URL for viewing the compressed copy.
    pub url: String,
}

/// One submission awaiting an organizer decision.
#[derive(Debug, Serialize)]
pub struct PendingReview {
    /// The task name.
    pub task: String,
    /// The submitting username.
    pub user: String,
    /// The submitter's display name.
    pub nickname: String,
    /// Points the task is worth.
    pub points: u32,
    /// Compressed media attached to this submission.
    pub media: Vec<PendingMedia>,
    /// Upload time of the first attached file, if the store reported one.
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Collect every pending submission across all tiers, with its media.
///
/// Media is listed once per distinct submitter (concurrently) rather than
/// once per pending cell. The queue is ordered oldest upload first, with
/// media-less submissions at the end; ties break on task then user so the
/// order is stable across refreshes.
///
/// # Errors
///
/// Returns an error if a table read or media listing fails.
pub async fn list_pending(ledger: &Ledger, media: &MediaStore) -> Result<Vec<PendingReview>, ApiError> {
    let tables = ledger.activity_tables().await?;
    let nicknames = ledger.nickname_directory().await?;

    let mut cells: Vec<(Tier, scavhunt_core::PendingCell)> = Vec::new();
    for table in &tables {
        for cell in table.pending_cells() {
            cells.push((table.tier, cell));
        }
    }

    let submitters: BTreeSet<String> = cells.iter().map(|(_, cell)| cell.user.clone()).collect();
    let folders: Vec<String> = submitters.iter().map(|user| folder_name(user)).collect();
    let listings = join_all(folders.iter().map(|folder| media.list_media(folder))).await;

    let mut media_by_user: HashMap<String, Vec<MediaObject>> = HashMap::new();
    for (user, listing) in submitters.into_iter().zip(listings) {
        media_by_user.insert(user, listing?);
    }

    let mut reviews: Vec<PendingReview> = cells
        .into_iter()
        .map(|(tier, cell)| {
            let matching: Vec<&MediaObject> = media_by_user
                .get(&cell.user)
                .map(|objects| objects.iter().filter(|o| o.task == cell.task).collect())
                .unwrap_or_default();
            let uploaded_at = matching.first().and_then(|o| o.uploaded_at);
            let attached = matching
                .into_iter()
                .map(|o| PendingMedia {
                    filename: o.filename.clone(),
                    content_type: o.content_type.clone(),
                    url: o.url.clone(),
                })
                .collect();
            let nickname = nicknames
                .get(&cell.user)
                .cloned()
                .unwrap_or_else(|| cell.user.clone());
            PendingReview {
                task: cell.task,
                user: cell.user,
                nickname,
                points: tier.points(),
                media: attached,
                uploaded_at,
            }
        })
        .collect();

    reviews.sort_by_key(sort_key);
    Ok(reviews)
}

fn sort_key(review: &PendingReview) -> (bool, Option<DateTime<Utc>>, String, String) {
    (
        review.uploaded_at.is_none(),
        review.uploaded_at,
        review.task.clone(),
        review.user.clone(),
    )
}

/// Run the approval sequence for one submission. Returns the points
/// awarded.
///
/// # Errors
///
/// Returns a `WorkflowError` naming the step that failed.
pub async fn approve(
    ledger: &Ledger,
    tier: Tier,
    task: &str,
    user: &str,
) -> Result<u32, WorkflowError> {
    let fail = |step: &'static str, e: LedgerError| WorkflowError::Approval {
        task: task.to_string(),
        user: user.to_string(),
        step,
        message: e.to_string(),
    };

    ledger
        .change_task_cell(tier, task, user, CellStatus::Approved)
        .await
        .map_err(|e| fail("cell", e))?;

    let points = tier.points();
    ledger
        .add_history(user, task, points)
        .await
        .map_err(|e| fail("history", e))?;

    ledger
        .recompute_totals()
        .await
        .map_err(|e| fail("totals", e))?;

    ledger
        .resolve_task_status(user, task, ReviewStatus::Approved, "")
        .await
        .map_err(|e| fail("status", e))?;

    tracing::info!(task, user, points, "Submission approved");
    Ok(points)
}

/// Run the denial sequence for one submission.
///
/// Both media variants are removed; deleting nothing is not an error, so
/// a retried denial converges instead of failing on the second pass.
///
/// # Errors
///
/// Returns a `WorkflowError` naming the step that failed.
pub async fn deny(
    ledger: &Ledger,
    media: &MediaStore,
    tier: Tier,
    task: &str,
    user: &str,
    message: &str,
) -> Result<(), WorkflowError> {
    let fail = |step: &'static str, cause: String| WorkflowError::Denial {
        task: task.to_string(),
        user: user.to_string(),
        step,
        message: cause,
    };

    ledger
        .change_task_cell(tier, task, user, CellStatus::NotDone)
        .await
        .map_err(|e| fail("cell", e.to_string()))?;

    let folder = folder_name(user);
    media
        .delete_media(&folder, task, Variant::Original)
        .await
        .map_err(|e| fail("media", e.to_string()))?;
    media
        .delete_media(&folder, task, Variant::Compressed)
        .await
        .map_err(|e| fail("media", e.to_string()))?;

    ledger
        .resolve_task_status(user, task, ReviewStatus::Denied, message)
        .await
        .map_err(|e| fail("status", e.to_string()))?;

    tracing::info!(task, user, "Submission denied");
    Ok(())
}
