//! Organizer review endpoints: session upgrade, the pending queue,
//! approve and deny decisions, and the repair operations.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use scavhunt_core::media::task_display;
use scavhunt_core::TotalsRow;
use scavhunt_ledger::ReconcileReport;

use crate::approval::{self, PendingReview};
use crate::auth::{AuthUser, OrganizerAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Organizer upgrade request.
#[derive(Debug, Deserialize)]
pub struct OrganizerLoginRequest {
    /// The shared organizer access key.
    pub access_key: String,
}

/// Organizer upgrade response.
#[derive(Debug, Serialize)]
pub struct OrganizerLoginResponse {
    /// Always true on success.
    pub organizer: bool,
}

/// Upgrade the caller's session to organizer.
///
/// Requires a live player session; with no access key configured the
/// endpoint is locked for everyone.
pub async fn organizer_login(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<OrganizerLoginRequest>,
) -> Result<Json<OrganizerLoginResponse>, ApiError> {
    let expected = state
        .config
        .organizer_access_key
        .as_ref()
        .ok_or(ApiError::Forbidden)?;
    if body.access_key != *expected {
        return Err(ApiError::Forbidden);
    }
    if !state.sessions.upgrade(&auth.token).await {
        return Err(ApiError::Unauthorized);
    }
    tracing::info!(username = %auth.username, "Session upgraded to organizer");
    Ok(Json(OrganizerLoginResponse { organizer: true }))
}

/// Pending queue response.
#[derive(Debug, Serialize)]
pub struct PendingResponse {
    /// Submissions awaiting review, oldest upload first.
    pub pending: Vec<PendingReview>,
}

/// Every submission awaiting review, with its media.
pub async fn pending(
    State(state): State<Arc<AppState>>,
    _auth: OrganizerAuth,
) -> Result<Json<PendingResponse>, ApiError> {
    let pending = approval::list_pending(&state.ledger, &state.media).await?;
    Ok(Json(PendingResponse { pending }))
}

/// An approve decision.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// The task, possibly in dashed form.
    pub task: String,
    /// The submitting username, possibly in dashed form.
    pub user: String,
}

/// A deny decision.
#[derive(Debug, Deserialize)]
pub struct DenyRequest {
    /// The task, possibly in dashed form.
    pub task: String,
    /// The submitting username, possibly in dashed form.
    pub user: String,
    /// Feedback shown to the player.
    #[serde(default)]
    pub message: String,
}

/// Outcome of a review decision.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    /// The reviewed task.
    pub task: String,
    /// The reviewed username.
    pub user: String,
    /// "approved" or "denied".
    pub status: String,
    /// Points awarded, on approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
}

/// Approve a pending submission.
///
/// Marks the cell, appends the award to the history, recomputes the
/// standings and resolves the status row, in that order.
pub async fn approve_task(
    State(state): State<Arc<AppState>>,
    _auth: OrganizerAuth,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let task = task_display(&body.task);
    let user = task_display(&body.user);
    let tier = state
        .ledger
        .find_tier_of_task(&task)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task not found: {task}")))?;

    let points = approval::approve(&state.ledger, tier, &task, &user).await?;
    Ok(Json(DecisionResponse {
        task,
        user,
        status: "approved".to_string(),
        points: Some(points),
    }))
}

/// Deny a pending submission.
///
/// Clears the cell, deletes both stored copies of the media and
/// resolves the status row with the organizer's message.
pub async fn deny_task(
    State(state): State<Arc<AppState>>,
    _auth: OrganizerAuth,
    Json(body): Json<DenyRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let task = task_display(&body.task);
    let user = task_display(&body.user);
    let tier = state
        .ledger
        .find_tier_of_task(&task)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task not found: {task}")))?;

    approval::deny(
        &state.ledger,
        &state.media,
        tier,
        &task,
        &user,
        &body.message,
    )
    .await?;
    Ok(Json(DecisionResponse {
        task,
        user,
        status: "denied".to_string(),
        points: None,
    }))
}

/// Recompute response.
#[derive(Debug, Serialize)]
pub struct RecomputeResponse {
    /// The standings after the rewrite.
    pub standings: Vec<TotalsRow>,
}

/// Rebuild the totals table from the activity tables.
///
/// Safe to run at any time; running it twice changes nothing.
pub async fn recompute(
    State(state): State<Arc<AppState>>,
    _auth: OrganizerAuth,
) -> Result<Json<RecomputeResponse>, ApiError> {
    let standings = state.ledger.recompute_totals().await?;
    tracing::info!(rows = standings.len(), "Standings recomputed");
    Ok(Json(RecomputeResponse { standings }))
}

/// Bring every table's user set back in line with the roster.
///
/// Repairs registrations that failed part-way through their fan-out.
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    _auth: OrganizerAuth,
) -> Result<Json<ReconcileReport>, ApiError> {
    let report = state.ledger.reconcile_users().await?;
    if !report.is_empty() {
        tracing::info!(
            columns_added = report.columns_added.len(),
            totals_rows_added = report.totals_rows_added.len(),
            "Roster reconciled"
        );
    }
    Ok(Json(report))
}
