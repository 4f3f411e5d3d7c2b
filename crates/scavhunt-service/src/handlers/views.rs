//! Player-facing read views: home, leaderboard, history, updates, rules
//! and the gallery.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use futures::future::join_all;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use scavhunt_core::media::folder_name;
use scavhunt_core::{HistoryRecord, ReviewStatus, TaskStatusRecord, Tier, TotalsRow};
use scavhunt_ledger::standing_of;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// How many approvals the history endpoint returns.
const HISTORY_LIMIT: usize = 50;

/// How many rows the updates feed returns.
const UPDATES_LIMIT: usize = 75;

/// How many rows each home feed shows.
const HOME_FEED_LIMIT: usize = 5;

/// Gallery page size.
const GALLERY_PAGE_SIZE: usize = 10;

/// Tiers whose approved images feed the gallery.
const GALLERY_TIERS: [Tier; 3] = [Tier::One, Tier::Three, Tier::Five];

// ============================================================================
// Rules
// ============================================================================

/// Rules acknowledgement state.
#[derive(Debug, Serialize)]
pub struct RulesResponse {
    /// Whether the player has acknowledged the rules.
    pub read_rules: bool,
}

/// Whether the signed-in player has acknowledged the rules.
pub async fn rules(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<RulesResponse>, ApiError> {
    let user = state
        .ledger
        .find_user(&auth.username)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {}", auth.username)))?;
    Ok(Json(RulesResponse {
        read_rules: user.read_rules,
    }))
}

/// Record the player's rules acknowledgement.
pub async fn ack_rules(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<RulesResponse>, ApiError> {
    state.ledger.set_read_rules(&auth.username).await?;
    Ok(Json(RulesResponse { read_rules: true }))
}

// ============================================================================
// Leaderboard and history
// ============================================================================

/// One standings row.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based rank.
    pub rank: usize,
    /// Username.
    pub name: String,
    /// Display name.
    pub nickname: String,
    /// Total points.
    pub points: i64,
}

/// Leaderboard response.
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    /// Standings in stored rank order.
    pub standings: Vec<LeaderboardEntry>,
}

/// The standings, in the order the totals table holds them.
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let totals = state.ledger.totals().await?;
    let nicknames = state.ledger.nickname_directory().await?;
    Ok(Json(LeaderboardResponse {
        standings: standings_view(&totals, &nicknames),
    }))
}

/// One approval shown in a history feed.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    /// When the approval was recorded, as stored.
    pub time: String,
    /// The approved username.
    pub user: String,
    /// The approved player's display name.
    pub nickname: String,
    /// The approved task.
    pub task: String,
    /// Points awarded.
    pub points: u32,
}

/// History response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// The latest approvals, newest first.
    pub history: Vec<HistoryEntry>,
}

/// The latest approvals across all players, newest first.
pub async fn history(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Result<Json<HistoryResponse>, ApiError> {
    let records = state.ledger.history().await?;
    let nicknames = state.ledger.nickname_directory().await?;
    Ok(Json(HistoryResponse {
        history: history_view(records, &nicknames, HISTORY_LIMIT),
    }))
}

// ============================================================================
// Updates
// ============================================================================

/// One row of a player's submission feed.
#[derive(Debug, Serialize)]
pub struct UpdateEntry {
    /// When the submission was made, as stored.
    pub time: String,
    /// The submitted task.
    pub task: String,
    /// Current resolution state.
    pub status: ReviewStatus,
    /// Organizer message, set on denial.
    pub message: String,
}

/// Updates response.
#[derive(Debug, Serialize)]
pub struct UpdatesResponse {
    /// The player's points.
    pub points: i64,
    /// The player's 1-based rank.
    pub rank: usize,
    /// One row per task, newest first.
    pub updates: Vec<UpdateEntry>,
}

/// The signed-in player's submission feed, one row per task.
///
/// A task that was submitted, denied and resubmitted has several log
/// rows; the feed keeps one per task, preferring a resolved row over an
/// unresolved one, then orders by time, newest first.
pub async fn updates(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UpdatesResponse>, ApiError> {
    let log = state.ledger.task_status_log().await?;
    let totals = state.ledger.totals().await?;
    let (points, rank) = standing_of(&totals, &auth.username);

    let mut mine: Vec<TaskStatusRecord> = log
        .into_iter()
        .filter(|r| r.user == auth.username)
        .collect();

    // Stable pre-sort by raw status cell ('' < '0' < '1') so the
    // keep-last dedupe below lands on a resolved row when one exists.
    mine.sort_by_key(|r| r.status.as_cell());
    let mut latest: HashMap<String, TaskStatusRecord> = HashMap::new();
    for record in mine {
        latest.insert(record.task.clone(), record);
    }

    let mut rows: Vec<TaskStatusRecord> = latest.into_values().collect();
    rows.sort_by(|a, b| {
        b.parsed_time()
            .cmp(&a.parsed_time())
            .then_with(|| a.task.cmp(&b.task))
    });
    rows.truncate(UPDATES_LIMIT);

    let updates = rows.into_iter().map(update_entry).collect();
    Ok(Json(UpdatesResponse {
        points,
        rank,
        updates,
    }))
}

// ============================================================================
// Home
// ============================================================================

/// A player's progress through one tier.
#[derive(Debug, Serialize)]
pub struct TierProgress {
    /// Human tier label, e.g. "1 point".
    pub tier: String,
    /// Points per approved task in this tier.
    pub points: u32,
    /// How many of the tier's tasks the player has approved.
    pub approved: usize,
    /// How many tasks the tier holds.
    pub total: usize,
}

/// Home summary response.
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    /// The player's points.
    pub points: i64,
    /// The player's 1-based rank.
    pub rank: usize,
    /// The top of the standings.
    pub top_five: Vec<LeaderboardEntry>,
    /// The player one rank above, absent for the leader.
    pub player_above: Option<LeaderboardEntry>,
    /// Per-tier progress.
    pub tiers: Vec<TierProgress>,
    /// The latest approvals across all players.
    pub recent_history: Vec<HistoryEntry>,
    /// The player's latest resolved submissions.
    pub recent_updates: Vec<UpdateEntry>,
}

/// The home summary for the signed-in player.
pub async fn home(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<HomeResponse>, ApiError> {
    let totals = state.ledger.totals().await?;
    let nicknames = state.ledger.nickname_directory().await?;
    let tables = state.ledger.activity_tables().await?;
    let records = state.ledger.history().await?;
    let log = state.ledger.task_status_log().await?;

    let (points, rank) = standing_of(&totals, &auth.username);
    let standings = standings_view(&totals, &nicknames);
    let top_five: Vec<LeaderboardEntry> = standings.iter().take(5).cloned().collect();
    let player_above = if rank >= 2 {
        standings.get(rank - 2).cloned()
    } else {
        None
    };

    let tiers = tables
        .iter()
        .map(|table| TierProgress {
            tier: table.tier.table_name().replace('_', " "),
            points: table.tier.points(),
            approved: table.approved_count(&auth.username),
            total: table.tasks().count(),
        })
        .collect();

    let mut resolved: Vec<TaskStatusRecord> = log
        .into_iter()
        .filter(|r| r.user == auth.username && r.status != ReviewStatus::Submitted)
        .collect();
    resolved.sort_by(|a, b| b.parsed_time().cmp(&a.parsed_time()));
    resolved.truncate(HOME_FEED_LIMIT);

    Ok(Json(HomeResponse {
        points,
        rank,
        top_five,
        player_above,
        tiers,
        recent_history: history_view(records, &nicknames, HOME_FEED_LIMIT),
        recent_updates: resolved.into_iter().map(update_entry).collect(),
    }))
}

// ============================================================================
// Gallery
// ============================================================================

/// Gallery query parameters.
#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    /// 1-based page number (default: 1).
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize {
    1
}

/// Gallery response.
#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    /// The page served.
    pub page: usize,
    /// Signed image URLs for this page.
    pub images: Vec<String>,
}

/// A page of approved images from the low tiers.
///
/// Only images whose task is approved for the owning player appear. The
/// pool is reshuffled on every request, so pages do not line up between
/// requests; the page is a fixed-size slice of the current shuffle.
pub async fn gallery(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<GalleryResponse>, ApiError> {
    let tables = state.ledger.activity_tables().await?;

    let mut approved_by_user: HashMap<String, Vec<String>> = HashMap::new();
    for table in tables.iter().filter(|t| GALLERY_TIERS.contains(&t.tier)) {
        for user in table.users() {
            let approved = table.approved_tasks(user);
            if !approved.is_empty() {
                approved_by_user
                    .entry(user.clone())
                    .or_default()
                    .extend(approved);
            }
        }
    }

    let users: Vec<String> = approved_by_user.keys().cloned().collect();
    let folders: Vec<String> = users.iter().map(|user| folder_name(user)).collect();
    let listings = join_all(folders.iter().map(|folder| state.media.list_media(folder))).await;

    let mut urls = Vec::new();
    for (user, listing) in users.iter().zip(listings) {
        let approved = &approved_by_user[user];
        for object in listing? {
            if object.is_image() && approved.contains(&object.task) {
                urls.push(object.url);
            }
        }
    }

    urls.shuffle(&mut rand::thread_rng());

    let page = query.page.max(1);
    let images = urls
        .into_iter()
        .skip((page - 1) * GALLERY_PAGE_SIZE)
        .take(GALLERY_PAGE_SIZE)
        .collect();

    Ok(Json(GalleryResponse { page, images }))
}

// ============================================================================
// Shared view builders
// ============================================================================

fn standings_view(
    totals: &[TotalsRow],
    nicknames: &HashMap<String, String>,
) -> Vec<LeaderboardEntry> {
    totals
        .iter()
        .enumerate()
        .map(|(idx, row)| LeaderboardEntry {
            rank: idx + 1,
            name: row.name.clone(),
            nickname: nicknames
                .get(&row.name)
                .cloned()
                .unwrap_or_else(|| row.name.clone()),
            points: row.points,
        })
        .collect()
}

/// Newest first; rows with unparseable timestamps sink to the end.
fn history_view(
    mut records: Vec<HistoryRecord>,
    nicknames: &HashMap<String, String>,
    limit: usize,
) -> Vec<HistoryEntry> {
    records.sort_by(|a, b| b.parsed_time().cmp(&a.parsed_time()));
    records.truncate(limit);
    records
        .into_iter()
        .map(|r| {
            let nickname = nicknames
                .get(&r.user)
                .cloned()
                .unwrap_or_else(|| r.user.clone());
            HistoryEntry {
                time: r.time,
                user: r.user,
                nickname,
                task: r.task,
                points: r.points,
            }
        })
        .collect()
}

fn update_entry(record: TaskStatusRecord) -> UpdateEntry {
    UpdateEntry {
        time: record.time,
        task: record.task,
        status: record.status,
        message: record.message,
    }
}
