//! Registration, login and password handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use scavhunt_core::{normalize_username, validate_username};

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::ApiError;
use crate::state::AppState;

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Desired username. Normalized to lowercase before any store access.
    pub username: String,
    /// Plain password, hashed before it leaves this process.
    pub password: String,
    /// Display name for the leaderboard. Defaults to the username.
    #[serde(default)]
    pub nickname: String,
}

/// Registration response.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// The normalized username the account was created under.
    pub username: String,
    /// The display name on record.
    pub nickname: String,
}

/// Register a new player.
///
/// Creates the roster row, a column in every tier table and a standings
/// row, in that order. A failure part-way leaves a roster row without its
/// fan-out; `POST /approve/reconcile` repairs that.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let username = normalize_username(&body.username);
    validate_username(&username)?;
    if body.password.is_empty() {
        return Err(ApiError::BadRequest("password must not be empty".into()));
    }

    let nickname = if body.nickname.trim().is_empty() {
        username.clone()
    } else {
        body.nickname.trim().to_string()
    };

    let password_hash = hash_password(&body.password)?;
    state
        .ledger
        .add_user(&username, &password_hash, &nickname)
        .await?;

    Ok(Json(RegisterResponse { username, nickname }))
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username, matched case-insensitively.
    pub username: String,
    /// Plain password.
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The normalized username.
    pub username: String,
    /// The display name on record.
    pub nickname: String,
    /// Whether the player has already acknowledged the rules.
    pub read_rules: bool,
}

/// Log a player in and open a session.
///
/// An unknown username and a wrong password answer identically.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = normalize_username(&body.username);

    let user = state
        .ledger
        .find_user(&username)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&body.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let token = state.sessions.create(&username).await;
    tracing::info!(username = %username, "Player logged in");

    Ok(Json(LoginResponse {
        token,
        username: user.username,
        nickname: user.nickname,
        read_rules: user.read_rules,
    }))
}

/// Logout response.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Always "ok".
    pub status: String,
}

/// End the current session.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Json<LogoutResponse> {
    state.sessions.remove(&auth.token).await;
    Json(LogoutResponse {
        status: "ok".to_string(),
    })
}

/// Password change request.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// The current password, re-verified before anything is written.
    pub current: String,
    /// The replacement password.
    pub new: String,
}

/// Change the signed-in player's password.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<LogoutResponse>, ApiError> {
    if body.new.is_empty() {
        return Err(ApiError::BadRequest("password must not be empty".into()));
    }

    let user = state
        .ledger
        .find_user(&auth.username)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&body.current, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let password_hash = hash_password(&body.new)?;
    state
        .ledger
        .set_password(&auth.username, &password_hash)
        .await?;
    tracing::info!(username = %auth.username, "Password changed");

    Ok(Json(LogoutResponse {
        status: "ok".to_string(),
    }))
}
