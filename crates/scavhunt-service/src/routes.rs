//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{approve, auth, health, tasks, views};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for the upload endpoint.
/// Reassembly and compression hold whole files in memory.
const UPLOAD_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /auth/register` - Create a player account
/// - `POST /auth/login` - Sign in, returns a session token
///
/// ## Players (session auth)
/// - `POST /auth/logout` - End the session
/// - `POST /auth/change-password` - Rotate the caller's password
/// - `GET /rules` - Rules acknowledgement state
/// - `POST /rules/ack` - Acknowledge the rules
/// - `GET /tasks` - Task lists with cell status and media
/// - `POST /tasks/upload` - Chunked media upload (concurrency-limited)
/// - `GET /home` - Home summary
/// - `GET /leaderboard` - Standings
/// - `GET /history` - Latest approvals
/// - `GET /updates` - The caller's submission feed
/// - `GET /gallery` - Approved images, paged
///
/// ## Organizers (upgraded session)
/// - `POST /approve/login` - Upgrade the session with the access key
/// - `GET /approve/pending` - Submissions awaiting review
/// - `POST /approve/task` - Approve a submission
/// - `POST /approve/deny` - Deny a submission
/// - `POST /approve/recompute` - Rebuild the totals table
/// - `POST /approve/reconcile` - Repair roster drift
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Create the concurrency-limited upload route
    // Each in-flight upload holds chunk buffers plus a compression pass,
    // so the limit is far lower than for the rest of the API.
    let upload_routes = Router::new()
        .route("/tasks/upload", post(tasks::upload_chunk))
        .layer(ConcurrencyLimitLayer::new(UPLOAD_MAX_CONCURRENT_REQUESTS));

    // Create concurrency-limited API routes
    let api_routes = Router::new()
        // Accounts and sessions
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/change-password", post(auth::change_password))
        // Rules
        .route("/rules", get(views::rules))
        .route("/rules/ack", post(views::ack_rules))
        // Tasks
        .route("/tasks", get(tasks::list_tasks))
        // Player views
        .route("/home", get(views::home))
        .route("/leaderboard", get(views::leaderboard))
        .route("/history", get(views::history))
        .route("/updates", get(views::updates))
        .route("/gallery", get(views::gallery))
        // Review
        .route("/approve/login", post(approve::organizer_login))
        .route("/approve/pending", get(approve::pending))
        .route("/approve/task", post(approve::approve_task))
        .route("/approve/deny", post(approve::deny_task))
        .route("/approve/recompute", post(approve::recompute))
        .route("/approve/reconcile", post(approve::reconcile))
        // Upload route (with its own concurrency limit)
        .merge(upload_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API routes (rate limited)
        .merge(api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
