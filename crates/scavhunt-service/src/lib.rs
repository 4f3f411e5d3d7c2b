//! Scavhunt HTTP API Service.
//!
//! This crate provides the HTTP API for the scavenger hunt backend,
//! including:
//!
//! - Player accounts and sessions
//! - Chunked media upload with compression
//! - Task lists, standings and activity feeds
//! - Organizer review of pending submissions
//!
//! # Authentication
//!
//! Players authenticate with a bearer session token issued at login.
//! Organizers hold the same kind of session, upgraded with a shared
//! access key.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for consistency

pub mod approval;
pub mod auth;
pub mod compress;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweeper;
pub mod upload;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
