//! Session authentication and extractors.
//!
//! This module provides:
//! - `SessionStore` - in-memory bearer-token sessions with a sliding idle window
//! - `AuthUser` - extractor for any signed-in player
//! - `OrganizerAuth` - extractor for sessions upgraded with the organizer key
//! - Argon2 password hashing helpers

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::{password_hash::SaltString, Argon2};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// One signed-in session.
#[derive(Debug, Clone)]
pub struct Session {
    /// The signed-in username.
    pub username: String,
    /// Whether the session has been upgraded with the organizer key.
    pub organizer: bool,
    expires_at: Instant,
}

/// In-memory session store keyed by opaque bearer tokens.
///
/// Every successful lookup pushes the expiry out by the full idle TTL, so
/// a session only dies after the player has been away for that long.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store with the given idle TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Open a session for a user and return its token.
    pub async fn create(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let session = Session {
            username: username.to_string(),
            organizer: false,
            expires_at: Instant::now() + self.ttl,
        };
        self.sessions.lock().await.insert(token.clone(), session);
        token
    }

    /// Look up a token, refreshing its expiry on success.
    ///
    /// Expired sessions are dropped on the way through.
    pub async fn authenticate(&self, token: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(token) {
            Some(session) if session.expires_at > Instant::now() => {
                session.expires_at = Instant::now() + self.ttl;
                Some(session.clone())
            }
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    /// Mark a live session as an organizer. Returns false if the token is
    /// unknown or expired.
    pub async fn upgrade(&self, token: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(token) {
            Some(session) if session.expires_at > Instant::now() => {
                session.organizer = true;
                true
            }
            _ => false,
        }
    }

    /// Drop a session, if present.
    pub async fn remove(&self, token: &str) {
        self.sessions.lock().await.remove(token);
    }
}

/// An authenticated player extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The signed-in username.
    pub username: String,
    /// Whether the session carries organizer rights.
    pub organizer: bool,
    /// The raw bearer token, for logout and organizer upgrade.
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?.to_string();

            let session = state
                .sessions
                .authenticate(&token)
                .await
                .ok_or(ApiError::Unauthorized)?;

            Ok(AuthUser {
                username: session.username,
                organizer: session.organizer,
                token,
            })
        })
    }
}

/// An organizer session, required by the review endpoints.
#[derive(Debug, Clone)]
pub struct OrganizerAuth {
    /// The signed-in username.
    pub username: String,
}

impl FromRequestParts<Arc<AppState>> for OrganizerAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;

            let session = state
                .sessions
                .authenticate(token)
                .await
                .ok_or(ApiError::Unauthorized)?;

            if !session.organizer {
                return Err(ApiError::Forbidden);
            }

            Ok(OrganizerAuth {
                username: session.username,
            })
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

// ============================================================================
// Password hashing
// ============================================================================

/// Hash a password for storage in the roster.
///
/// # Errors
///
/// Returns an internal error if hashing itself fails.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a stored hash.
///
/// An unparseable stored hash verifies as false; a corrupted roster cell
/// reads as a wrong password rather than an error.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
