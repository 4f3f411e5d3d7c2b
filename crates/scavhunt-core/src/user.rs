//! User records and username rules.

use serde::Serialize;

use crate::error::DomainError;

/// Characters that may never appear in a username. Usernames become blob
/// folder names and filename prefixes, so path and query metacharacters are
/// rejected at registration.
pub const FORBIDDEN_USERNAME_CHARS: [char; 3] = ['\\', '/', '?'];

/// One row of the `user_info` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    /// Unique, lowercased username.
    pub username: String,
    /// Password hash (never the plain password).
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// When the account was created, as stored.
    pub created_at: String,
    /// Whether the user has acknowledged the rules.
    pub read_rules: bool,
    /// Display name shown on the leaderboard.
    pub nickname: String,
}

impl UserRecord {
    /// Read a record from a raw table row. `None` if the username is blank.
    #[must_use]
    pub fn from_row(row: &[String]) -> Option<Self> {
        let username = row.first().cloned().unwrap_or_default();
        if username.trim().is_empty() {
            return None;
        }
        let get = |i: usize| row.get(i).cloned().unwrap_or_default();
        Some(Self {
            username,
            password_hash: get(1),
            created_at: get(2),
            read_rules: get(3).trim() == "1",
            nickname: get(4),
        })
    }

    /// The raw row to append for this record.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.password_hash.clone(),
            self.created_at.clone(),
            if self.read_rules { "1" } else { "0" }.to_string(),
            self.nickname.clone(),
        ]
    }

    /// The name to display for this user: the nickname when set, otherwise
    /// the username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.nickname.trim().is_empty() {
            &self.username
        } else {
            &self.nickname
        }
    }
}

/// Lowercase and trim a username. Always applied before lookup or storage.
#[must_use]
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Validate an already-normalized username.
///
/// # Errors
///
/// Returns [`DomainError::InvalidUsername`] when the name is empty or
/// contains a forbidden character.
pub fn validate_username(username: &str) -> Result<(), DomainError> {
    if username.is_empty() {
        return Err(DomainError::InvalidUsername {
            username: username.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if let Some(bad) = username.chars().find(|c| FORBIDDEN_USERNAME_CHARS.contains(c)) {
        return Err(DomainError::InvalidUsername {
            username: username.to_string(),
            reason: format!("contains forbidden character '{bad}'"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_lowercases_and_trims() {
        assert_eq!(normalize_username("  Alice "), "alice");
    }

    #[test]
    fn forbidden_characters_rejected() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("al ice").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("a/b").is_err());
        assert!(validate_username("a\\b").is_err());
        assert!(validate_username("who?").is_err());
    }

    #[test]
    fn record_round_trip() {
        let record = UserRecord {
            username: "alice".to_string(),
            password_hash: "$argon2id$...".to_string(),
            created_at: "02/03/2025 07:00:00".to_string(),
            read_rules: true,
            nickname: "Al".to_string(),
        };
        assert_eq!(UserRecord::from_row(&record.to_row()), Some(record));
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut record = UserRecord::from_row(&[
            "bob".to_string(),
            String::new(),
            String::new(),
            String::new(),
        ])
        .unwrap();
        assert_eq!(record.display_name(), "bob");
        record.nickname = "Bobby".to_string();
        assert_eq!(record.display_name(), "Bobby");
    }
}
