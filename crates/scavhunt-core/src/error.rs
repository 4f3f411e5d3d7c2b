//! Error types for scavhunt domain validation.

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Errors raised while validating or parsing domain values.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// A username failed validation.
    #[error("invalid username '{username}': {reason}")]
    InvalidUsername {
        /// The rejected username.
        username: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A table read back from the workbook is structurally unusable.
    #[error("malformed table '{table}': {reason}")]
    MalformedTable {
        /// The table name.
        table: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A tier table name did not match any known tier.
    #[error("unknown tier table: {name}")]
    UnknownTier {
        /// The unrecognized table name.
        name: String,
    },
}
