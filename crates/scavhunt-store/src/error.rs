//! Store error types.

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the tabular and blob store adapters.
///
/// Reads and writes are reported distinctly: a failed write may still have
/// landed on the backend (timeout after commit), so callers must never
/// treat a [`StoreError::Write`] as proof the write did not happen.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A read call failed or returned an unusable response.
    #[error("read failed for {target}: {message}")]
    Read {
        /// What was being read (table, prefix or object).
        target: String,
        /// Backend error detail, for logs only.
        message: String,
    },

    /// A write call failed (the write may or may not have landed).
    #[error("write failed for {target}: {message}")]
    Write {
        /// What was being written.
        target: String,
        /// Backend error detail, for logs only.
        message: String,
    },
}

impl StoreError {
    /// Build a read error.
    #[must_use]
    pub fn read(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Build a write error.
    #[must_use]
    pub fn write(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            target: target.into(),
            message: message.into(),
        }
    }
}
