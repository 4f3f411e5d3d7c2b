//! Ledger error types.

use thiserror::Error;

/// Errors from ledger operations.
///
/// Multi-step writes surface the first failing step and stop; completed
/// steps are not rolled back.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Registration hit a username that already has a roster row.
    #[error("user \"{username}\" already exists")]
    UserAlreadyExists {
        /// The username that was already present.
        username: String,
    },

    /// An operation referenced a username with no roster row.
    #[error("user \"{username}\" does not exist")]
    UserNotFound {
        /// The username that was looked up.
        username: String,
    },

    /// A task name was not found in any tier table.
    #[error("task \"{task}\" is not in any tier table")]
    TaskNotFound {
        /// The task name that was looked up.
        task: String,
    },

    /// A tier table has no column for the user (registration drift).
    #[error("table \"{table}\" has no column for user \"{username}\"")]
    UserColumnMissing {
        /// The tier table that was scanned.
        table: String,
        /// The username with no column.
        username: String,
    },

    /// No unresolved task-status row matched (user, task).
    #[error("no pending status row for user \"{user}\" and task \"{task}\"")]
    StatusRowNotFound {
        /// The submitting user.
        user: String,
        /// The task name.
        task: String,
    },

    /// A table came back in a shape the domain types reject.
    #[error("corrupt table data: {0}")]
    Corrupt(#[from] scavhunt_core::DomainError),

    /// The backing store failed a read or write.
    #[error("storage error: {0}")]
    Store(#[from] scavhunt_store::StoreError),
}

/// Convenience result alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
