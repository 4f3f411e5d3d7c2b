//! Core types and utilities for scavhunt.
//!
//! This crate provides the foundational types used throughout the scavhunt
//! platform:
//!
//! - **Tiers**: `Tier`, the point value a task belongs to
//! - **Activity tables**: `ActivityTable`, `CellStatus`, `PendingCell`
//! - **Log records**: `HistoryRecord`, `TaskStatusRecord`, `TotalsRow`
//! - **Users**: `UserRecord`, username validation and normalization
//! - **Media naming**: `MediaObject`, `Variant`, task/filename encoding
//!
//! # Cell Encoding
//!
//! Activity cells hold one of three raw values:
//!
//! - `''`: task not done
//! - `'0'`: submitted, pending approval
//! - `'1'`: approved
//!
//! All tables live in a remote workbook; this crate only models rows and
//! cells as plain strings plus the typed views over them. It performs no I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod activity;
pub mod error;
pub mod media;
pub mod records;
pub mod schema;
pub mod user;

pub use activity::{ActivityTable, CellStatus, PendingCell, Tier};
pub use error::{DomainError, Result};
pub use media::{MediaObject, Variant};
pub use records::{
    format_timestamp, parse_timestamp, HistoryRecord, ReviewStatus, TaskStatusRecord, TotalsRow,
    TIMESTAMP_FORMAT,
};
pub use user::{normalize_username, validate_username, UserRecord};
