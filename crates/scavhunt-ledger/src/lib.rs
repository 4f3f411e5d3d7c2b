//! The activity ledger for scavhunt.
//!
//! Everything the hunt records lives in a handful of named tables behind
//! [`scavhunt_store::TableApi`]: one activity table per point tier, the
//! `user_info` roster, the append-only `History` and `task_status` logs, and
//! the materialized `Totals` standings. This crate owns the read and write
//! choreography over those tables:
//!
//! - **Reads** batch the five tier tables into a single backend round-trip
//!   and parse rows into the typed records from `scavhunt-core`.
//! - **Writes** are ordered step sequences over a store with no
//!   transactions. A failure part-way through leaves the tables inconsistent
//!   on purpose; errors name the step that failed and
//!   [`Ledger::reconcile_users`] is the explicit repair for user-creation
//!   drift.
//! - **Totals** are recomputed by full scan and rewritten wholesale, never
//!   updated incrementally.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod ledger;
mod totals;

pub use error::{LedgerError, Result};
pub use ledger::{Ledger, ReconcileReport};
pub use totals::{computed_points, merge_totals, standing_of};
