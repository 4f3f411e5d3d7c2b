//! Log records: history, submission status and the totals cache.
//!
//! All three tables store plain strings; the structs here are the typed
//! row views plus the row conversions used when reading and appending.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The timestamp format written to every log table.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Format a timestamp the way the log tables store it.
#[must_use]
pub fn format_timestamp(at: DateTime<FixedOffset>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a log-table timestamp. Returns `None` for anything that does not
/// match [`TIMESTAMP_FORMAT`] (old rows edited by hand exist).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
}

fn cell(row: &[String], index: usize) -> String {
    row.get(index).cloned().unwrap_or_default()
}

// ============================================================================
// History
// ============================================================================

/// One approval in the append-only `History` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    /// When the approval was recorded, as stored.
    pub time: String,
    /// The approved user.
    pub user: String,
    /// The approved task.
    pub task: String,
    /// Points awarded.
    pub points: u32,
}

impl HistoryRecord {
    /// Read a record from a raw table row. `None` if the row is blank.
    #[must_use]
    pub fn from_row(row: &[String]) -> Option<Self> {
        if row.iter().all(|c| c.trim().is_empty()) {
            return None;
        }
        Some(Self {
            time: cell(row, 0),
            user: cell(row, 1),
            task: cell(row, 2),
            points: cell(row, 3).trim().parse().unwrap_or(0),
        })
    }

    /// The raw row to append for this record.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.time.clone(),
            self.user.clone(),
            self.task.clone(),
            self.points.to_string(),
        ]
    }

    /// The stored timestamp, parsed.
    #[must_use]
    pub fn parsed_time(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.time)
    }
}

// ============================================================================
// Task status
// ============================================================================

/// Resolution state of a submission in the `task_status` table.
///
/// Distinct from [`crate::CellStatus`]: here `'0'` means denied, not
/// pending, and the empty cell means the submission is still unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// `''`: submitted, no organizer decision yet.
    Submitted,
    /// `'0'`: denied.
    Denied,
    /// `'1'`: approved.
    Approved,
}

impl ReviewStatus {
    /// Interpret a raw status cell.
    #[must_use]
    pub fn from_cell(raw: &str) -> Self {
        match raw.trim() {
            "0" => ReviewStatus::Denied,
            "1" => ReviewStatus::Approved,
            _ => ReviewStatus::Submitted,
        }
    }

    /// The raw cell value for this status.
    #[must_use]
    pub fn as_cell(self) -> &'static str {
        match self {
            ReviewStatus::Submitted => "",
            ReviewStatus::Denied => "0",
            ReviewStatus::Approved => "1",
        }
    }
}

/// One submission lifecycle row in `task_status`.
///
/// Appended with [`ReviewStatus::Submitted`] on upload and later updated in
/// place when an organizer decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStatusRecord {
    /// When the submission was made, as stored.
    pub time: String,
    /// The submitting user.
    pub user: String,
    /// The submitted task.
    pub task: String,
    /// Current resolution state.
    pub status: ReviewStatus,
    /// Organizer message (set on denial).
    pub message: String,
}

impl TaskStatusRecord {
    /// Read a record from a raw table row. `None` if the row is blank.
    #[must_use]
    pub fn from_row(row: &[String]) -> Option<Self> {
        if row.iter().all(|c| c.trim().is_empty()) {
            return None;
        }
        Some(Self {
            time: cell(row, 0),
            user: cell(row, 1),
            task: cell(row, 2),
            status: ReviewStatus::from_cell(&cell(row, 3)),
            message: cell(row, 4),
        })
    }

    /// The raw row to append for this record.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.time.clone(),
            self.user.clone(),
            self.task.clone(),
            self.status.as_cell().to_string(),
            self.message.clone(),
        ]
    }

    /// The stored timestamp, parsed.
    #[must_use]
    pub fn parsed_time(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.time)
    }
}

// ============================================================================
// Totals
// ============================================================================

/// One row of the materialized `Totals` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotalsRow {
    /// The username.
    pub name: String,
    /// Cached cumulative points.
    pub points: i64,
}

impl TotalsRow {
    /// Read a row. `None` if the name cell is blank.
    #[must_use]
    pub fn from_row(row: &[String]) -> Option<Self> {
        let name = cell(row, 0);
        if name.trim().is_empty() {
            return None;
        }
        Some(Self {
            name,
            points: cell(row, 1).trim().parse().unwrap_or(0),
        })
    }

    /// The raw row for this entry.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![self.name.clone(), self.points.to_string()]
    }
}
