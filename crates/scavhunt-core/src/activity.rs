//! Point tiers and the per-tier activity tables.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Header label of the task-name column in every activity table.
pub const ACTIVITIES_COLUMN: &str = "Activities";

// ============================================================================
// Tiers
// ============================================================================

/// A point tier. Every task belongs to exactly one tier, and each tier is
/// backed by its own `{n}_point` table in the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// 1-point tasks.
    One,
    /// 3-point tasks.
    Three,
    /// 5-point tasks.
    Five,
    /// 7-point tasks.
    Seven,
    /// 10-point tasks.
    Ten,
}

impl Tier {
    /// All tiers, in ascending point order.
    pub const ALL: [Tier; 5] = [Tier::One, Tier::Three, Tier::Five, Tier::Seven, Tier::Ten];

    /// The point value awarded for an approved task in this tier.
    #[must_use]
    pub fn points(self) -> u32 {
        match self {
            Tier::One => 1,
            Tier::Three => 3,
            Tier::Five => 5,
            Tier::Seven => 7,
            Tier::Ten => 10,
        }
    }

    /// The workbook table name for this tier.
    #[must_use]
    pub fn table_name(self) -> &'static str {
        match self {
            Tier::One => "1_point",
            Tier::Three => "3_point",
            Tier::Five => "5_point",
            Tier::Seven => "7_point",
            Tier::Ten => "10_point",
        }
    }

    /// Parse a tier from its workbook table name.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnknownTier`] if the name is not a tier table.
    pub fn from_table_name(name: &str) -> Result<Self, DomainError> {
        Tier::ALL
            .into_iter()
            .find(|t| t.table_name() == name)
            .ok_or_else(|| DomainError::UnknownTier {
                name: name.to_string(),
            })
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

// ============================================================================
// Cell values
// ============================================================================

/// The typed view of an activity cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    /// `''`: the task has not been attempted.
    NotDone,
    /// `'0'`: submitted, awaiting an organizer decision.
    Pending,
    /// `'1'`: approved.
    Approved,
}

impl CellStatus {
    /// Interpret a raw cell value. Anything other than `'0'` or `'1'`
    /// (including stray text) reads as not done, matching how the cells are
    /// compared everywhere else.
    #[must_use]
    pub fn from_cell(raw: &str) -> Self {
        match raw.trim() {
            "0" => CellStatus::Pending,
            "1" => CellStatus::Approved,
            _ => CellStatus::NotDone,
        }
    }

    /// The raw cell value to write for this status.
    #[must_use]
    pub fn as_cell(self) -> &'static str {
        match self {
            CellStatus::NotDone => "",
            CellStatus::Pending => "0",
            CellStatus::Approved => "1",
        }
    }
}

// ============================================================================
// Activity tables
// ============================================================================

/// One `(task, user)` pair currently awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCell {
    /// The task name as it appears in the table.
    pub task: String,
    /// The username owning the submission.
    pub user: String,
}

/// A typed, read-only view of one tier's task grid.
///
/// The first header column is [`ACTIVITIES_COLUMN`]; every further header
/// column is a username. Each data row is one task crossed with one cell per
/// user. Rows are padded to the header width so cell access never goes out
/// of bounds.
#[derive(Debug, Clone)]
pub struct ActivityTable {
    /// The tier this table belongs to.
    pub tier: Tier,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ActivityTable {
    /// Build a table view from raw workbook rows (header first).
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::MalformedTable`] if the header row is missing
    /// or does not start with the activities column.
    pub fn from_rows(tier: Tier, mut rows: Vec<Vec<String>>) -> Result<Self, DomainError> {
        if rows.is_empty() || rows[0].is_empty() {
            return Err(DomainError::MalformedTable {
                table: tier.table_name().to_string(),
                reason: "missing header row".to_string(),
            });
        }
        let header = rows.remove(0);
        if header[0] != ACTIVITIES_COLUMN {
            return Err(DomainError::MalformedTable {
                table: tier.table_name().to_string(),
                reason: format!("first header column is '{}'", header[0]),
            });
        }
        for row in &mut rows {
            row.resize(header.len(), String::new());
        }
        Ok(Self { tier, header, rows })
    }

    /// The usernames in this table, in column order.
    #[must_use]
    pub fn users(&self) -> &[String] {
        &self.header[1..]
    }

    /// The task names in this table, in row order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r[0].as_str())
    }

    /// Whether a task row with this exact name exists.
    #[must_use]
    pub fn has_task(&self, task: &str) -> bool {
        self.rows.iter().any(|r| r[0] == task)
    }

    /// The cell status for `(task, user)`, or `None` if either is absent.
    #[must_use]
    pub fn cell(&self, task: &str, user: &str) -> Option<CellStatus> {
        let row = self.rows.iter().find(|r| r[0] == task)?;
        let col = self.header.iter().position(|h| h == user)?;
        Some(CellStatus::from_cell(&row[col]))
    }

    /// Melt the grid to the `(task, user)` pairs whose cell is pending.
    #[must_use]
    pub fn pending_cells(&self) -> Vec<PendingCell> {
        let mut pending = Vec::new();
        for row in &self.rows {
            for (col, user) in self.header.iter().enumerate().skip(1) {
                if CellStatus::from_cell(&row[col]) == CellStatus::Pending {
                    pending.push(PendingCell {
                        task: row[0].clone(),
                        user: user.clone(),
                    });
                }
            }
        }
        pending
    }

    /// Every task in row order paired with its status for one user.
    ///
    /// Returns an empty list when the user has no column here.
    #[must_use]
    pub fn statuses_for_user(&self, user: &str) -> Vec<(String, CellStatus)> {
        let Some(col) = self.header.iter().position(|h| h == user) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|row| (row[0].clone(), CellStatus::from_cell(&row[col])))
            .collect()
    }

    /// Count one user's approved cells in this table.
    #[must_use]
    pub fn approved_count(&self, user: &str) -> usize {
        self.statuses_for_user(user)
            .iter()
            .filter(|(_, s)| *s == CellStatus::Approved)
            .count()
    }

    /// The tasks one user has approved in this table.
    #[must_use]
    pub fn approved_tasks(&self, user: &str) -> Vec<String> {
        self.statuses_for_user(user)
            .into_iter()
            .filter(|(_, s)| *s == CellStatus::Approved)
            .map(|(task, _)| task)
            .collect()
    }
}
