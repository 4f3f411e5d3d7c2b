//! Workbook schema: table names, headers and column positions.
//!
//! Column positions are 1-based to match the tabular store's cell
//! addressing.

/// The user directory table.
pub const USER_INFO: &str = "user_info";

/// The materialized points cache table.
pub const TOTALS: &str = "Totals";

/// The append-only approval log table.
pub const HISTORY: &str = "History";

/// The submission lifecycle log table.
pub const TASK_STATUS: &str = "task_status";

/// Header row of `user_info`.
pub const USER_INFO_HEADER: [&str; 5] =
    ["username", "password", "time_created", "read_rules", "nickname"];

/// Header row of `Totals`.
pub const TOTALS_HEADER: [&str; 2] = ["name", "points"];

/// Header row of `History`.
pub const HISTORY_HEADER: [&str; 4] = ["time", "name", "task", "points"];

/// Header row of `task_status`.
pub const TASK_STATUS_HEADER: [&str; 5] = ["time", "user", "task", "status", "message"];

/// `user_info` column holding the password hash.
pub const USER_INFO_COL_PASSWORD: u32 = 2;

/// `user_info` column holding the read-rules flag.
pub const USER_INFO_COL_READ_RULES: u32 = 4;

/// `task_status` column holding the resolution status.
pub const TASK_STATUS_COL_STATUS: u32 = 4;

/// `task_status` column holding the resolution message.
pub const TASK_STATUS_COL_MESSAGE: u32 = 5;

/// Convert a 0-based data row index (first row under the header) to the
/// 1-based row used by the tabular store.
#[must_use]
pub fn data_row_to_sheet_row(index: usize) -> u32 {
    u32::try_from(index).map_or(u32::MAX, |i| i + 2)
}

/// Build an owned header row from a static header definition.
#[must_use]
pub fn header_row(header: &[&str]) -> Vec<String> {
    header.iter().map(|c| (*c).to_string()).collect()
}
