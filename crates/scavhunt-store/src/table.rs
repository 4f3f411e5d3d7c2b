//! The tabular store contract.

use async_trait::async_trait;

use crate::error::Result;

/// An ordered snapshot of one named table: a header row plus data rows,
/// every row padded to the header width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// The table name.
    pub name: String,
    /// The header row (empty when the table has never been written).
    pub header: Vec<String>,
    /// Data rows, padded to `header.len()`.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from raw values as the backend returns them: first row
    /// is the header, and short rows are padded to the header width.
    #[must_use]
    pub fn from_values(name: impl Into<String>, mut values: Vec<Vec<String>>) -> Self {
        let header = if values.is_empty() {
            Vec::new()
        } else {
            values.remove(0)
        };
        for row in &mut values {
            if row.len() < header.len() {
                row.resize(header.len(), String::new());
            }
        }
        Self {
            name: name.into(),
            header,
            rows: values,
        }
    }

    /// Recombine header and rows into raw values.
    #[must_use]
    pub fn to_values(&self) -> Vec<Vec<String>> {
        let mut values = Vec::with_capacity(self.rows.len() + 1);
        values.push(self.header.clone());
        values.extend(self.rows.iter().cloned());
        values
    }
}

/// Access to the remote workbook of named tables.
///
/// Row and column indexes are 1-based, matching the backend's cell
/// addressing; the header occupies row 1. The backend is high-latency per
/// call, which is why [`TableApi::batch_read`] exists and callers are
/// expected to use it whenever they need more than one table.
///
/// Writes are atomic per call. There is no compare-and-swap: two writers
/// racing on one cell is last-write-wins, and a read-modify-write spanning
/// calls has no isolation. No method retries.
#[async_trait]
pub trait TableApi: Send + Sync {
    /// Read a whole table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Read`] if the call fails or the
    /// response cannot be decoded.
    async fn read_table(&self, name: &str) -> Result<Table>;

    /// Read several tables in a single round trip, in the requested order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Read`] if the call fails or any
    /// requested table is missing from the response.
    async fn batch_read(&self, names: &[&str]) -> Result<Vec<Table>>;

    /// Write one cell (1-based row and column).
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Write`] on failure; the write may still
    /// have landed if the failure was a timeout.
    async fn write_cell(&self, table: &str, row: u32, col: u32, value: &str) -> Result<()>;

    /// Append a row after the last non-empty row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Write`] on failure.
    async fn append_row(&self, table: &str, values: &[String]) -> Result<()>;

    /// Clear every cell in a table, header included.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Write`] on failure.
    async fn clear_table(&self, table: &str) -> Result<()>;

    /// Rewrite a table from the top-left cell. Callers compose
    /// clear-then-rewrite; between the two calls the table is visibly
    /// empty to concurrent readers.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Write`] on failure.
    async fn rewrite_table(&self, table: &str, values: &[Vec<String>]) -> Result<()>;

    /// Read one row (1-based), trailing empty cells trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Read`] on failure.
    async fn read_row(&self, table: &str, index: u32) -> Result<Vec<String>>;

    /// Read one column (1-based), trailing empty cells trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Read`] on failure.
    async fn read_col(&self, table: &str, index: u32) -> Result<Vec<String>>;

    /// Find the 1-based row whose first cell equals `value`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Read`] if the column read fails.
    async fn find_row(&self, table: &str, value: &str) -> Result<Option<u32>> {
        let column = self.read_col(table, 1).await?;
        Ok(position_to_index(column.iter().position(|v| v == value)))
    }

    /// Find the 1-based column whose header cell equals `value`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Read`] if the header read fails.
    async fn find_col(&self, table: &str, value: &str) -> Result<Option<u32>> {
        let header = self.read_row(table, 1).await?;
        Ok(position_to_index(header.iter().position(|v| v == value)))
    }
}

fn position_to_index(position: Option<usize>) -> Option<u32> {
    position.and_then(|p| u32::try_from(p).ok()).map(|p| p + 1)
}
