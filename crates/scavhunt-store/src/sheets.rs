//! HTTP client for the tabular store backend.
//!
//! The backend exposes a workbook of named tables over JSON. Every call is
//! one HTTP round trip; `batch_read` is the only call that fetches more
//! than one table.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::table::{Table, TableApi};

/// Timeout for workbook calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the workbook API.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    client: Client,
    base_url: String,
    workbook: String,
    api_token: String,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SliceResponse {
    #[serde(default)]
    values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BatchGetResponse {
    #[serde(default)]
    tables: Vec<BatchGetEntry>,
}

#[derive(Debug, Deserialize)]
struct BatchGetEntry {
    table: String,
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct CellWrite<'a> {
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct RowAppend<'a> {
    values: &'a [String],
}

#[derive(Debug, Serialize)]
struct ValuesWrite<'a> {
    values: &'a [Vec<String>],
}

impl SheetsClient {
    /// Create a new workbook client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base URL (e.g. `"https://tables.example.com"`)
    /// * `workbook` - workbook identifier
    /// * `api_token` - bearer token for the API
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        workbook: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            workbook: workbook.into(),
            api_token: api_token.into(),
        }
    }

    fn workbook_url(&self) -> String {
        format!(
            "{}/v1/workbooks/{}",
            self.base_url,
            urlencoding::encode(&self.workbook)
        )
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/tables/{}", self.workbook_url(), urlencoding::encode(table))
    }

    /// Decode a successful JSON response, mapping every failure mode to a
    /// read error for `target`.
    async fn read_json<T: DeserializeOwned>(
        &self,
        result: reqwest::Result<reqwest::Response>,
        target: &str,
    ) -> Result<T> {
        let response = result.map_err(|e| StoreError::read(target, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::read(target, format!("status {status}: {body}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::read(target, format!("invalid response body: {e}")))
    }

    /// Check a write response, mapping every failure mode to a write error.
    async fn check_write(
        &self,
        result: reqwest::Result<reqwest::Response>,
        target: &str,
    ) -> Result<()> {
        let response = result.map_err(|e| StoreError::write(target, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::write(target, format!("status {status}: {body}")));
        }
        Ok(())
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.api_token)
    }
}

#[async_trait]
impl TableApi for SheetsClient {
    async fn read_table(&self, name: &str) -> Result<Table> {
        tracing::debug!(table = %name, "reading table");
        let url = format!("{}/values", self.table_url(name));
        let result = self
            .client
            .get(&url)
            .header("Authorization", self.auth())
            .send()
            .await;
        let body: ValuesResponse = self.read_json(result, name).await?;
        Ok(Table::from_values(name, body.values))
    }

    async fn batch_read(&self, names: &[&str]) -> Result<Vec<Table>> {
        tracing::debug!(tables = ?names, "batch reading tables");
        let url = format!("{}/values:batchGet", self.workbook_url());
        let query: Vec<(&str, &str)> = names.iter().map(|n| ("tables", *n)).collect();
        let result = self
            .client
            .get(&url)
            .query(&query)
            .header("Authorization", self.auth())
            .send()
            .await;
        let body: BatchGetResponse = self.read_json(result, "batchGet").await?;

        // Re-key by name so callers get tables in the order they asked for.
        names
            .iter()
            .map(|name| {
                body.tables
                    .iter()
                    .find(|entry| entry.table == *name)
                    .map(|entry| Table::from_values(*name, entry.values.clone()))
                    .ok_or_else(|| {
                        StoreError::read(*name, "table missing from batch response")
                    })
            })
            .collect()
    }

    async fn write_cell(&self, table: &str, row: u32, col: u32, value: &str) -> Result<()> {
        tracing::debug!(table = %table, row, col, "writing cell");
        let url = format!("{}/cell", self.table_url(table));
        let result = self
            .client
            .put(&url)
            .query(&[("row", row), ("col", col)])
            .header("Authorization", self.auth())
            .json(&CellWrite { value })
            .send()
            .await;
        self.check_write(result, table).await
    }

    async fn append_row(&self, table: &str, values: &[String]) -> Result<()> {
        tracing::debug!(table = %table, cells = values.len(), "appending row");
        let url = format!("{}/rows", self.table_url(table));
        let result = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .json(&RowAppend { values })
            .send()
            .await;
        self.check_write(result, table).await
    }

    async fn clear_table(&self, table: &str) -> Result<()> {
        tracing::debug!(table = %table, "clearing table");
        let url = format!("{}:clear", self.table_url(table));
        let result = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .send()
            .await;
        self.check_write(result, table).await
    }

    async fn rewrite_table(&self, table: &str, values: &[Vec<String>]) -> Result<()> {
        tracing::debug!(table = %table, rows = values.len(), "rewriting table");
        let url = format!("{}/values", self.table_url(table));
        let result = self
            .client
            .put(&url)
            .header("Authorization", self.auth())
            .json(&ValuesWrite { values })
            .send()
            .await;
        self.check_write(result, table).await
    }

    async fn read_row(&self, table: &str, index: u32) -> Result<Vec<String>> {
        let url = format!("{}/rows/{index}", self.table_url(table));
        let result = self
            .client
            .get(&url)
            .header("Authorization", self.auth())
            .send()
            .await;
        let body: SliceResponse = self.read_json(result, table).await?;
        Ok(trim_trailing_empty(body.values))
    }

    async fn read_col(&self, table: &str, index: u32) -> Result<Vec<String>> {
        let url = format!("{}/cols/{index}", self.table_url(table));
        let result = self
            .client
            .get(&url)
            .header("Authorization", self.auth())
            .send()
            .await;
        let body: SliceResponse = self.read_json(result, table).await?;
        Ok(trim_trailing_empty(body.values))
    }
}

/// The backend pads slices to the grid size; drop the trailing blanks so
/// `find_row`/`find_col` scan real values only.
fn trim_trailing_empty(mut values: Vec<String>) -> Vec<String> {
    while values.last().is_some_and(|v| v.is_empty()) {
        values.pop();
    }
    values
}
