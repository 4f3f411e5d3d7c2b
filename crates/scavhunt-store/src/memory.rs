//! In-memory store implementations for tests.
//!
//! Both types emulate the observable behavior of the real backends closely
//! enough for the ledger and service suites: padded reads, grow-on-write
//! cell addressing, prefix listing in name order, and a fresh signed URL on
//! every mint.

// u32 cell indexes always fit in usize on supported targets.
#![allow(clippy::cast_possible_truncation)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::blob::{BlobApi, ObjectInfo};
use crate::error::{Result, StoreError};
use crate::table::{Table, TableApi};

// ============================================================================
// Tables
// ============================================================================

/// An in-memory workbook.
#[derive(Default)]
pub struct MemoryTables {
    tables: Mutex<BTreeMap<String, Vec<Vec<String>>>>,
}

impl MemoryTables {
    /// Create an empty workbook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a table with raw values (header first).
    pub async fn insert_table(&self, name: &str, values: Vec<Vec<String>>) {
        self.tables.lock().await.insert(name.to_string(), values);
    }

    /// Raw values of a table, for test assertions.
    pub async fn raw(&self, name: &str) -> Option<Vec<Vec<String>>> {
        self.tables.lock().await.get(name).cloned()
    }

    async fn with_table<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Vec<Vec<String>>) -> T,
    ) -> Result<T> {
        let mut tables = self.tables.lock().await;
        let values = tables
            .get_mut(name)
            .ok_or_else(|| StoreError::read(name, "table not found"))?;
        Ok(f(values))
    }
}

#[async_trait]
impl TableApi for MemoryTables {
    async fn read_table(&self, name: &str) -> Result<Table> {
        self.with_table(name, |values| Table::from_values(name, values.clone()))
            .await
    }

    async fn batch_read(&self, names: &[&str]) -> Result<Vec<Table>> {
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            out.push(self.read_table(name).await?);
        }
        Ok(out)
    }

    async fn write_cell(&self, table: &str, row: u32, col: u32, value: &str) -> Result<()> {
        if row == 0 || col == 0 {
            return Err(StoreError::write(table, "cell addressing is 1-based"));
        }
        let (row, col) = (row as usize, col as usize);
        self.with_table(table, |values| {
            if values.len() < row {
                values.resize(row, Vec::new());
            }
            let cells = &mut values[row - 1];
            if cells.len() < col {
                cells.resize(col, String::new());
            }
            cells[col - 1] = value.to_string();
        })
        .await
    }

    async fn append_row(&self, table: &str, row: &[String]) -> Result<()> {
        self.with_table(table, |values| values.push(row.to_vec()))
            .await
    }

    async fn clear_table(&self, table: &str) -> Result<()> {
        self.with_table(table, Vec::clear).await
    }

    async fn rewrite_table(&self, table: &str, values: &[Vec<String>]) -> Result<()> {
        self.with_table(table, |stored| {
            *stored = values.to_vec();
        })
        .await
    }

    async fn read_row(&self, table: &str, index: u32) -> Result<Vec<String>> {
        if index == 0 {
            return Err(StoreError::read(table, "row addressing is 1-based"));
        }
        self.with_table(table, |values| {
            trim_trailing(values.get(index as usize - 1).cloned().unwrap_or_default())
        })
        .await
    }

    async fn read_col(&self, table: &str, index: u32) -> Result<Vec<String>> {
        if index == 0 {
            return Err(StoreError::read(table, "column addressing is 1-based"));
        }
        self.with_table(table, |values| {
            trim_trailing(
                values
                    .iter()
                    .map(|row| row.get(index as usize - 1).cloned().unwrap_or_default())
                    .collect(),
            )
        })
        .await
    }
}

fn trim_trailing(mut values: Vec<String>) -> Vec<String> {
    while values.last().is_some_and(String::is_empty) {
        values.pop();
    }
    values
}

// ============================================================================
// Blobs
// ============================================================================

#[derive(Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
    updated: DateTime<Utc>,
}

/// An in-memory bucket. Every [`BlobApi::sign_url`] call mints a distinct
/// URL so cache-identity tests can tell a fresh mint from a cached one.
#[derive(Default)]
pub struct MemoryBucket {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    mints: AtomicU64,
}

impl MemoryBucket {
    /// Create an empty bucket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an object exists, for test assertions.
    pub async fn contains(&self, name: &str) -> bool {
        self.objects.lock().await.contains_key(name)
    }

    /// Stored bytes of an object, for test assertions.
    pub async fn object_bytes(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(name).map(|o| o.bytes.clone())
    }

    /// Number of stored objects.
    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl BlobApi for MemoryBucket {
    async fn list_objects(
        &self,
        prefix: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<ObjectInfo>> {
        let objects = self.objects.lock().await;
        let mut listed: Vec<ObjectInfo> = objects
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, object)| ObjectInfo {
                name: name.clone(),
                content_type: object.content_type.clone(),
                size: object.bytes.len() as u64,
                updated: Some(object.updated),
            })
            .collect();
        if let Some(max) = max_results {
            listed.truncate(max as usize);
        }
        Ok(listed)
    }

    async fn put_object(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects.lock().await.insert(
            name.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                updated: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, name: &str) -> Result<()> {
        self.objects.lock().await.remove(name);
        Ok(())
    }

    async fn sign_url(&self, name: &str, ttl_seconds: u64) -> Result<String> {
        let mint = self.mints.fetch_add(1, Ordering::Relaxed);
        Ok(format!(
            "https://blobs.test/{name}?sig={mint}&expires={ttl_seconds}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|r| r.iter().map(|c| (*c).to_string()).collect())
            .collect()
    }

    #[tokio::test]
    async fn write_cell_grows_the_grid() {
        let tables = MemoryTables::new();
        tables
            .insert_table("1_point", values(&[&["Activities"], &["Find a cat"]]))
            .await;

        // Appending a user header column writes past the current width.
        tables.write_cell("1_point", 1, 2, "alice").await.unwrap();
        tables.write_cell("1_point", 2, 2, "0").await.unwrap();

        let raw = tables.raw("1_point").await.unwrap();
        assert_eq!(raw[0], vec!["Activities".to_string(), "alice".to_string()]);
        assert_eq!(raw[1][1], "0");
    }

    #[tokio::test]
    async fn read_col_pads_short_rows_and_trims_tail() {
        let tables = MemoryTables::new();
        tables
            .insert_table(
                "t",
                values(&[&["h", "x"], &["a"], &["b", "y"], &["", ""]]),
            )
            .await;

        assert_eq!(
            tables.read_col("t", 1).await.unwrap(),
            vec!["h".to_string(), "a".to_string(), "b".to_string()]
        );
        assert_eq!(
            tables.read_col("t", 2).await.unwrap(),
            vec!["x".to_string(), String::new(), "y".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_table_is_a_read_error() {
        let tables = MemoryTables::new();
        assert!(matches!(
            tables.read_table("nope").await,
            Err(StoreError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn bucket_lists_by_prefix_in_name_order() {
        let bucket = MemoryBucket::new();
        bucket.put_object("b/2.jpg", vec![2], "image/jpeg").await.unwrap();
        bucket.put_object("a/1.jpg", vec![1], "image/jpeg").await.unwrap();
        bucket.put_object("a/0.jpg", vec![0], "image/jpeg").await.unwrap();

        let listed = bucket.list_objects("a/", None).await.unwrap();
        let names: Vec<_> = listed.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a/0.jpg", "a/1.jpg"]);

        let capped = bucket.list_objects("a/", Some(1)).await.unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn sign_url_mints_are_distinct() {
        let bucket = MemoryBucket::new();
        let a = bucket.sign_url("a/x.jpg", 60).await.unwrap();
        let b = bucket.sign_url("a/x.jpg", 60).await.unwrap();
        assert_ne!(a, b);
    }
}
