//! The ledger facade over the workbook tables.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;

use scavhunt_core::schema::{
    self, HISTORY, TASK_STATUS, TASK_STATUS_COL_MESSAGE, TASK_STATUS_COL_STATUS, TOTALS,
    TOTALS_HEADER, USER_INFO, USER_INFO_COL_PASSWORD, USER_INFO_COL_READ_RULES,
};
use scavhunt_core::{
    format_timestamp, ActivityTable, CellStatus, HistoryRecord, ReviewStatus, TaskStatusRecord,
    Tier, TotalsRow, UserRecord,
};
use scavhunt_store::{StoreError, TableApi};

use crate::error::{LedgerError, Result};
use crate::totals;

/// What [`Ledger::reconcile_users`] repaired.
#[derive(Debug, Default, Serialize)]
pub struct ReconcileReport {
    /// `(tier table, username)` for every header column that was added.
    pub columns_added: Vec<(String, String)>,
    /// Usernames that were given a zero standings row.
    pub totals_rows_added: Vec<String>,
}

impl ReconcileReport {
    /// Whether nothing needed repair.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns_added.is_empty() && self.totals_rows_added.is_empty()
    }
}

/// The activity ledger. Cheap to clone; clones share the store handle.
///
/// Every method is one ordered sequence of store calls with no retry and no
/// rollback. Timestamps are written in the hunt's fixed UTC offset.
#[derive(Clone)]
pub struct Ledger {
    tables: Arc<dyn TableApi>,
    tz: FixedOffset,
}

impl Ledger {
    /// Create a ledger over a tabular store. `utc_offset_minutes` is the
    /// hunt-local offset used for every written timestamp; an out-of-range
    /// offset falls back to UTC.
    #[must_use]
    pub fn new(tables: Arc<dyn TableApi>, utc_offset_minutes: i32) -> Self {
        let tz = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
        Self { tables, tz }
    }

    fn now(&self) -> String {
        format_timestamp(Utc::now().with_timezone(&self.tz))
    }

    async fn user_row(&self, username: &str) -> Result<u32> {
        self.tables
            .find_row(USER_INFO, username)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound {
                username: username.to_string(),
            })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read all five tier tables in one backend round trip.
    ///
    /// # Errors
    ///
    /// Fails on a store read error or a tier table with a malformed header.
    pub async fn activity_tables(&self) -> Result<Vec<ActivityTable>> {
        let names: Vec<&str> = Tier::ALL.iter().map(|t| t.table_name()).collect();
        let read = self.tables.batch_read(&names).await?;

        let mut parsed = Vec::with_capacity(read.len());
        for (tier, table) in Tier::ALL.into_iter().zip(read) {
            parsed.push(ActivityTable::from_rows(tier, table.to_values())?);
        }
        Ok(parsed)
    }

    /// The current standings, in stored (rank) order.
    ///
    /// # Errors
    ///
    /// Fails on a store read error.
    pub async fn totals(&self) -> Result<Vec<TotalsRow>> {
        let table = self.tables.read_table(TOTALS).await?;
        Ok(table.rows.iter().filter_map(|r| TotalsRow::from_row(r)).collect())
    }

    /// The approval log, oldest first.
    ///
    /// # Errors
    ///
    /// Fails on a store read error.
    pub async fn history(&self) -> Result<Vec<HistoryRecord>> {
        let table = self.tables.read_table(HISTORY).await?;
        Ok(table.rows.iter().filter_map(|r| HistoryRecord::from_row(r)).collect())
    }

    /// The submission lifecycle log, oldest first.
    ///
    /// # Errors
    ///
    /// Fails on a store read error.
    pub async fn task_status_log(&self) -> Result<Vec<TaskStatusRecord>> {
        let table = self.tables.read_table(TASK_STATUS).await?;
        Ok(table.rows.iter().filter_map(|r| TaskStatusRecord::from_row(r)).collect())
    }

    /// Every registered user, in roster order.
    ///
    /// # Errors
    ///
    /// Fails on a store read error.
    pub async fn users(&self) -> Result<Vec<UserRecord>> {
        let table = self.tables.read_table(USER_INFO).await?;
        Ok(table.rows.iter().filter_map(|r| UserRecord::from_row(r)).collect())
    }

    /// Look up one user by exact username. Two store calls: a first-column
    /// scan to find the row, then that row.
    ///
    /// # Errors
    ///
    /// Fails on a store read error; an unknown username is `Ok(None)`.
    pub async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        let Some(row) = self.tables.find_row(USER_INFO, username).await? else {
            return Ok(None);
        };
        let cells = self.tables.read_row(USER_INFO, row).await?;
        Ok(UserRecord::from_row(&cells))
    }

    /// Username to display-name map for the whole roster.
    ///
    /// # Errors
    ///
    /// Fails on a store read error.
    pub async fn nickname_directory(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .users()
            .await?
            .into_iter()
            .map(|u| {
                let display = u.display_name().to_string();
                (u.username, display)
            })
            .collect())
    }

    /// The tier whose table contains this exact task name, scanning tiers in
    /// ascending point order.
    ///
    /// # Errors
    ///
    /// Fails on a store read error; an unknown task is `Ok(None)`.
    pub async fn find_tier_of_task(&self, task: &str) -> Result<Option<Tier>> {
        let tables = self.activity_tables().await?;
        Ok(tables.iter().find(|t| t.has_task(task)).map(|t| t.tier))
    }

    // ========================================================================
    // User writes
    // ========================================================================

    /// Register a user: roster row, then a header column in every tier
    /// table, then a zero standings row.
    ///
    /// A failure part-way through leaves the earlier steps in place;
    /// [`Ledger::reconcile_users`] repairs the drift.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UserAlreadyExists`] if the username has a roster row;
    /// otherwise the store error of the step that failed.
    pub async fn add_user(&self, username: &str, password_hash: &str, nickname: &str) -> Result<()> {
        if self.tables.find_row(USER_INFO, username).await?.is_some() {
            return Err(LedgerError::UserAlreadyExists {
                username: username.to_string(),
            });
        }

        let record = UserRecord {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: self.now(),
            read_rules: false,
            nickname: nickname.to_string(),
        };
        self.tables.append_row(USER_INFO, &record.to_row()).await?;

        for tier in Tier::ALL {
            let header = self.tables.read_row(tier.table_name(), 1).await?;
            let col = next_free_column(header.len());
            self.tables
                .write_cell(tier.table_name(), 1, col, username)
                .await?;
        }

        let zero = TotalsRow {
            name: username.to_string(),
            points: 0,
        };
        self.tables.append_row(TOTALS, &zero.to_row()).await?;

        tracing::info!(user = %username, "registered user");
        Ok(())
    }

    /// Repair user-creation drift: give every roster username its missing
    /// tier columns and standings row.
    ///
    /// # Errors
    ///
    /// Fails on the first store error; repairs already made stay.
    pub async fn reconcile_users(&self) -> Result<ReconcileReport> {
        let users = self.users().await?;
        let mut report = ReconcileReport::default();

        for tier in Tier::ALL {
            let mut header = self.tables.read_row(tier.table_name(), 1).await?;
            for user in &users {
                if header.iter().any(|h| h == &user.username) {
                    continue;
                }
                let col = next_free_column(header.len());
                self.tables
                    .write_cell(tier.table_name(), 1, col, &user.username)
                    .await?;
                header.push(user.username.clone());
                report
                    .columns_added
                    .push((tier.table_name().to_string(), user.username.clone()));
            }
        }

        let standing: HashSet<String> =
            self.totals().await?.into_iter().map(|r| r.name).collect();
        for user in &users {
            if standing.contains(&user.username) {
                continue;
            }
            let zero = TotalsRow {
                name: user.username.clone(),
                points: 0,
            };
            self.tables.append_row(TOTALS, &zero.to_row()).await?;
            report.totals_rows_added.push(user.username.clone());
        }

        if !report.is_empty() {
            tracing::info!(
                columns = report.columns_added.len(),
                totals_rows = report.totals_rows_added.len(),
                "reconciled user drift"
            );
        }
        Ok(report)
    }

    /// Mark a user as having acknowledged the rules.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UserNotFound`] if the username has no roster row.
    pub async fn set_read_rules(&self, username: &str) -> Result<()> {
        let row = self.user_row(username).await?;
        self.tables
            .write_cell(USER_INFO, row, USER_INFO_COL_READ_RULES, "1")
            .await?;
        Ok(())
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UserNotFound`] if the username has no roster row.
    pub async fn set_password(&self, username: &str, password_hash: &str) -> Result<()> {
        let row = self.user_row(username).await?;
        self.tables
            .write_cell(USER_INFO, row, USER_INFO_COL_PASSWORD, password_hash)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Task writes
    // ========================================================================

    /// Set the `(task, user)` cell in one tier table.
    ///
    /// # Errors
    ///
    /// [`LedgerError::TaskNotFound`] if the task row is absent,
    /// [`LedgerError::UserColumnMissing`] if the user column is.
    pub async fn change_task_cell(
        &self,
        tier: Tier,
        task: &str,
        user: &str,
        status: CellStatus,
    ) -> Result<()> {
        let table = tier.table_name();
        let row = self
            .tables
            .find_row(table, task)
            .await?
            .ok_or_else(|| LedgerError::TaskNotFound {
                task: task.to_string(),
            })?;
        let col = self
            .tables
            .find_col(table, user)
            .await?
            .ok_or_else(|| LedgerError::UserColumnMissing {
                table: table.to_string(),
                username: user.to_string(),
            })?;
        self.tables.write_cell(table, row, col, status.as_cell()).await?;
        Ok(())
    }

    /// Append an approval to the history log.
    ///
    /// # Errors
    ///
    /// Fails on a store write error.
    pub async fn add_history(&self, user: &str, task: &str, points: u32) -> Result<()> {
        let record = HistoryRecord {
            time: self.now(),
            user: user.to_string(),
            task: task.to_string(),
            points,
        };
        self.tables.append_row(HISTORY, &record.to_row()).await?;
        Ok(())
    }

    /// Append an unresolved submission record, stamping the submission time.
    ///
    /// # Errors
    ///
    /// Fails on a store write error.
    pub async fn append_task_status(&self, user: &str, task: &str) -> Result<()> {
        let record = TaskStatusRecord {
            time: self.now(),
            user: user.to_string(),
            task: task.to_string(),
            status: ReviewStatus::Submitted,
            message: String::new(),
        };
        self.tables.append_row(TASK_STATUS, &record.to_row()).await?;
        Ok(())
    }

    /// Resolve the most recent unresolved submission record for
    /// `(user, task)` in place: two cell writes, status then message.
    ///
    /// With two simultaneous unresolved submissions for one pair the later
    /// row is the one resolved, whichever decision came first.
    ///
    /// # Errors
    ///
    /// [`LedgerError::StatusRowNotFound`] if no unresolved row matches.
    pub async fn resolve_task_status(
        &self,
        user: &str,
        task: &str,
        status: ReviewStatus,
        message: &str,
    ) -> Result<()> {
        let table = self.tables.read_table(TASK_STATUS).await?;
        let index = table
            .rows
            .iter()
            .rposition(|row| {
                TaskStatusRecord::from_row(row).is_some_and(|r| {
                    r.user == user && r.task == task && r.status == ReviewStatus::Submitted
                })
            })
            .ok_or_else(|| LedgerError::StatusRowNotFound {
                user: user.to_string(),
                task: task.to_string(),
            })?;

        let sheet_row = schema::data_row_to_sheet_row(index);
        self.tables
            .write_cell(TASK_STATUS, sheet_row, TASK_STATUS_COL_STATUS, status.as_cell())
            .await?;
        self.tables
            .write_cell(TASK_STATUS, sheet_row, TASK_STATUS_COL_MESSAGE, message)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Totals
    // ========================================================================

    /// Recompute the standings from every tier table and rewrite `Totals`
    /// wholesale. Returns the rows as written.
    ///
    /// One batch read covers the five tier tables and the existing
    /// standings; the rewrite is clear-then-write, so concurrent readers can
    /// observe an empty table in between.
    ///
    /// # Errors
    ///
    /// Fails on a store error or a malformed tier table.
    pub async fn recompute_totals(&self) -> Result<Vec<TotalsRow>> {
        let mut names: Vec<&str> = Tier::ALL.iter().map(|t| t.table_name()).collect();
        names.push(TOTALS);
        let mut read = self.tables.batch_read(&names).await?;

        let Some(totals_table) = read.pop() else {
            return Err(LedgerError::Store(StoreError::read(
                TOTALS,
                "batch read returned no tables",
            )));
        };
        let existing: Vec<TotalsRow> = totals_table
            .rows
            .iter()
            .filter_map(|r| TotalsRow::from_row(r))
            .collect();

        let mut activity = Vec::with_capacity(Tier::ALL.len());
        for (tier, table) in Tier::ALL.into_iter().zip(read) {
            activity.push(ActivityTable::from_rows(tier, table.to_values())?);
        }

        let computed = totals::computed_points(&activity);
        let merged = totals::merge_totals(&existing, &computed);

        let mut values = Vec::with_capacity(merged.len() + 1);
        values.push(schema::header_row(&TOTALS_HEADER));
        values.extend(merged.iter().map(TotalsRow::to_row));

        self.tables.clear_table(TOTALS).await?;
        self.tables.rewrite_table(TOTALS, &values).await?;

        tracing::debug!(rows = merged.len(), "totals recomputed");
        Ok(merged)
    }
}

/// The 1-based column just past a header of `len` occupied cells.
fn next_free_column(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX).saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    use scavhunt_core::parse_timestamp;
    use scavhunt_store::MemoryTables;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|r| r.iter().map(|c| (*c).to_string()).collect())
            .collect()
    }

    async fn workbook() -> (Arc<MemoryTables>, Ledger) {
        let tables = Arc::new(MemoryTables::new());
        tables
            .insert_table(
                USER_INFO,
                rows(&[
                    &["username", "password", "time_created", "read_rules", "nickname"],
                    &["alice", "hash-a", "02/03/2025 07:00:00", "1", "Al"],
                    &["bob", "hash-b", "02/03/2025 08:00:00", "0", "Bobby"],
                ]),
            )
            .await;
        tables
            .insert_table(
                "1_point",
                rows(&[
                    &["Activities", "alice", "bob"],
                    &["Find a cat", "1", "0"],
                    &["Find a dog", "", ""],
                ]),
            )
            .await;
        tables
            .insert_table(
                "3_point",
                rows(&[&["Activities", "alice", "bob"], &["Busk a song", "", "1"]]),
            )
            .await;
        for name in ["5_point", "7_point", "10_point"] {
            tables
                .insert_table(
                    name,
                    rows(&[&["Activities", "alice", "bob"], &["Climb a hill", "", ""]]),
                )
                .await;
        }
        tables
            .insert_table(
                TOTALS,
                rows(&[&["name", "points"], &["alice", "0"], &["bob", "1"]]),
            )
            .await;
        tables
            .insert_table(HISTORY, rows(&[&["time", "name", "task", "points"]]))
            .await;
        tables
            .insert_table(
                TASK_STATUS,
                rows(&[&["time", "user", "task", "status", "message"]]),
            )
            .await;

        let ledger = Ledger::new(Arc::clone(&tables) as Arc<dyn TableApi>, 600);
        (tables, ledger)
    }

    #[tokio::test]
    async fn activity_tables_parse_all_tiers() {
        let (_tables, ledger) = workbook().await;
        let activity = ledger.activity_tables().await.unwrap();
        assert_eq!(activity.len(), 5);
        assert_eq!(activity[0].tier, Tier::One);
        assert_eq!(activity[1].approved_count("bob"), 1);
    }

    #[tokio::test]
    async fn find_user_reads_the_roster_row() {
        let (_tables, ledger) = workbook().await;
        let bob = ledger.find_user("bob").await.unwrap().unwrap();
        assert_eq!(bob.nickname, "Bobby");
        assert!(!bob.read_rules);
        assert!(ledger.find_user("zed").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_user_populates_every_table() {
        let (tables, ledger) = workbook().await;
        ledger.add_user("carol", "hash-c", "Caz").await.unwrap();

        let roster = tables.raw(USER_INFO).await.unwrap();
        let carol = roster.last().unwrap();
        assert_eq!(carol[0], "carol");
        assert_eq!(carol[1], "hash-c");
        assert!(parse_timestamp(&carol[2]).is_some());
        assert_eq!(carol[3], "0");
        assert_eq!(carol[4], "Caz");

        for tier in Tier::ALL {
            let grid = tables.raw(tier.table_name()).await.unwrap();
            assert_eq!(grid[0], vec!["Activities", "alice", "bob", "carol"]);
        }

        let totals = tables.raw(TOTALS).await.unwrap();
        assert_eq!(totals.last().unwrap(), &vec!["carol".to_string(), "0".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (_tables, ledger) = workbook().await;
        let err = ledger.add_user("alice", "hash-x", "Al").await.unwrap_err();
        assert!(matches!(err, LedgerError::UserAlreadyExists { .. }));
    }

    #[tokio::test]
    async fn reconcile_repairs_missing_columns_and_rows() {
        let (tables, ledger) = workbook().await;
        // carol has a roster row but registration died before the rest.
        tables
            .insert_table(
                USER_INFO,
                rows(&[
                    &["username", "password", "time_created", "read_rules", "nickname"],
                    &["alice", "hash-a", "02/03/2025 07:00:00", "1", "Al"],
                    &["bob", "hash-b", "02/03/2025 08:00:00", "0", "Bobby"],
                    &["carol", "hash-c", "02/04/2025 09:00:00", "0", "Caz"],
                ]),
            )
            .await;

        let report = ledger.reconcile_users().await.unwrap();
        assert_eq!(report.columns_added.len(), 5);
        assert_eq!(report.totals_rows_added, vec!["carol".to_string()]);

        let grid = tables.raw("7_point").await.unwrap();
        assert_eq!(grid[0], vec!["Activities", "alice", "bob", "carol"]);

        // A second pass finds nothing left to fix.
        let again = ledger.reconcile_users().await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn read_rules_and_password_write_the_right_cells() {
        let (tables, ledger) = workbook().await;
        ledger.set_read_rules("bob").await.unwrap();
        ledger.set_password("alice", "hash-new").await.unwrap();

        let roster = tables.raw(USER_INFO).await.unwrap();
        assert_eq!(roster[2][3], "1");
        assert_eq!(roster[1][1], "hash-new");

        let err = ledger.set_read_rules("zed").await.unwrap_err();
        assert!(matches!(err, LedgerError::UserNotFound { .. }));
    }

    #[tokio::test]
    async fn change_task_cell_addresses_by_task_and_user() {
        let (tables, ledger) = workbook().await;
        ledger
            .change_task_cell(Tier::One, "Find a dog", "bob", CellStatus::Pending)
            .await
            .unwrap();

        let grid = tables.raw("1_point").await.unwrap();
        assert_eq!(grid[2][2], "0");

        let err = ledger
            .change_task_cell(Tier::One, "No such task", "bob", CellStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::TaskNotFound { .. }));

        let err = ledger
            .change_task_cell(Tier::One, "Find a dog", "zed", CellStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UserColumnMissing { .. }));
    }

    #[tokio::test]
    async fn find_tier_of_task_scans_in_point_order() {
        let (_tables, ledger) = workbook().await;
        assert_eq!(
            ledger.find_tier_of_task("Busk a song").await.unwrap(),
            Some(Tier::Three)
        );
        assert_eq!(ledger.find_tier_of_task("Nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn history_appends_carry_a_parseable_timestamp() {
        let (tables, ledger) = workbook().await;
        ledger.add_history("alice", "Find a cat", 1).await.unwrap();

        let log = tables.raw(HISTORY).await.unwrap();
        let row = log.last().unwrap();
        assert!(parse_timestamp(&row[0]).is_some());
        assert_eq!(&row[1..], &["alice", "Find a cat", "1"]);
    }

    #[tokio::test]
    async fn resolve_updates_the_most_recent_pending_row() {
        let (tables, ledger) = workbook().await;
        tables
            .insert_table(
                TASK_STATUS,
                rows(&[
                    &["time", "user", "task", "status", "message"],
                    &["02/09/2025 10:00:00", "alice", "Find a cat", "", ""],
                    &["02/09/2025 10:05:00", "bob", "Find a cat", "", ""],
                    &["02/09/2025 10:10:00", "alice", "Find a cat", "", ""],
                ]),
            )
            .await;

        ledger
            .resolve_task_status("alice", "Find a cat", ReviewStatus::Denied, "too blurry")
            .await
            .unwrap();

        let log = tables.raw(TASK_STATUS).await.unwrap();
        // The later of alice's two pending rows is the one resolved.
        assert_eq!(log[3][3], "0");
        assert_eq!(log[3][4], "too blurry");
        assert_eq!(log[1][3], "");
        assert_eq!(log[2][3], "");
    }

    #[tokio::test]
    async fn resolve_without_a_pending_row_is_an_error() {
        let (_tables, ledger) = workbook().await;
        let err = ledger
            .resolve_task_status("alice", "Find a cat", ReviewStatus::Approved, "")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::StatusRowNotFound { .. }));
    }

    #[tokio::test]
    async fn recompute_merges_sorts_and_rewrites() {
        let (tables, ledger) = workbook().await;
        // ghost has a standings row but no tier column and must keep 7.
        tables
            .insert_table(
                TOTALS,
                rows(&[
                    &["name", "points"],
                    &["alice", "0"],
                    &["bob", "1"],
                    &["ghost", "7"],
                ]),
            )
            .await;

        let merged = ledger.recompute_totals().await.unwrap();
        assert_eq!(
            merged,
            vec![
                TotalsRow { name: "ghost".to_string(), points: 7 },
                TotalsRow { name: "bob".to_string(), points: 3 },
                TotalsRow { name: "alice".to_string(), points: 1 },
            ]
        );

        let written = tables.raw(TOTALS).await.unwrap();
        assert_eq!(
            written,
            rows(&[
                &["name", "points"],
                &["ghost", "7"],
                &["bob", "3"],
                &["alice", "1"],
            ])
        );
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let (tables, ledger) = workbook().await;
        ledger.recompute_totals().await.unwrap();
        let first = tables.raw(TOTALS).await.unwrap();
        ledger.recompute_totals().await.unwrap();
        let second = tables.raw(TOTALS).await.unwrap();
        assert_eq!(first, second);
    }
}
