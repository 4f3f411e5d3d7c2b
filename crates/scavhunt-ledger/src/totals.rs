//! Pure helpers for the totals recompute.
//!
//! Split out from [`crate::Ledger`] so the arithmetic and the merge rules
//! can be tested without a store.

use std::cmp::Reverse;
use std::collections::HashMap;

use scavhunt_core::{ActivityTable, TotalsRow};

/// Sum each user's points across the tier tables: approved cells times the
/// tier's point value.
#[must_use]
pub fn computed_points(tables: &[ActivityTable]) -> HashMap<String, i64> {
    let mut computed: HashMap<String, i64> = HashMap::new();
    for table in tables {
        let value = i64::from(table.tier.points());
        for user in table.users() {
            let count = i64::try_from(table.approved_count(user)).unwrap_or(i64::MAX);
            *computed.entry(user.clone()).or_insert(0) += value * count;
        }
    }
    computed
}

/// Merge freshly computed points into the existing standings.
///
/// Only names already present in the standings are kept: a name in the
/// computed map gets its new value, a name absent from it keeps its old
/// points, and computed names with no standings row are dropped (adding
/// rows is registration's job, not the recompute's). The result is sorted
/// by points descending; the sort is stable, so ties keep their prior
/// order.
#[must_use]
pub fn merge_totals(existing: &[TotalsRow], computed: &HashMap<String, i64>) -> Vec<TotalsRow> {
    let mut merged: Vec<TotalsRow> = existing
        .iter()
        .map(|row| TotalsRow {
            name: row.name.clone(),
            points: computed.get(&row.name).copied().unwrap_or(row.points),
        })
        .collect();
    merged.sort_by_key(|row| Reverse(row.points));
    merged
}

/// A user's `(points, rank)` in the standings, rank being 1-based sheet
/// order. A user without a standings row reads as zero points, ranked
/// after the whole field.
#[must_use]
pub fn standing_of(totals: &[TotalsRow], username: &str) -> (i64, usize) {
    totals
        .iter()
        .position(|row| row.name == username)
        .map_or((0, totals.len() + 1), |idx| (totals[idx].points, idx + 1))
}
