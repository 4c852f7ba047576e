//! Group raw records into a grouping-key x category x gender matrix.
//!
//! # Architecture
//!
//! ```text
//! Raw records (one per group/category/gender)   →   Pivot matrix
//! ┌──────────────────────────────────────┐        ┌──────────────────────────────┐
//! │ A, member, male,   3                  │        │ A: Member {male 3, female 2} │
//! │ A, Member, female, 2                  │   →    │ B: Guest  {male 1, female 0} │
//! │ B, guest,  male,   1                  │        │ C: (no categories)           │
//! └──────────────────────────────────────┘        └──────────────────────────────┘
//!          known keys: [A, B, C]
//! ```
//!
//! Rows keep insertion order: known keys first, in the order supplied, then
//! keys discovered in the records in order of first appearance. A record
//! whose key is not in the known list is never dropped. Daily reports drop
//! records whose day is outside the congress period, before their key is
//! added.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::normalize::normalize_category;
use crate::models::{CategorySet, PivotCell, RawRecord};

/// One grouping key and its per-category accumulators.
///
/// A category only appears in `cells` once a record has touched it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PivotRow {
    pub key: String,
    pub cells: BTreeMap<String, PivotCell>,
}

impl PivotRow {
    fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Cell for `category`, zero when no record touched it.
    pub fn cell(&self, category: &str) -> PivotCell {
        self.cells.get(category).copied().unwrap_or_default()
    }

    /// Sum of every category in this row.
    pub fn total(&self) -> u64 {
        self.cells
            .values()
            .fold(0, |sum: u64, cell| sum.saturating_add(cell.total()))
    }
}

/// Ordered mapping from grouping key to category cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PivotMatrix {
    rows: Vec<PivotRow>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl PivotMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key` with an empty category map if absent; returns its row index.
    fn seed(&mut self, key: &str) -> usize {
        if let Some(&i) = self.index.get(key) {
            return i;
        }
        self.rows.push(PivotRow::new(key));
        let i = self.rows.len() - 1;
        self.index.insert(key.to_string(), i);
        i
    }

    pub fn rows(&self) -> &[PivotRow] {
        &self.rows
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&PivotRow> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Cell at (`key`, `category`), zero when either is absent.
    pub fn cell(&self, key: &str, category: &str) -> PivotCell {
        self.get(key).map(|row| row.cell(category)).unwrap_or_default()
    }

    /// Sum of `category` over every grouping key.
    pub fn column_sum(&self, category: &str) -> PivotCell {
        let mut sum = PivotCell::default();
        for row in &self.rows {
            sum += row.cell(category);
        }
        sum
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the pivot matrix for `records`.
///
/// Every entry of `known_keys` is present in the result even without
/// matching records. With no known keys the row set is derived from the
/// records alone.
pub fn build_pivot(
    records: &[RawRecord],
    known_keys: &[String],
    categories: &CategorySet,
) -> PivotMatrix {
    let mut matrix = PivotMatrix::new();

    for key in known_keys {
        matrix.seed(key);
    }

    for record in records {
        let Some(category) = normalize_category(record.category.as_deref(), categories) else {
            continue;
        };
        let row = matrix.seed(record.group());
        matrix.rows[row]
            .cells
            .entry(category.to_string())
            .or_default()
            .record(record.gender_bucket(), record.count);
    }

    matrix
}
