//! Per-category totals computed straight from the record stream.
//!
//! Totals do not read the pivot matrix. They apply the same per-record
//! normalization and accumulation with a single accumulator per category,
//! so they must agree with [`PivotMatrix::column_sum`](super::PivotMatrix::column_sum)
//! for every category.

use serde::Serialize;

use super::normalize::normalize_category;
use crate::models::{CategorySet, PivotCell, RawRecord};

/// Total for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    #[serde(flatten)]
    pub cell: PivotCell,
}

/// Category totals in category-set order, every category present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    entries: Vec<CategoryTotal>,
}

impl Totals {
    fn seeded(categories: &CategorySet) -> Self {
        Self {
            entries: categories
                .labels()
                .iter()
                .map(|label| CategoryTotal {
                    category: label.clone(),
                    cell: PivotCell::default(),
                })
                .collect(),
        }
    }

    /// Total for `category`, zero when it is not part of the set.
    pub fn get(&self, category: &str) -> PivotCell {
        self.entries
            .iter()
            .find(|entry| entry.category == category)
            .map(|entry| entry.cell)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryTotal> {
        self.entries.iter()
    }

    /// Sum over every category, per gender.
    pub fn grand_cell(&self) -> PivotCell {
        let mut sum = PivotCell::default();
        for entry in &self.entries {
            sum += entry.cell;
        }
        sum
    }

    /// Sum over every category and both genders.
    pub fn grand_total(&self) -> u64 {
        self.grand_cell().total()
    }

    fn entry_mut(&mut self, category: &str) -> &mut PivotCell {
        let position = self.entries.iter().position(|e| e.category == category);
        let index = match position {
            Some(i) => i,
            None => {
                self.entries.push(CategoryTotal {
                    category: category.to_string(),
                    cell: PivotCell::default(),
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].cell
    }
}

/// Accumulate every record into its normalized category.
pub fn build_totals(records: &[RawRecord], categories: &CategorySet) -> Totals {
    let mut totals = Totals::seeded(categories);

    for record in records {
        let Some(category) = normalize_category(record.category.as_deref(), categories) else {
            continue;
        };
        totals
            .entry_mut(category)
            .record(record.gender_bucket(), record.count);
    }

    totals
}
