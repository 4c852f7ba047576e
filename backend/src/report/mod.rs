//! Report aggregation.
//!
//! This module turns raw records into a finished report:
//! - Normalize: free-form category labels to the canonical set
//! - Pivot: grouping key x category x gender accumulation
//! - Totals: per-category totals straight from the records
//! - Grid: the string grid shared by the table and exporters
//!
//! Everything here is a pure function of its inputs. A [`Report`] is never
//! updated in place; a change of records or dimension list rebuilds it.

pub mod grid;
pub mod normalize;
pub mod pivot;
pub mod totals;

pub use grid::{build_grid, to_rows, ReportGrid};
pub use normalize::normalize_category;
pub use pivot::{build_pivot, PivotMatrix, PivotRow};
pub use totals::{build_totals, CategoryTotal, Totals};

use serde::Serialize;

use crate::models::{CategorySet, RawRecord, ReportKind, ReportPeriod, TotalsLayout};

/// A built report: pivot, totals and the rendered grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub pivot: PivotMatrix,
    pub totals: Totals,
    pub grid: ReportGrid,
}

impl Report {
    /// Build a report with an explicit column set and row label.
    pub fn build(
        records: &[RawRecord],
        known_keys: &[String],
        categories: &CategorySet,
        row_label: &str,
        totals_layout: TotalsLayout,
    ) -> Self {
        let pivot = build_pivot(records, known_keys, categories);
        let totals = build_totals(records, categories);
        let grid = build_grid(&pivot, &totals, categories, row_label, totals_layout);
        Self { pivot, totals, grid }
    }

    /// Build a report using the layout of `kind`.
    ///
    /// Daily kinds have no columns without a period; use
    /// [`Report::for_period`] for them.
    pub fn for_kind(kind: ReportKind, records: &[RawRecord], known_keys: &[String]) -> Self {
        Self::for_period(kind, records, known_keys, &ReportPeriod::default())
    }

    /// Build a report for `kind` whose day columns, if any, span `period`.
    pub fn for_period(
        kind: ReportKind,
        records: &[RawRecord],
        known_keys: &[String],
        period: &ReportPeriod,
    ) -> Self {
        let layout = kind.layout();
        Self::build(
            records,
            known_keys,
            &kind.columns(period),
            layout.row_label,
            layout.totals,
        )
    }

    /// An empty report for `kind`, shown before anything is loaded.
    pub fn empty(kind: ReportKind) -> Self {
        Self::for_kind(kind, &[], &[])
    }

    /// True when there are no grouping rows; export is a no-op then.
    pub fn is_empty(&self) -> bool {
        self.pivot.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.pivot.len()
    }
}
