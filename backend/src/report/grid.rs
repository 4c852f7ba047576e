//! Flatten a pivot into the 2D string grid shared by every output.
//!
//! Layout for `n` columns with [`TotalsLayout::Compact`] (width `3n + 2`):
//!
//! ```text
//! row 0   | <row label> | Cat1 |   |   | Cat2 |   |   | ... | GT |
//! row 1   |             | F    | M | T | F    | M | T | ... |    |
//! body    | <key>       | f    | m | t | f    | m | t | ... | gt |
//! last    | Total       | f    | m | t | f    | m | t | ... | gt |
//! ```
//!
//! [`TotalsLayout::Split`] (width `3n + 4`) ends every row with
//! `Grand Total` F/M/T cells instead and labels the last row `Grand Total`.
//!
//! The screen table, the spreadsheet and the CSV export all read this grid,
//! so they always show the same numbers.

use serde::Serialize;

use super::pivot::PivotMatrix;
use super::totals::Totals;
use crate::models::{CategorySet, PivotCell, TotalsLayout};

/// Sub-column headers under each category.
pub const SUB_HEADERS: [&str; 3] = ["F", "M", "T"];

/// Header of the trailing grand-total column.
pub const GRAND_TOTAL_HEADER: &str = "GT";

/// Label of the trailing totals row.
pub const TOTAL_ROW_LABEL: &str = "Total";

/// Header and row label of split grand totals.
pub const SPLIT_TOTAL_LABEL: &str = "Grand Total";

/// Number of header rows before the body.
pub const HEADER_ROWS: usize = 2;

impl TotalsLayout {
    /// Cells after the last category.
    pub fn width(&self) -> usize {
        match self {
            TotalsLayout::Compact => 1,
            TotalsLayout::Split => SUB_HEADERS.len(),
        }
    }

    pub fn total_row_label(&self) -> &'static str {
        match self {
            TotalsLayout::Compact => TOTAL_ROW_LABEL,
            TotalsLayout::Split => SPLIT_TOTAL_LABEL,
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            TotalsLayout::Compact => GRAND_TOTAL_HEADER,
            TotalsLayout::Split => SPLIT_TOTAL_LABEL,
        }
    }
}

/// Report grid plus enough shape information to render header spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGrid {
    pub row_label: String,
    pub categories: Vec<String>,
    pub totals_layout: TotalsLayout,
    pub rows: Vec<Vec<String>>,
}

impl ReportGrid {
    pub fn header(&self) -> &[String] {
        &self.rows[0]
    }

    pub fn sub_header(&self) -> &[String] {
        &self.rows[1]
    }

    /// One row per grouping key, without headers and totals.
    pub fn body(&self) -> &[Vec<String>] {
        &self.rows[HEADER_ROWS..self.rows.len() - 1]
    }

    pub fn total_row(&self) -> &[String] {
        &self.rows[self.rows.len() - 1]
    }

    /// Cells per row.
    pub fn width(&self) -> usize {
        self.categories.len() * SUB_HEADERS.len() + 1 + self.totals_layout.width()
    }

    /// True when there are no grouping rows.
    pub fn is_empty(&self) -> bool {
        self.body().is_empty()
    }
}

/// Build the grid rows for a pivot and its totals.
pub fn to_rows(
    pivot: &PivotMatrix,
    totals: &Totals,
    categories: &CategorySet,
    row_label: &str,
    layout: TotalsLayout,
) -> Vec<Vec<String>> {
    let labels = categories.labels();
    let mut rows = Vec::with_capacity(pivot.len() + HEADER_ROWS + 1);

    let mut header = vec![row_label.to_string()];
    for label in labels {
        header.push(label.clone());
        header.push(String::new());
        header.push(String::new());
    }
    header.push(layout.header().to_string());
    if layout == TotalsLayout::Split {
        header.push(String::new());
        header.push(String::new());
    }
    rows.push(header);

    let mut sub_header = vec![String::new()];
    for _ in labels {
        sub_header.extend(SUB_HEADERS.iter().map(|s| s.to_string()));
    }
    match layout {
        TotalsLayout::Compact => sub_header.push(String::new()),
        TotalsLayout::Split => sub_header.extend(SUB_HEADERS.iter().map(|s| s.to_string())),
    }
    rows.push(sub_header);

    for row in pivot.rows() {
        rows.push(value_line(&row.key, labels.iter().map(|l| row.cell(l)), layout));
    }

    rows.push(value_line(
        layout.total_row_label(),
        labels.iter().map(|l| totals.get(l)),
        layout,
    ));

    rows
}

/// Build a [`ReportGrid`] carrying the category layout alongside the rows.
pub fn build_grid(
    pivot: &PivotMatrix,
    totals: &Totals,
    categories: &CategorySet,
    row_label: &str,
    layout: TotalsLayout,
) -> ReportGrid {
    ReportGrid {
        row_label: row_label.to_string(),
        categories: categories.labels().to_vec(),
        totals_layout: layout,
        rows: to_rows(pivot, totals, categories, row_label, layout),
    }
}

fn value_line(
    label: &str,
    cells: impl Iterator<Item = PivotCell>,
    layout: TotalsLayout,
) -> Vec<String> {
    let mut line = vec![label.to_string()];
    let mut grand = PivotCell::default();
    for cell in cells {
        grand += cell;
        line.push(cell.female.to_string());
        line.push(cell.male.to_string());
        line.push(cell.total().to_string());
    }
    if layout == TotalsLayout::Split {
        line.push(grand.female.to_string());
        line.push(grand.male.to_string());
    }
    line.push(grand.total().to_string());
    line
}
