//! Render a [`ReportGrid`] as an HTML table.
//!
//! ```text
//! <row label> (rowspan 2) | Cat1 (colspan 3) | ... | GT (rowspan 2)
//!                         | F | M | T        | ... |
//! <key>                   | f | m | t        | ... | gt
//! Total (.report-total-row)
//! ```
//!
//! Daily state reports split the grand total into its own F/M/T group under a
//! "Grand Total" header, and label the totals row the same way.
//!
//! The table is built from the same grid rows as the exports, so what is on
//! screen is what gets downloaded.

use std::fmt::Write;

use crate::models::TotalsLayout;
use crate::report::ReportGrid;

/// Class on the `<table>` element.
pub const TABLE_CLASS: &str = "attendance-report-table";

/// Class on the trailing totals row.
pub const TOTAL_ROW_CLASS: &str = "report-total-row";

/// Rendered instead of a table when the report has no rows.
pub const EMPTY_PLACEHOLDER: &str = "<p>No data yet.</p>";

/// Escape text for use inside HTML elements and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn write_row(out: &mut String, cells: &[String], class: Option<&str>) {
    match class {
        Some(class) => {
            let _ = write!(out, "<tr class=\"{}\">", class);
        }
        None => out.push_str("<tr>"),
    }
    for cell in cells {
        let _ = write!(out, "<td>{}</td>", escape_html(cell));
    }
    out.push_str("</tr>\n");
}

/// Render the grid as a `<table>`, or [`EMPTY_PLACEHOLDER`] when empty.
pub fn render_table(grid: &ReportGrid) -> String {
    if grid.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "<table class=\"{}\">", TABLE_CLASS);
    out.push_str("<thead>\n<tr>");
    let _ = write!(out, "<th rowspan=\"2\">{}</th>", escape_html(&grid.row_label));
    for category in &grid.categories {
        let _ = write!(out, "<th colspan=\"3\">{}</th>", escape_html(category));
    }
    let layout = grid.totals_layout;
    match layout {
        TotalsLayout::Compact => {
            let _ = write!(out, "<th rowspan=\"2\">{}</th>", layout.header());
        }
        TotalsLayout::Split => {
            let _ = write!(out, "<th colspan=\"3\">{}</th>", layout.header());
        }
    }
    out.push_str("</tr>\n<tr>");
    for _ in &grid.categories {
        out.push_str("<th>F</th><th>M</th><th>T</th>");
    }
    if layout == TotalsLayout::Split {
        out.push_str("<th>F</th><th>M</th><th>T</th>");
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in grid.body() {
        write_row(&mut out, row, None);
    }
    write_row(&mut out, grid.total_row(), Some(TOTAL_ROW_CLASS));

    out.push_str("</tbody>\n</table>");
    out
}

/// A standalone page with a title, an optional status line and the table.
pub fn render_page(title: &str, grid: &ReportGrid, status: Option<&str>) -> String {
    let title = escape_html(title);
    let mut out = String::new();
    let _ = writeln!(out, "<!DOCTYPE html>\n<html lang=\"en\">\n<head>");
    let _ = writeln!(out, "<meta charset=\"utf-8\">\n<title>{}</title>", title);
    let _ = writeln!(
        out,
        "<style>.{c} {{ border-collapse: collapse; }} .{c} th, .{c} td {{ border: 1px solid #ccc; padding: 4px 8px; }} .{t} {{ font-weight: bold; }}</style>",
        c = TABLE_CLASS,
        t = TOTAL_ROW_CLASS
    );
    let _ = writeln!(out, "</head>\n<body>\n<h1>{}</h1>", title);
    if let Some(status) = status.filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "<p class=\"report-status\">{}</p>", escape_html(status));
    }
    out.push_str(&render_table(grid));
    out.push_str("\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawRecord, ReportKind, ReportPeriod};
    use crate::report::Report;

    #[test]
    fn test_empty_report_placeholder() {
        let grid = Report::empty(ReportKind::MembershipByRegion).grid;
        assert_eq!(render_table(&grid), "<p>No data yet.</p>");
    }

    #[test]
    fn test_header_spans() {
        let report = Report::for_kind(
            ReportKind::MembershipByRegion,
            &[RawRecord::new("North", "Member", "male", 3)],
            &[],
        );
        let html = render_table(&report.grid);

        assert!(html.starts_with("<table class=\"attendance-report-table\">"));
        assert!(html.contains("<th rowspan=\"2\">Region</th>"));
        assert!(html.contains("<th colspan=\"3\">Associate Coord</th>"));
        assert!(html.contains("<th rowspan=\"2\">GT</th>"));
        assert_eq!(html.matches("<th>F</th>").count(), 4);
        assert!(html.contains("<tr class=\"report-total-row\"><td>Total</td>"));
    }

    #[test]
    fn test_cells_are_escaped() {
        let report = Report::for_kind(
            ReportKind::MembershipByInstitution,
            &[RawRecord::new("<b>A&B</b>", "Guest", "female", 1)],
            &[],
        );
        let html = render_table(&report.grid);

        assert!(html.contains("<td>&lt;b&gt;A&amp;B&lt;/b&gt;</td>"));
        assert!(!html.contains("<b>A&B</b>"));
    }

    #[test]
    fn test_page_includes_status() {
        let grid = Report::empty(ReportKind::MembershipByState).grid;
        let page = render_page("Zonal \"Membership\"", &grid, Some("Request failed"));

        assert!(page.contains("<title>Zonal &quot;Membership&quot;</title>"));
        assert!(page.contains("<p class=\"report-status\">Request failed</p>"));
        assert!(page.contains("No data yet."));
    }

    #[test]
    fn test_split_grand_total_header() {
        let period = ReportPeriod::new(Some("2025-04-01".into()), Some("2025-04-01".into()));
        let report = Report::for_period(
            ReportKind::StatesByDay,
            &[RawRecord::new("Oyo", "day1", "female", 2)],
            &[],
            &period,
        );
        let html = render_table(&report.grid);

        assert!(html.contains("<th colspan=\"3\">Day 1 (Apr 1)</th><th colspan=\"3\">Grand Total</th>"));
        assert!(!html.contains("GT"));
        assert_eq!(html.matches("<th>F</th><th>M</th><th>T</th>").count(), 2);
        assert!(html.contains("<td>Grand Total</td><td>2</td><td>0</td><td>2</td><td>2</td><td>0</td><td>2</td>"));
    }
}
