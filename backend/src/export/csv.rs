//! CSV export of the report grid.

use std::path::Path;

use crate::error::{ExportError, ExportResult};
use crate::report::ReportGrid;

fn write_rows<W: std::io::Write>(grid: &ReportGrid, writer: &mut csv::Writer<W>) -> ExportResult<()> {
    for row in &grid.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the grid as a CSV file at `path`.
pub fn write_csv(grid: &ReportGrid, path: &Path) -> ExportResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    write_rows(grid, &mut writer)
}

/// Serialize the grid as CSV bytes.
pub fn csv_bytes(grid: &ReportGrid) -> ExportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    write_rows(grid, &mut writer)?;
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawRecord, ReportKind};
    use crate::report::Report;

    #[test]
    fn test_csv_mirrors_grid() {
        let report = Report::for_kind(
            ReportKind::MembershipByInstitution,
            &[RawRecord::new("Uni, Main Campus", "Member", "female", 2)],
            &[],
        );

        let text = String::from_utf8(csv_bytes(&report.grid).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], ",F,M,T,F,M,T,F,M,T,F,M,T,");
        assert!(lines[2].starts_with("\"Uni, Main Campus\",0,0,0,2,0,2"));
        assert_eq!(lines[3], "Total,0,0,0,2,0,2,0,0,0,0,0,0,2");
    }
}
