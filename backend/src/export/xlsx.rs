//! Spreadsheet export via `rust_xlsxwriter`.
//!
//! The workbook has one worksheet named [`SHEET_NAME`]; every grid cell is
//! written as a string at the same (row, column) position, blank cells
//! included, so the sheet is an exact copy of the grid.

use rust_xlsxwriter::{Workbook, XlsxError};
use std::path::Path;

use crate::error::ExportResult;
use crate::report::ReportGrid;

/// Name of the only worksheet.
pub const SHEET_NAME: &str = "Report";

fn build_workbook(grid: &ReportGrid) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (r, row) in grid.rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            sheet.write_string(r as u32, c as u16, value.as_str())?;
        }
    }

    Ok(workbook)
}

/// Write the grid as an `.xlsx` file at `path`.
pub fn write_xlsx(grid: &ReportGrid, path: &Path) -> ExportResult<()> {
    let mut workbook = build_workbook(grid)?;
    workbook.save(path)?;
    Ok(())
}

/// Serialize the grid as `.xlsx` bytes, for downloads.
pub fn xlsx_bytes(grid: &ReportGrid) -> ExportResult<Vec<u8>> {
    let mut workbook = build_workbook(grid)?;
    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawRecord, ReportKind};
    use crate::report::Report;
    use std::io::{Cursor, Read};
    use tempfile::tempdir;

    fn sample_grid() -> ReportGrid {
        Report::for_kind(
            ReportKind::MembershipByRegion,
            &[
                RawRecord::new("North", "Member", "male", 3),
                RawRecord::new("South", "Guest", "female", 1),
            ],
            &[],
        )
        .grid
    }

    #[test]
    fn test_bytes_are_a_zip_container() {
        let bytes = xlsx_bytes(&sample_grid()).unwrap();
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], b"PK");
    }

    fn zip_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut xml = String::new();
        part.read_to_string(&mut xml).unwrap();
        xml
    }

    /// Text of every `<si>` entry of the shared string table.
    fn shared_strings(xml: &str) -> Vec<String> {
        xml.split("<si>")
            .skip(1)
            .map(|si| {
                let open = &si[si.find("<t").unwrap()..];
                let tag_end = open.find('>').unwrap();
                if open[..tag_end].ends_with('/') {
                    return String::new();
                }
                let text = &open[tag_end + 1..];
                text[..text.find("</t>").unwrap()].to_string()
            })
            .collect()
    }

    /// Zero-based (row, column) of an `A1`-style reference.
    fn cell_position(reference: &str) -> (usize, usize) {
        let split = reference.find(|c: char| c.is_ascii_digit()).unwrap();
        let col = reference[..split]
            .bytes()
            .fold(0, |acc, b| acc * 26 + (b - b'A' + 1) as usize);
        let row: usize = reference[split..].parse().unwrap();
        (row - 1, col - 1)
    }

    /// Rebuild the string grid of the only worksheet.
    fn read_back(bytes: &[u8]) -> Vec<Vec<String>> {
        let strings = shared_strings(&zip_part(bytes, "xl/sharedStrings.xml"));
        let sheet = zip_part(bytes, "xl/worksheets/sheet1.xml");

        let mut rows: Vec<Vec<String>> = Vec::new();
        for cell in sheet.split("<c ").skip(1) {
            let Some(v_start) = cell.find("<v>") else {
                continue;
            };
            let reference = cell.split('"').nth(1).unwrap();
            assert!(cell[..cell.find('>').unwrap()].contains("t=\"s\""), "{reference} is not a string");
            let index: usize = cell[v_start + 3..cell.find("</v>").unwrap()].parse().unwrap();

            let (r, c) = cell_position(reference);
            if rows.len() <= r {
                rows.resize(r + 1, Vec::new());
            }
            if rows[r].len() <= c {
                rows[r].resize(c + 1, String::new());
            }
            rows[r][c] = strings[index].clone();
        }
        rows
    }

    #[test]
    fn test_single_sheet_named_report() {
        let bytes = xlsx_bytes(&sample_grid()).unwrap();
        let workbook = zip_part(&bytes, "xl/workbook.xml");

        assert_eq!(workbook.matches("<sheet ").count(), 1);
        assert!(workbook.contains("name=\"Report\""));
    }

    #[test]
    fn test_cells_match_grid() {
        let grid = sample_grid();
        let bytes = xlsx_bytes(&grid).unwrap();
        let mut read = read_back(&bytes);

        // Trailing blank cells may be omitted by the writer.
        for (r, row) in read.iter_mut().enumerate() {
            row.resize(grid.rows[r].len(), String::new());
        }
        assert_eq!(read, grid.rows);
        assert_eq!(read[2], vec!["North", "0", "0", "0", "0", "3", "3", "0", "0", "0", "0", "0", "0", "3"]);
    }

    #[test]
    fn test_write_to_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");

        write_xlsx(&sample_grid(), &path).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(&written[..2], b"PK");
    }
}
