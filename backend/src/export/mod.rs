//! Report export.
//!
//! Writes the report grid to disk or to memory:
//! - [`xlsx`] - single-sheet spreadsheet named `Report`
//! - [`csv`] - comma-separated grid
//!
//! File names follow `<file-stem>-<start>-to-<end>.<ext>`, with `start` and
//! `end` standing in for an unset period bound. Exporting a report with no
//! grouping rows does nothing.

pub mod csv;
pub mod xlsx;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::logs::{log_info, log_success};
use crate::error::ExportResult;
use crate::models::ReportPeriod;
use crate::report::{Report, ReportGrid};

pub use self::csv::{csv_bytes, write_csv};
pub use self::xlsx::{write_xlsx, xlsx_bytes, SHEET_NAME};

/// File format of an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    /// Serialize a grid in this format.
    pub fn to_bytes(&self, grid: &ReportGrid) -> ExportResult<Vec<u8>> {
        match self {
            ExportFormat::Xlsx => xlsx_bytes(grid),
            ExportFormat::Csv => csv_bytes(grid),
        }
    }
}

/// `<file_stem>-<start>-to-<end>.<extension>`.
pub fn export_file_name(file_stem: &str, period: &ReportPeriod, extension: &str) -> String {
    format!(
        "{}-{}-to-{}.{}",
        file_stem,
        period.start_label(),
        period.end_label(),
        extension
    )
}

/// `path` itself, or the dated export name inside it when `path` is an
/// existing directory.
pub fn output_path(path: &Path, file_stem: &str, period: &ReportPeriod, extension: &str) -> PathBuf {
    if path.is_dir() {
        path.join(export_file_name(file_stem, period, extension))
    } else {
        path.to_path_buf()
    }
}

/// Write `report` into `dir` under its period-derived file name.
///
/// Returns `Ok(None)` without touching the disk when the report is empty.
pub fn export_report(
    report: &Report,
    dir: &Path,
    file_stem: &str,
    period: &ReportPeriod,
    format: ExportFormat,
) -> ExportResult<Option<PathBuf>> {
    if report.is_empty() {
        log_info("Nothing to export: report has no rows");
        return Ok(None);
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(file_stem, period, format.extension()));

    match format {
        ExportFormat::Xlsx => write_xlsx(&report.grid, &path)?,
        ExportFormat::Csv => write_csv(&report.grid, &path)?,
    }

    log_success(format!("Exported {} rows to {}", report.row_count(), path.display()));
    Ok(Some(path))
}
