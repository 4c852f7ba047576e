//! # Reports - congress attendance pivots
//!
//! Turns flat registration counts from the congress API into the gender
//! by category pivot tables shown on the report pages, and exports them as
//! spreadsheets.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  API / CSV  │────▶│ RawRecords  │────▶│ Pivot/Totals│────▶│ Grid → HTML │
//! │   (JSON)    │     │ (per kind)  │     │ (normalize) │     │  XLSX / CSV │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reports::{RawRecord, Report, ReportKind};
//!
//! let records = vec![RawRecord::new("A", "Member", "male", 3)];
//! let report = Report::for_kind(ReportKind::MembershipByInstitution, &records, &[]);
//! println!("{:?}", report.grid.body());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Environment configuration
//! - [`models`] - Records, categories, report kinds
//! - [`parser`] - Local JSON/CSV input with auto-detection
//! - [`report`] - Normalization, pivot, totals, grid
//! - [`export`] - Spreadsheet and CSV export
//! - [`render`] - HTML table
//! - [`client`] - Upstream API client and report loader
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Input
pub mod parser;

// Aggregation
pub mod report;

// Output
pub mod export;
pub mod render;

// Upstream API
pub mod client;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ApiError, ApiResult, ExportError, ExportResult, InputError, InputResult, ReportError,
    ReportResult, ServerError, ServerResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    coerce_count, records_from_rows, CategorySet, ColumnAxis, CongressScope, DimensionSource,
    Gender, PivotCell, RawRecord, ReportFilter, ReportKind, ReportLayout, ReportPeriod,
    TotalsLayout, UNKNOWN_GROUP,
};

// =============================================================================
// Re-exports - Aggregation
// =============================================================================

pub use report::{
    build_grid, build_pivot, build_totals, normalize_category, to_rows, CategoryTotal,
    PivotMatrix, PivotRow, Report, ReportGrid, Totals,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, load_rows, parse_bytes_auto,
    parse_csv_rows, parse_json_rows, ParseResult,
};

// =============================================================================
// Re-exports - Export & Render
// =============================================================================

pub use export::{export_file_name, export_report, output_path, ExportFormat};
pub use render::{render_page, render_table};

// =============================================================================
// Re-exports - Client
// =============================================================================

pub use client::{
    ApiClient, CsrfSession, CsrfState, FetchedReport, LoadOutcome, LoaderSnapshot, ReportLoader,
    ReportPayload, RequestToken,
};

pub use config::Config;

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
