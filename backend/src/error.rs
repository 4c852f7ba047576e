//! Error types for the congress report pipeline.
//!
//! This module defines the error hierarchy used across the crate:
//!
//! - [`InputError`] - loading raw rows from local files
//! - [`ApiError`] - talking to the upstream REST API
//! - [`ExportError`] - writing spreadsheets and CSV files
//! - [`ReportError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP service errors
//!
//! The aggregation itself (normalize, pivot, totals, grid) never fails:
//! malformed input degrades to defaults instead of surfacing here.
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::api::types::error_response;

// =============================================================================
// Input Errors
// =============================================================================

/// Errors while reading raw report rows from disk.
#[derive(Debug, Error)]
pub enum InputError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Input decoded but is not valid CSV.
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Input is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parsed but has no recognizable list of rows.
    #[error("Unrecognized JSON layout: {0}")]
    Layout(String),

    /// Empty file.
    #[error("Input file is empty")]
    EmptyFile,
}

// =============================================================================
// API Client Errors
// =============================================================================

/// Errors from the upstream REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Base URL or path could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The API answered with a non-2xx status or `ok: false`.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The `data` payload did not match the expected shape.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// HTTP status the upstream answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing report files.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Spreadsheet writer failed.
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// CSV writer failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Report Errors (top-level)
// =============================================================================

/// Top-level errors for building and exporting a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Local input error.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Upstream API error.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Unknown report kind slug.
    #[error("Unknown report kind: {0}")]
    UnknownKind(String),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Report error.
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl From<ApiError> for ServerError {
    fn from(e: ApiError) -> Self {
        ServerError::Report(ReportError::Api(e))
    }
}

impl From<ExportError> for ServerError {
    fn from(e: ExportError) -> Self {
        ServerError::Report(ReportError::Export(e))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Report(ReportError::UnknownKind(_)) => StatusCode::BAD_REQUEST,
            ServerError::Report(ReportError::Api(_)) => StatusCode::BAD_GATEWAY,
            ServerError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for input operations.
pub type InputResult<T> = Result<T, InputError>;

/// Result type for API client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // InputError -> ReportError
        let input_err = InputError::EmptyFile;
        let report_err: ReportError = input_err.into();
        assert!(report_err.to_string().contains("empty"));

        // ApiError -> ServerError
        let api_err = ApiError::Rejected {
            status: 422,
            message: "State congress dates are not set".into(),
        };
        let server_err: ServerError = api_err.into();
        assert!(server_err.to_string().contains("dates are not set"));
    }

    #[test]
    fn test_rejected_keeps_upstream_message() {
        let err = ApiError::Rejected {
            status: 403,
            message: "Invalid CSRF token".into(),
        };
        assert_eq!(err.to_string(), "Invalid CSRF token");
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_server_error_status_codes() {
        let unknown = ServerError::from(ReportError::UnknownKind("nope".into())).into_response();
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

        let upstream = ServerError::from(ApiError::Rejected {
            status: 500,
            message: "Request failed".into(),
        })
        .into_response();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let export = ServerError::from(ExportError::Io(io)).into_response();
        assert_eq!(export.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
