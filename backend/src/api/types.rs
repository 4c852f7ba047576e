//! REST API types for report consumers.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::export::{export_file_name, ExportFormat};
use crate::models::{ReportFilter, ReportKind, ReportLayout, ReportPeriod};
use crate::report::{Report, ReportGrid};

/// Report grid plus enough context to label and export it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    /// "ready" when there are rows to export, "empty" otherwise
    pub status: String,

    pub kind: ReportKind,
    pub title: String,
    pub state: Option<String>,

    /// Spreadsheet name the export endpoint will use
    pub file_name: String,

    pub period: ReportPeriod,
    pub grid: ReportGrid,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub row_count: usize,
    pub categories: Vec<String>,
    pub grand_total: u64,
    /// User-visible message from the last failed load
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReportResponse {
    pub fn new(kind: ReportKind, filter: &ReportFilter, period: ReportPeriod, report: &Report) -> Self {
        let layout = kind.layout();
        ReportResponse {
            status: if report.is_empty() { "empty" } else { "ready" }.to_string(),
            kind,
            title: layout.title.to_string(),
            state: filter.state().map(str::to_string),
            file_name: export_file_name(layout.file_stem, &period, ExportFormat::Xlsx.extension()),
            period,
            grid: report.grid.clone(),
            metadata: ReportMetadata {
                row_count: report.row_count(),
                categories: report.grid.categories.clone(),
                grand_total: report.totals.grand_total(),
                message: None,
            },
        }
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.metadata.message = message;
        self
    }
}

/// Entry of `GET /api/reports`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportKindInfo {
    pub kind: ReportKind,
    #[serde(flatten)]
    pub layout: ReportLayout,
    pub categories: Vec<String>,
}

impl From<ReportKind> for ReportKindInfo {
    fn from(kind: ReportKind) -> Self {
        ReportKindInfo {
            kind,
            layout: kind.layout(),
            categories: kind.categories().labels().to_vec(),
        }
    }
}

/// Query string of the report endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub format: Option<ExportFormat>,
}

impl ReportQuery {
    pub fn filter(&self) -> ReportFilter {
        self.state
            .as_deref()
            .map(ReportFilter::for_state)
            .unwrap_or_default()
    }

    /// Dates given on the query string; they win over fetched ones.
    pub fn period_override(&self) -> ReportPeriod {
        ReportPeriod::new(self.start.clone(), self.end.clone())
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRecord;

    #[test]
    fn test_response_shape() {
        let report = Report::for_kind(
            ReportKind::MembershipByInstitution,
            &[RawRecord::new("A", "Member", "male", 3)],
            &["B".to_string()],
        );
        let period = ReportPeriod::new(Some("2025-04-01".into()), None);
        let response = ReportResponse::new(
            ReportKind::MembershipByInstitution,
            &ReportFilter::for_state("Lagos"),
            period,
            &report,
        );
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "ready");
        assert_eq!(json["kind"], "membership-by-institution");
        assert_eq!(json["state"], "Lagos");
        assert_eq!(
            json["fileName"],
            "state-congress-membership-institution-2025-04-01-to-end.xlsx"
        );
        assert_eq!(json["metadata"]["rowCount"], 2);
        assert_eq!(json["metadata"]["grandTotal"], 3);
        assert_eq!(json["grid"]["rowLabel"], "Institution");
        assert!(json["metadata"].get("message").is_none());
    }

    #[test]
    fn test_empty_status() {
        let report = Report::empty(ReportKind::MembershipByState);
        let response = ReportResponse::new(
            ReportKind::MembershipByState,
            &ReportFilter::all(),
            ReportPeriod::default(),
            &report,
        )
        .with_message(Some("Request failed".into()));

        assert_eq!(response.status, "empty");
        assert_eq!(response.metadata.message.as_deref(), Some("Request failed"));
    }

    #[test]
    fn test_query_helpers() {
        let query = ReportQuery {
            state: Some("  ".into()),
            start: Some("2025-01-01".into()),
            end: Some(String::new()),
            format: None,
        };

        assert_eq!(query.filter(), ReportFilter::all());
        assert_eq!(query.period_override().start.as_deref(), Some("2025-01-01"));
        assert!(query.period_override().end.is_none());
    }

    #[test]
    fn test_kind_info_flattens_layout() {
        let json = serde_json::to_value(ReportKindInfo::from(ReportKind::CategoriesByRegion)).unwrap();

        assert_eq!(json["slug"], "categories-by-region");
        assert_eq!(json["rowLabel"], "Region");
        assert_eq!(json["categories"][5], "Youth");
    }

    #[test]
    fn test_error_response() {
        let json = error_response("Unknown report kind: nope");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "Unknown report kind: nope");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
