//! Per-report load state with a stale-response guard.
//!
//! Every load is tagged with a [`RequestToken`] taken from a monotonically
//! increasing counter. When the fetch completes, its result is applied only
//! if no newer load was issued in the meantime; otherwise it is dropped:
//!
//! ```text
//! load(state=A)  ── token 1 ──────────────────────▶ done (stale, dropped)
//! load(state=B)     ── token 2 ──────▶ done (applied)
//! ```
//!
//! The report is rebuilt from scratch on every applied result.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::{ApiClient, FetchedReport};
use crate::api::logs::{log_error, log_success, log_warning};
use crate::error::ApiResult;
use crate::models::{RawRecord, ReportFilter, ReportKind, ReportPeriod};
use crate::report::Report;

/// Generation number of one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// What happened to a completed load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Newest result; state and report replaced.
    Applied,
    /// A newer load was issued; result discarded.
    Stale,
    /// Newest load failed; the message is shown to the user.
    Failed(String),
}

#[derive(Debug)]
struct LoaderState {
    filter: ReportFilter,
    records: Vec<RawRecord>,
    known_keys: Vec<String>,
    period: ReportPeriod,
    report: Report,
    status: Option<String>,
    applied: Option<RequestToken>,
}

/// Point-in-time copy of a loader's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderSnapshot {
    pub kind: ReportKind,
    pub filter: ReportFilter,
    pub known_keys: Vec<String>,
    pub period: ReportPeriod,
    pub report: Report,
    pub status: Option<String>,
    pub applied: Option<RequestToken>,
}

/// Holds the current records and report of one report page.
#[derive(Debug)]
pub struct ReportLoader {
    kind: ReportKind,
    generation: AtomicU64,
    state: Mutex<LoaderState>,
}

impl ReportLoader {
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            generation: AtomicU64::new(0),
            state: Mutex::new(LoaderState {
                filter: ReportFilter::all(),
                records: Vec::new(),
                known_keys: Vec::new(),
                period: ReportPeriod::default(),
                report: Report::empty(kind),
                status: None,
                applied: None,
            }),
        }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Start a new load generation.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// True when no load was issued after `token`.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.0
    }

    /// Apply a completed fetch if `token` is still the newest.
    pub async fn apply(&self, token: RequestToken, result: ApiResult<FetchedReport>) -> LoadOutcome {
        let mut state = self.state.lock().await;

        if !self.is_current(token) {
            log_warning(format!(
                "Discarding stale {} response (request {})",
                self.kind,
                token.generation()
            ));
            return LoadOutcome::Stale;
        }

        state.applied = Some(token);
        match result {
            Ok(fetched) => {
                state.report = Report::for_period(
                    self.kind,
                    &fetched.records,
                    &fetched.known_keys,
                    &fetched.period,
                );
                state.filter = fetched.filter;
                state.records = fetched.records;
                state.known_keys = fetched.known_keys;
                state.period = fetched.period;
                state.status = None;
                log_success(format!(
                    "{}: {} rows from {} records",
                    self.kind,
                    state.report.row_count(),
                    state.records.len()
                ));
                LoadOutcome::Applied
            }
            Err(e) => {
                let message = e.to_string();
                state.records.clear();
                state.known_keys.clear();
                state.report = Report::empty(self.kind);
                state.status = Some(message.clone());
                log_error(format!("{}: {}", self.kind, message));
                LoadOutcome::Failed(message)
            }
        }
    }

    /// Fetch `filter` through `client` and apply the result.
    pub async fn load(&self, client: &ApiClient, filter: ReportFilter) -> LoadOutcome {
        let token = self.issue();
        {
            let mut state = self.state.lock().await;
            state.filter = filter.clone();
            state.status = None;
        }

        let result = client.fetch_full(self.kind, &filter).await;
        self.apply(token, result).await
    }

    pub async fn snapshot(&self) -> LoaderSnapshot {
        let state = self.state.lock().await;
        LoaderSnapshot {
            kind: self.kind,
            filter: state.filter.clone(),
            known_keys: state.known_keys.clone(),
            period: state.period.clone(),
            report: state.report.clone(),
            status: state.status.clone(),
            applied: state.applied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::stub;
    use crate::error::ApiError;
    use std::time::Duration;

    fn fetched(state: &str, key: &str, count: u64) -> FetchedReport {
        FetchedReport {
            filter: ReportFilter::for_state(state),
            records: vec![RawRecord::new(key, "Member", "male", count)],
            known_keys: vec![key.to_string()],
            period: ReportPeriod::default(),
        }
    }

    #[tokio::test]
    async fn test_tokens_increase() {
        let loader = ReportLoader::new(ReportKind::MembershipByRegion);
        let first = loader.issue();
        let second = loader.issue();

        assert!(second > first);
        assert!(!loader.is_current(first));
        assert!(loader.is_current(second));
    }

    #[tokio::test]
    async fn test_late_stale_response_is_discarded() {
        let loader = ReportLoader::new(ReportKind::MembershipByRegion);
        let old = loader.issue();
        let new = loader.issue();

        assert_eq!(loader.apply(new, Ok(fetched("Oyo", "Ibadan", 4))).await, LoadOutcome::Applied);
        assert_eq!(loader.apply(old, Ok(fetched("Lagos", "Ikeja", 9))).await, LoadOutcome::Stale);

        let snapshot = loader.snapshot().await;
        assert_eq!(snapshot.filter.state(), Some("Oyo"));
        assert!(snapshot.report.pivot.contains_key("Ibadan"));
        assert!(!snapshot.report.pivot.contains_key("Ikeja"));
        assert_eq!(snapshot.applied, Some(new));
    }

    #[tokio::test]
    async fn test_early_stale_response_is_discarded() {
        let loader = ReportLoader::new(ReportKind::MembershipByRegion);
        let old = loader.issue();
        let _new = loader.issue();

        assert_eq!(loader.apply(old, Ok(fetched("Lagos", "Ikeja", 9))).await, LoadOutcome::Stale);
        assert!(loader.snapshot().await.report.is_empty());
    }

    #[tokio::test]
    async fn test_failure_sets_status_and_clears_report() {
        let loader = ReportLoader::new(ReportKind::MembershipByRegion);
        let first = loader.issue();
        loader.apply(first, Ok(fetched("Oyo", "Ibadan", 4))).await;

        let second = loader.issue();
        let outcome = loader
            .apply(
                second,
                Err(ApiError::Rejected {
                    status: 401,
                    message: "Unauthorized".to_string(),
                }),
            )
            .await;

        assert_eq!(outcome, LoadOutcome::Failed("Unauthorized".to_string()));
        let snapshot = loader.snapshot().await;
        assert_eq!(snapshot.status.as_deref(), Some("Unauthorized"));
        assert!(snapshot.report.is_empty());
    }

    #[tokio::test]
    async fn test_stale_failure_keeps_current_report() {
        let loader = ReportLoader::new(ReportKind::MembershipByRegion);
        let old = loader.issue();
        let new = loader.issue();
        loader.apply(new, Ok(fetched("Oyo", "Ibadan", 4))).await;

        let outcome = loader
            .apply(old, Err(ApiError::InvalidResponse("late".to_string())))
            .await;

        assert_eq!(outcome, LoadOutcome::Stale);
        let snapshot = loader.snapshot().await;
        assert!(snapshot.status.is_none());
        assert!(!snapshot.report.is_empty());
    }

    #[tokio::test]
    async fn test_load_through_client() {
        let (_stub, base) = stub::spawn().await;
        let client = ApiClient::new(&base, Duration::from_secs(5)).unwrap();
        let loader = ReportLoader::new(ReportKind::MembershipByInstitution);

        let outcome = loader.load(&client, ReportFilter::for_state("Lagos")).await;

        assert_eq!(outcome, LoadOutcome::Applied);
        let snapshot = loader.snapshot().await;
        assert_eq!(snapshot.known_keys, vec!["A", "B", "C"]);
        assert_eq!(
            snapshot.report.grid.body()[0],
            vec!["A", "0", "0", "0", "2", "3", "5", "0", "0", "0", "0", "0", "0", "5"]
        );
        assert_eq!(snapshot.report.grid.body()[2][13], "0");
    }
}
