//! Client for the upstream congress REST API.
//!
//! Every endpoint answers with the envelope
//! `{ "ok": bool, "data": T, "error": "..." }`. The client unwraps `data`,
//! turns `ok: false` or a non-2xx status into [`ApiError::Rejected`], and
//! handles the CSRF session:
//!
//! ```text
//! request ──▶ 403 / "Invalid CSRF token" ──▶ reset session
//!                                            GET /csrf (once)
//!                                            retry request (once)
//! ```
//!
//! Cookies are kept for the lifetime of the client so the session the CSRF
//! token belongs to survives between requests.

pub mod loader;

pub use loader::{LoadOutcome, LoaderSnapshot, ReportLoader, RequestToken};

use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::logs::{log_info, log_info_indent, log_warning};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    field_text, records_from_rows, CongressScope, DimensionSource, RawRecord, ReportFilter,
    ReportKind, ReportPeriod,
};

/// Path of the CSRF token endpoint; never retried.
pub const CSRF_PATH: &str = "/csrf";

/// Header carrying the CSRF token.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Error string the upstream uses for a rejected token.
const INVALID_CSRF: &str = "Invalid CSRF token";

/// Message used when a failed response carries no `error`.
pub const REQUEST_FAILED: &str = "Request failed";

/// Endpoint listing every state.
pub const STATES_PATH: &str = "/meta/states";

// =============================================================================
// CSRF Session
// =============================================================================

/// Lifecycle of the CSRF token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CsrfState {
    #[default]
    Uninitialized,
    Fetched(String),
}

/// CSRF token cache owned by one [`ApiClient`].
#[derive(Debug, Default)]
pub struct CsrfSession {
    state: Mutex<CsrfState>,
}

impl CsrfSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self) -> CsrfState {
        self.state.lock().await.clone()
    }

    /// Cached token, if one was fetched.
    pub async fn token(&self) -> Option<String> {
        match &*self.state.lock().await {
            CsrfState::Fetched(token) => Some(token.clone()),
            CsrfState::Uninitialized => None,
        }
    }

    /// Forget the cached token.
    pub async fn reset(&self) {
        *self.state.lock().await = CsrfState::Uninitialized;
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// `data` of a report resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportPayload {
    #[serde(default)]
    pub items: Option<Vec<Value>>,
    #[serde(default)]
    pub meta: Option<ReportPeriod>,
}

impl ReportPayload {
    pub fn items(&self) -> &[Value] {
        self.items.as_deref().unwrap_or(&[])
    }

    pub fn period(&self) -> ReportPeriod {
        self.meta
            .clone()
            .map(|m| ReportPeriod::new(m.start, m.end))
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ItemsPayload {
    #[serde(default)]
    items: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsPayload {
    #[serde(default)]
    item: Option<ReportPeriod>,
}

/// Everything a report page needs from one fetch round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedReport {
    pub filter: ReportFilter,
    pub records: Vec<RawRecord>,
    pub known_keys: Vec<String>,
    pub period: ReportPeriod,
}

// =============================================================================
// Client
// =============================================================================

/// HTTP client for the congress API.
#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    base: String,
    csrf: CsrfSession,
}

impl ApiClient {
    /// Create a client rooted at `base` (for example `http://host/api`).
    pub fn new(base: &str, timeout: Duration) -> ApiResult<Self> {
        let base = base.trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base, e)))?;

        let http = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base,
            csrf: CsrfSession::new(),
        })
    }

    pub fn from_config(config: &Config) -> ApiResult<Self> {
        Self::new(&config.api_base, config.http_timeout)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn csrf(&self) -> &CsrfSession {
        &self.csrf
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Url> {
        let raw = format!("{}{}", self.base, path);
        let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// One round trip; an unparsable body reads as `{}`.
    async fn send_once(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
        token: Option<&str>,
    ) -> ApiResult<(StatusCode, Value)> {
        let url = self.url(path, query)?;
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, url);
        if let Some(token) = token {
            request = request.header(CSRF_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let json = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::Object(Default::default()));

        Ok((status, json))
    }

    /// Return the cached CSRF token, fetching it from `/csrf` when absent.
    ///
    /// `Ok(None)` means the endpoint answered without a token.
    pub async fn ensure_csrf(&self) -> ApiResult<Option<String>> {
        let mut state = self.csrf.state.lock().await;
        if let CsrfState::Fetched(token) = &*state {
            return Ok(Some(token.clone()));
        }

        let (_, json) = self.send_once(Method::GET, CSRF_PATH, &[], None, None).await?;
        let token = json
            .get("data")
            .and_then(|data| data.get("token"))
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        if let Some(token) = &token {
            *state = CsrfState::Fetched(token.clone());
        }
        Ok(token)
    }

    /// Send a request and unwrap the `data` of the envelope.
    ///
    /// A CSRF rejection on any path but `/csrf` refreshes the token and
    /// retries exactly once, provided a fresh token was obtained.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> ApiResult<T> {
        let token = self.csrf.token().await;
        let (mut status, mut json) = self
            .send_once(method.clone(), path, query, body, token.as_deref())
            .await?;

        if path != CSRF_PATH && needs_csrf_refresh(status, &json) {
            debug!("CSRF rejected on {}, refreshing token", path);
            self.csrf.reset().await;
            if let Some(token) = self.ensure_csrf().await? {
                (status, json) = self.send_once(method, path, query, body, Some(&token)).await?;
            }
        }

        unwrap_envelope(status, json)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<T> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> ApiResult<T> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    // =========================================================================
    // Report endpoints
    // =========================================================================

    /// Fetch the raw rows of `kind`, filtered by state when one is set.
    pub async fn fetch_report(&self, kind: ReportKind, filter: &ReportFilter) -> ApiResult<ReportPayload> {
        let layout = kind.layout();
        let query: Vec<(&str, &str)> = filter.state().map(|s| ("state", s)).into_iter().collect();
        let payload: Option<ReportPayload> = self.get(layout.resource, &query).await?;
        Ok(payload.unwrap_or_default())
    }

    /// Names returned by a `{ items: [...] }` endpoint.
    async fn fetch_names(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Vec<String>> {
        let payload: Option<ItemsPayload> = self.get(path, query).await?;
        Ok(payload
            .and_then(|p| p.items)
            .unwrap_or_default()
            .iter()
            .filter_map(|item| field_text(Some(item)))
            .collect())
    }

    /// Known grouping keys for `kind` under `filter`.
    ///
    /// State-scoped lists are only fetched with a state selected; without
    /// one the list is empty and rows come from the records alone.
    pub async fn fetch_dimension(&self, kind: ReportKind, filter: &ReportFilter) -> ApiResult<Vec<String>> {
        match (kind.layout().dimension, filter.state()) {
            (DimensionSource::StateMeta(_), None) => Ok(Vec::new()),
            (DimensionSource::StateMeta(path), Some(state)) => {
                self.fetch_names(path, &[("state", state)]).await
            }
            (DimensionSource::States, Some(state)) => Ok(vec![state.to_string()]),
            (DimensionSource::States, None) => self.fetch_names(STATES_PATH, &[]).await,
        }
    }

    /// Congress dates from the settings endpoint of `scope`.
    pub async fn fetch_period(&self, scope: CongressScope) -> ApiResult<ReportPeriod> {
        let payload: Option<SettingsPayload> = self.get(scope.settings_path(), &[]).await?;
        Ok(payload
            .and_then(|p| p.item)
            .map(|p| ReportPeriod::new(p.start, p.end))
            .unwrap_or_default())
    }

    /// Fetch rows, dimension list and period for one report.
    ///
    /// Only the row fetch can fail the round. A failed dimension fetch
    /// yields an empty list and a failed settings fetch an unset period.
    pub async fn fetch_full(&self, kind: ReportKind, filter: &ReportFilter) -> ApiResult<FetchedReport> {
        let layout = kind.layout();
        let (payload, dimension) = tokio::join!(
            self.fetch_report(kind, filter),
            self.fetch_dimension(kind, filter)
        );
        let payload = payload?;

        let known_keys = dimension.unwrap_or_else(|e| {
            log_warning(format!("Could not load {} list: {}", layout.row_label, e));
            Vec::new()
        });

        let mut period = payload.period();
        if period.start.is_none() || period.end.is_none() {
            match self.fetch_period(layout.scope).await {
                Ok(settings) => period = period.or(settings),
                Err(e) => log_warning(format!("Could not load congress dates: {}", e)),
            }
        }

        let records = records_from_rows(payload.items(), &layout);
        log_info(format!(
            "Fetched {} rows for {} ({} known {})",
            records.len(),
            kind,
            known_keys.len(),
            layout.row_label.to_lowercase()
        ));
        if !period.is_unset() {
            log_info_indent(
                format!("Congress dates: {} to {}", period.start_label(), period.end_label()),
                1,
            );
        }

        Ok(FetchedReport {
            filter: filter.clone(),
            records,
            known_keys,
            period,
        })
    }
}

fn needs_csrf_refresh(status: StatusCode, json: &Value) -> bool {
    status == StatusCode::FORBIDDEN
        || json.get("error").and_then(Value::as_str) == Some(INVALID_CSRF)
}

fn unwrap_envelope<T: DeserializeOwned>(status: StatusCode, json: Value) -> ApiResult<T> {
    let rejected = json.get("ok") == Some(&Value::Bool(false));
    if !status.is_success() || rejected {
        let message = json
            .get("error")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(REQUEST_FAILED)
            .to_string();
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    let data = match json {
        Value::Object(mut obj) => obj.remove("data").unwrap_or(Value::Null),
        _ => Value::Null,
    };
    serde_json::from_value(data).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}
