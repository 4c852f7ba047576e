//! HTTP server for congress reports.
//!
//! Fetches rows from the upstream congress API, pivots them and serves the
//! result as JSON, an HTML table or a spreadsheet download.
//!
//! # API Endpoints
//!
//! | Method | Path                              | Description                     |
//! |--------|-----------------------------------|---------------------------------|
//! | GET    | `/health`                         | Health check                    |
//! | GET    | `/api/reports`                    | List report kinds               |
//! | GET    | `/api/reports/{kind}`             | Report grid as JSON             |
//! | GET    | `/api/reports/{kind}/table`       | Report as an HTML page          |
//! | GET    | `/api/reports/{kind}/export`      | `.xlsx` / `.csv` download       |
//! | POST   | `/api/reports/{kind}/load`        | Reload the shared report state  |
//! | GET    | `/api/reports/{kind}/current`     | Last applied shared report      |
//! | GET    | `/api/logs`                       | SSE stream for real-time logs   |
//!
//! Report endpoints take `?state=`, `?start=` and `?end=`; `export` also
//! takes `?format=xlsx|csv`.

use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Html, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Serialize;
use serde_json::{json, Value};
use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{ReportKindInfo, ReportQuery, ReportResponse};
use crate::client::{ApiClient, LoadOutcome, ReportLoader};
use crate::config::Config;
use crate::error::{ApiResult, ServerResult};
use crate::export::export_file_name;
use crate::models::{ReportFilter, ReportKind, ReportPeriod};
use crate::render::render_page;
use crate::report::Report;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    client: Arc<ApiClient>,
    loaders: Arc<HashMap<ReportKind, Arc<ReportLoader>>>,
}

impl AppState {
    pub fn new(client: ApiClient) -> Self {
        let loaders = ReportKind::ALL
            .into_iter()
            .map(|kind| (kind, Arc::new(ReportLoader::new(kind))))
            .collect();
        Self {
            client: Arc::new(client),
            loaders: Arc::new(loaders),
        }
    }

    fn loader(&self, kind: ReportKind) -> Arc<ReportLoader> {
        self.loaders
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(ReportLoader::new(kind)))
    }
}

/// Build the router; split out so tests can serve it on an ephemeral port.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/reports", get(list_kinds))
        .route("/api/reports/{kind}", get(report_json))
        .route("/api/reports/{kind}/table", get(report_table))
        .route("/api/reports/{kind}/export", get(report_export))
        .route("/api/reports/{kind}/load", post(report_load))
        .route("/api/reports/{kind}/current", get(report_current))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::from_config(&config)?;
    let app = router(AppState::new(client));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Report server running on http://localhost:{}", config.port);
    info!("Upstream API: {}", config.api_base);
    info!("GET  /api/reports/{{kind}}[/table|/export]  POST /api/reports/{{kind}}/load");
    info!("GET  /api/logs - SSE log stream");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "congress-reports",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "reports": "GET /api/reports",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn list_kinds() -> Json<Vec<ReportKindInfo>> {
    Json(ReportKind::ALL.into_iter().map(ReportKindInfo::from).collect())
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// A report built for one request.
struct Built {
    kind: ReportKind,
    filter: ReportFilter,
    period: ReportPeriod,
    report: Report,
}

/// Fetch and pivot `kind` for a single request, outside the shared loaders.
async fn build(state: &AppState, kind: ReportKind, query: &ReportQuery) -> ApiResult<Built> {
    let fetched = state.client.fetch_full(kind, &query.filter()).await?;
    let period = query.period_override().or(fetched.period);
    let report = Report::for_period(kind, &fetched.records, &fetched.known_keys, &period);

    Ok(Built {
        kind,
        filter: fetched.filter,
        period,
        report,
    })
}

async fn report_json(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ServerResult<Json<ReportResponse>> {
    let built = build(&state, kind.parse()?, &query).await?;
    Ok(Json(ReportResponse::new(
        built.kind,
        &built.filter,
        built.period,
        &built.report,
    )))
}

/// HTML page; an upstream failure renders the empty table with its message.
async fn report_table(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ServerResult<Html<String>> {
    let kind: ReportKind = kind.parse()?;
    let layout = kind.layout();
    let title = match query.filter().state() {
        Some(s) => format!("{} ({})", layout.title, s),
        None => layout.title.to_string(),
    };

    let page = match build(&state, kind, &query).await {
        Ok(built) => render_page(&title, &built.report.grid, None),
        Err(e) => {
            log_error(format!("{}: {}", kind, e));
            render_page(&title, &Report::empty(kind).grid, Some(&e.to_string()))
        }
    };
    Ok(Html(page))
}

async fn report_export(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ServerResult<Response> {
    let built = build(&state, kind.parse()?, &query).await?;
    if built.report.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let format = query.format.unwrap_or_default();
    let bytes = format.to_bytes(&built.report.grid)?;
    let file_name = export_file_name(built.kind.layout().file_stem, &built.period, format.extension());
    info!("Serving export {} ({} bytes)", file_name, bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Result of `POST /api/reports/{kind}/load`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadResponse {
    /// "applied", "stale" or "failed"
    outcome: &'static str,
    report: ReportResponse,
}

async fn snapshot_response(loader: &ReportLoader, query: &ReportQuery) -> ReportResponse {
    let snapshot = loader.snapshot().await;
    ReportResponse::new(
        snapshot.kind,
        &snapshot.filter,
        query.period_override().or(snapshot.period),
        &snapshot.report,
    )
    .with_message(snapshot.status)
}

async fn report_load(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ServerResult<Json<LoadResponse>> {
    let kind: ReportKind = kind.parse()?;
    let loader = state.loader(kind);

    let outcome = match loader.load(&state.client, query.filter()).await {
        LoadOutcome::Applied => "applied",
        LoadOutcome::Stale => "stale",
        LoadOutcome::Failed(_) => "failed",
    };

    Ok(Json(LoadResponse {
        outcome,
        report: snapshot_response(&loader, &query).await,
    }))
}

async fn report_current(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ServerResult<Json<ReportResponse>> {
    let kind: ReportKind = kind.parse()?;
    Ok(Json(snapshot_response(&state.loader(kind), &query).await))
}
