//! Sentinel Gatekeeper: HTTP front door for the decision pipeline
//!
//! Endpoints:
//! - `POST /analyze` - multipart form (`file` CSV upload, `mission` field),
//!   raw CSV body (`?mission=`), or JSON `{rows, mission}` body
//! - `GET  /health`  - liveness
//! - `GET  /stats`   - version and active scoring configuration
//! - `GET  /metrics` - Prometheus metrics
//!
//! Every request runs on its own blocking worker under a deadline. A worker
//! that times out or panics is answered with the safe fallback decision.

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, FromRequest, Multipart, Query, Request, State,
        multipart::MultipartError,
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use sentinel_core::{
    Decision, DecisionOrchestrator, PipelineConfig, ScoringConfig, Table, TableError,
};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Largest request body read from a client
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Parser)]
#[command(name = "sentinel-gate", version, about = "SentinelAI decision gatekeeper")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "SENTINEL_ADDR", default_value = "0.0.0.0:8000")]
    addr: SocketAddr,

    /// Per-request deadline in milliseconds
    #[arg(
        long,
        env = "SENTINEL_DEADLINE_MS",
        default_value_t = 10_000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    deadline_ms: u64,

    /// Pipeline config JSON
    #[arg(long, env = "SENTINEL_CONFIG")]
    config: Option<PathBuf>,
}

// ============================================================================
// METRICS
// ============================================================================

struct Metrics {
    registry: Registry,
    decisions: IntCounter,
    fallbacks: IntCounter,
    rejected: IntCounter,
    duration: Histogram,
}

impl Metrics {
    fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let decisions = IntCounter::new("sentinel_decisions_total", "Total decisions returned")?;
        let fallbacks = IntCounter::new(
            "sentinel_fallback_total",
            "Decisions that fell back to manual review",
        )?;
        let rejected = IntCounter::new(
            "sentinel_rejected_total",
            "Requests rejected because the table could not be read",
        )?;
        let duration = Histogram::with_opts(HistogramOpts::new(
            "sentinel_decision_duration_seconds",
            "Histogram of end-to-end decision latency",
        ))?;

        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(fallbacks.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            decisions,
            fallbacks,
            rejected,
            duration,
        })
    }
}

// ============================================================================
// DATA TYPES
// ============================================================================

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<DecisionOrchestrator>,
    deadline: Duration,
    metrics: Arc<Metrics>,
    scoring: ScoringConfig,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeParams {
    mission: Option<String>,
}

/// JSON form of an analyze request
#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    rows: Value,
    #[serde(default)]
    mission: Option<String>,
}

#[derive(Debug, Error)]
enum RequestError {
    #[error("body is not valid UTF-8")]
    Utf8,
    #[error("failed to read body: {0}")]
    Body(#[from] axum::Error),
    #[error("invalid multipart form: {0}")]
    Multipart(String),
    #[error("multipart form has no `file` part")]
    MissingFile,
    #[error("invalid request JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Table(#[from] TableError),
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": format!("Failed to read table: {}", self) })),
        )
            .into_response()
    }
}

/// Decode the body by content type. CSV takes the mission from the query
/// string; JSON may carry its own, which wins.
fn decode_request(
    headers: &HeaderMap,
    params: AnalyzeParams,
    body: &[u8],
) -> Result<(Table, Option<String>), RequestError> {
    let is_csv = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/csv") || ct.starts_with("text/plain"));

    if is_csv {
        let text = std::str::from_utf8(body).map_err(|_| RequestError::Utf8)?;
        return Ok((Table::from_csv(text)?, params.mission));
    }

    let request: AnalyzeRequest = serde_json::from_slice(body)?;
    let table = Table::from_json_value(&request.rows)?;
    Ok((table, request.mission.or(params.mission)))
}

impl From<MultipartError> for RequestError {
    fn from(e: MultipartError) -> Self {
        Self::Multipart(e.body_text())
    }
}

/// Read the `file` part as CSV. A `mission` part overrides the query string.
async fn decode_multipart(
    mut form: Multipart,
    params: AnalyzeParams,
) -> Result<(Table, Option<String>), RequestError> {
    let mut table = None;
    let mut mission = params.mission;

    while let Some(field) = form.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => table = Some(Table::from_csv(&field.text().await?)?),
            Some("mission") => mission = Some(field.text().await?),
            _ => {}
        }
    }

    let table = table.ok_or(RequestError::MissingFile)?;
    Ok((table, mission))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

async fn read_request(
    params: AnalyzeParams,
    request: Request,
) -> Result<(Table, Option<String>), RequestError> {
    if is_multipart(request.headers()) {
        let form = Multipart::from_request(request, &())
            .await
            .map_err(|e| RequestError::Multipart(e.body_text()))?;
        return decode_multipart(form, params).await;
    }

    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES).await?;
    decode_request(&parts.headers, params, &body)
}

// ============================================================================
// DECISION WORKER
// ============================================================================

/// Run the pipeline on a blocking worker. Returns the decision and whether
/// it is a fallback.
async fn decide_with_deadline(
    orchestrator: Arc<DecisionOrchestrator>,
    table: Table,
    mission: Option<String>,
    deadline: Duration,
    request_id: Uuid,
) -> (Decision, bool) {
    let span = info_span!("decision", %request_id);
    let task = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        orchestrator.run(&table, mission.as_deref())
    });

    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(outcome)) => {
            let fallback = outcome.is_fallback();
            (outcome.decision, fallback)
        }
        Ok(Err(e)) => {
            warn!(%request_id, error = %e, "Decision worker failed.");
            (Decision::safe_fallback(None), true)
        }
        Err(_) => {
            warn!(
                %request_id,
                deadline_ms = deadline.as_millis() as u64,
                "Decision deadline expired."
            );
            (Decision::safe_fallback(None), true)
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

async fn analyze(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
    request: Request,
) -> Response {
    let request_id = Uuid::new_v4();

    let (table, mission) = match read_request(params, request).await {
        Ok(decoded) => decoded,
        Err(e) => {
            state.metrics.rejected.inc();
            warn!(%request_id, error = %e, "Rejected analyze request.");
            return e.into_response();
        }
    };
    info!(
        %request_id,
        rows = table.row_count(),
        columns = table.column_count(),
        "Analyze request accepted."
    );

    let timer = state.metrics.duration.start_timer();
    let (decision, fallback) = decide_with_deadline(
        Arc::clone(&state.orchestrator),
        table,
        mission,
        state.deadline,
        request_id,
    )
    .await;
    timer.observe_duration();

    state.metrics.decisions.inc();
    if fallback {
        state.metrics.fallbacks.inc();
    }

    Json(decision).into_response()
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    match encoder.encode(&state.metrics.registry.gather(), &mut buffer) {
        Ok(()) => (
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn health_handler() -> &'static str {
    "OK"
}

#[derive(Serialize)]
struct StatsResponse {
    service: &'static str,
    version: &'static str,
    status: &'static str,
    deadline_ms: u64,
    scoring: ScoringConfig,
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        service: "sentinel-gate",
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        deadline_ms: state.deadline.as_millis() as u64,
        scoring: state.scoring.clone(),
    })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install CTRL+C handler.");
        std::future::pending::<()>().await;
    }
    info!("Shutting down.");
}

// ============================================================================
// MAIN
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading pipeline config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    info!(
        seed = config.scoring.seed,
        n_estimators = config.scoring.n_estimators,
        deadline_ms = args.deadline_ms,
        "Initializing SentinelAI gatekeeper."
    );

    let state = AppState {
        scoring: config.scoring.clone(),
        orchestrator: Arc::new(DecisionOrchestrator::new(config)),
        deadline: Duration::from_millis(args.deadline_ms),
        metrics: Arc::new(Metrics::new().context("registering metrics")?),
    };

    let listener = TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("binding {}", args.addr))?;

    info!(addr = %args.addr, "Gatekeeper listening.");
    info!("  POST /analyze - Run the decision pipeline on a table");
    info!("  GET  /metrics - Prometheus metrics");
    info!("  GET  /health  - Health check");
    info!("  GET  /stats   - Service stats");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Goodbye.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;
    use sentinel_core::{AnomalyScorer, AnomalySummary, MissionStatus, ScoreError};

    struct SlowScorer;

    impl AnomalyScorer for SlowScorer {
        fn score(&self, _table: &Table) -> Result<AnomalySummary, ScoreError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(AnomalySummary::no_numeric_fields())
        }
    }

    struct PanickingScorer;

    impl AnomalyScorer for PanickingScorer {
        fn score(&self, _table: &Table) -> Result<AnomalySummary, ScoreError> {
            panic!("scorer blew up")
        }
    }

    fn csv_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
        headers
    }

    fn spike() -> Table {
        Table::from_csv("latency_ms\n100\n100\n100\n100\n500\n").unwrap()
    }

    #[test]
    fn test_decode_csv_uses_query_mission() {
        let params = AnalyzeParams {
            mission: Some("Guard checkout".into()),
        };
        let (table, mission) =
            decode_request(&csv_headers(), params, b"latency_ms\n100\n500\n").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(mission.as_deref(), Some("Guard checkout"));
    }

    #[test]
    fn test_decode_json_body() {
        let body = br#"{"rows": [{"v": 1.0}, {"v": 2.5}], "mission": "Hold the line"}"#;
        let (table, mission) =
            decode_request(&HeaderMap::new(), AnalyzeParams::default(), body).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(mission.as_deref(), Some("Hold the line"));
    }

    #[test]
    fn test_decode_errors_are_bad_requests() {
        let err =
            decode_request(&csv_headers(), AnalyzeParams::default(), b"a,b\n1\n").unwrap_err();
        assert!(matches!(err, RequestError::Table(TableError::FieldCount { .. })));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err =
            decode_request(&HeaderMap::new(), AnalyzeParams::default(), b"not json").unwrap_err();
        assert!(matches!(err, RequestError::Json(_)));

        let err = decode_request(&HeaderMap::new(), AnalyzeParams::default(), br#"{"rows": 3}"#)
            .unwrap_err();
        assert!(matches!(err, RequestError::Table(TableError::NotAnArray)));
    }

    fn form_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XyZ")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_multipart_upload() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"ops.csv\"\r\n\
            Content-Type: text/csv\r\n\r\n\
            latency_ms\n100\n500\n\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"mission\"\r\n\r\n\
            Guard checkout\r\n\
            --XyZ--\r\n";
        let params = AnalyzeParams {
            mission: Some("from query".into()),
        };
        let (table, mission) = read_request(params, form_request(body)).await.unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column("latency_ms").unwrap().numeric_values().unwrap(),
            vec![Some(100.0), Some(500.0)]
        );
        assert_eq!(mission.as_deref(), Some("Guard checkout"));
    }

    #[tokio::test]
    async fn test_multipart_without_file_is_rejected() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"mission\"\r\n\r\n\
            Guard checkout\r\n\
            --XyZ--\r\n";
        let err = read_request(AnalyzeParams::default(), form_request(body))
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::MissingFile));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_raw_csv_request_still_accepted() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/analyze?mission=Guard%20checkout")
            .header(header::CONTENT_TYPE, "text/csv")
            .body(Body::from("latency_ms\n100\n500\n"))
            .unwrap();
        let params = AnalyzeParams {
            mission: Some("Guard checkout".into()),
        };
        let (table, mission) = read_request(params, request).await.unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(mission.as_deref(), Some("Guard checkout"));
    }

    #[tokio::test]
    async fn test_decision_within_deadline() {
        let (decision, fallback) = decide_with_deadline(
            Arc::new(DecisionOrchestrator::default()),
            spike(),
            None,
            Duration::from_secs(30),
            Uuid::new_v4(),
        )
        .await;
        assert!(!fallback);
        assert_eq!(decision.status, MissionStatus::Completed);
    }

    #[tokio::test]
    async fn test_deadline_expiry_falls_back() {
        let orchestrator = DecisionOrchestrator::default().with_scorer(SlowScorer);
        let (decision, fallback) = decide_with_deadline(
            Arc::new(orchestrator),
            spike(),
            None,
            Duration::from_millis(10),
            Uuid::new_v4(),
        )
        .await;
        assert!(fallback);
        assert_eq!(decision, Decision::safe_fallback(None));
    }

    #[tokio::test]
    async fn test_worker_panic_falls_back() {
        let orchestrator = DecisionOrchestrator::default().with_scorer(PanickingScorer);
        let (decision, fallback) = decide_with_deadline(
            Arc::new(orchestrator),
            spike(),
            None,
            Duration::from_secs(5),
            Uuid::new_v4(),
        )
        .await;
        assert!(fallback);
        assert!(decision.is_deferred());
        assert_eq!(decision.signals, vec!["Automated safeguard engaged"]);
    }

    #[test]
    fn test_metrics_register() {
        let metrics = Metrics::new().unwrap();
        metrics.decisions.inc();
        metrics.rejected.inc();

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metrics.registry.gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("sentinel_decisions_total 1"));
        assert!(text.contains("sentinel_rejected_total 1"));
        assert!(text.contains("sentinel_fallback_total 0"));
    }
}
