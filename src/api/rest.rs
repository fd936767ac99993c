// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`:
//
//   GET  /health            liveness, uptime and cache size
//   GET  /time-frames       label -> (period, interval) table
//   GET  /panel             columnar indicator panel
//   GET  /fear-greed        latest composite score and its gauge band
//   POST /cache/invalidate  drop one cached series, or all of them
//
// CORS is configured permissively; the panel is read-only market data.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, Query, State,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::error::ApiError;
use crate::app_state::AppState;
use crate::panel::{FearGreedLevel, IndicatorColumn};
use crate::types::{Interval, Period, TimeFrame};

/// Time frame used when a request does not name one.
const DEFAULT_TIME_FRAME: &str = "Intraday";

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/time-frames", get(time_frames))
        .route("/api/v1/panel", get(panel))
        .route("/api/v1/fear-greed", get(fear_greed))
        .route("/api/v1/cache/invalidate", post(invalidate_cache))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    cached_series: usize,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        cached_series: state.cached_series(),
        server_time: Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Time frames
// =============================================================================

#[derive(Serialize)]
struct TimeFrameInfo {
    label: &'static str,
    period: Period,
    interval: Interval,
}

async fn time_frames() -> impl IntoResponse {
    let table: Vec<TimeFrameInfo> = TimeFrame::ALL
        .iter()
        .map(|tf| {
            let (period, interval) = tf.resolve();
            TimeFrameInfo {
                label: tf.label(),
                period,
                interval,
            }
        })
        .collect();
    Json(table)
}

// =============================================================================
// Panel
// =============================================================================

#[derive(Debug, Deserialize)]
struct PanelQuery {
    ticker: String,
    time_frame: Option<String>,
    /// Comma-separated indicator ids; all when absent.
    columns: Option<String>,
    #[serde(default)]
    refresh: bool,
}

fn parse_columns(raw: &str) -> Result<Vec<IndicatorColumn>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<IndicatorColumn>().map_err(ApiError::BadRequest))
        .collect()
}

fn query_error(rejection: QueryRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

async fn panel(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PanelQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = query.map_err(query_error)?;
    let time_frame = q.time_frame.as_deref().unwrap_or(DEFAULT_TIME_FRAME);
    let selection = q.columns.as_deref().map(parse_columns).transpose()?;

    let panel = state.build_panel(&q.ticker, time_frame, q.refresh).await?;
    info!(
        ticker = %panel.series().symbol(),
        time_frame,
        rows = panel.rows(),
        "panel served"
    );

    Ok(Json(panel.view(selection.as_deref())).into_response())
}

// =============================================================================
// Fear & Greed
// =============================================================================

#[derive(Debug, Deserialize)]
struct FearGreedQuery {
    ticker: String,
    time_frame: Option<String>,
}

#[derive(Debug, Serialize)]
struct FearGreedResponse {
    ticker: String,
    time_frame: String,
    score: f64,
    level: FearGreedLevel,
    timestamp: DateTime<Utc>,
}

async fn fear_greed(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FearGreedQuery>, QueryRejection>,
) -> Result<Json<FearGreedResponse>, ApiError> {
    let Query(q) = query.map_err(query_error)?;
    let time_frame = q.time_frame.as_deref().unwrap_or(DEFAULT_TIME_FRAME);

    let panel = state.build_panel(&q.ticker, time_frame, false).await?;
    let symbol = panel.series().symbol().to_string();
    let reading = panel.latest_fear_greed().ok_or_else(|| {
        ApiError::NotFound(format!(
            "not enough rows to score {symbol} ({} rows)",
            panel.rows()
        ))
    })?;

    Ok(Json(FearGreedResponse {
        ticker: symbol,
        time_frame: time_frame.to_string(),
        score: reading.score,
        level: reading.level,
        timestamp: reading.timestamp,
    }))
}

// =============================================================================
// Cache invalidation
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct InvalidateRequest {
    ticker: Option<String>,
    time_frame: Option<String>,
}

#[derive(Debug, Serialize)]
struct InvalidateResponse {
    dropped: usize,
}

async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    body: Result<Json<InvalidateRequest>, JsonRejection>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let dropped = match req.ticker {
        Some(ticker) => {
            let time_frame = req.time_frame.as_deref().unwrap_or(DEFAULT_TIME_FRAME);
            let key = state.key_for(&ticker, time_frame)?;
            state.invalidate(Some(&key))
        }
        None => state.invalidate(None),
    };

    Ok(Json(InvalidateResponse { dropped }))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::market_data::loader::test_support::MockProvider;
    use crate::runtime_config::PanelConfig;

    fn app(rows: usize) -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::new(
            PanelConfig::default(),
            Arc::new(MockProvider::new(rows)),
        ));
        (router(Arc::clone(&state)), state)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, json: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app(30);
        let (status, body) = send(app, get("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cached_series"], 0);
    }

    #[tokio::test]
    async fn time_frame_table() {
        let (app, _) = app(30);
        let (status, body) = send(app, get("/api/v1/time-frames")).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[0]["label"], "Intraday");
        assert_eq!(rows[0]["period"], "1d");
        assert_eq!(rows[0]["interval"], "5m");
        assert_eq!(rows[8]["label"], "4 Hour");
        assert_eq!(rows[8]["interval"], "1d");
    }

    #[tokio::test]
    async fn panel_returns_every_column() {
        let (app, state) = app(30);
        let (status, body) =
            send(app, get("/api/v1/panel?ticker=gme&time_frame=1%20Month")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "GME");
        assert_eq!(body["rows"], 30);

        let columns = body["columns"].as_object().unwrap();
        assert_eq!(columns.len(), 6 + IndicatorColumn::ALL.len());
        assert_eq!(columns["SMA"][29], 119.5);
        assert!(columns["SMA"][18].is_null());
        assert_eq!(state.cached_series(), 1);
    }

    #[tokio::test]
    async fn panel_column_selection() {
        let (app, _) = app(30);
        let (status, body) =
            send(app, get("/api/v1/panel?ticker=GME&time_frame=1%20Year&columns=RSI,OBV")).await;
        assert_eq!(status, StatusCode::OK);
        let columns = body["columns"].as_object().unwrap();
        assert_eq!(columns.len(), 8);
        assert!(columns.contains_key("RSI"));
        assert!(columns.contains_key("OBV"));
        assert!(!columns.contains_key("SMA"));
    }

    #[tokio::test]
    async fn unknown_column_is_bad_request() {
        let (app, _) = app(30);
        let (status, body) = send(app, get("/api/v1/panel?ticker=GME&columns=VWAP")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("VWAP"));
    }

    #[tokio::test]
    async fn missing_ticker_is_bad_request() {
        let (app, _) = app(30);
        let (status, body) = send(app, get("/api/v1/panel?time_frame=5Y")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn blank_ticker_is_bad_request() {
        let (app, _) = app(30);
        let (status, _) = send(app, get("/api/v1/panel?ticker=%20%20")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ticker_with_url_syntax_is_bad_request() {
        let provider = Arc::new(MockProvider::new(30));
        let state = Arc::new(AppState::new(PanelConfig::default(), provider.clone()));
        let (status, body) =
            send(router(state), get("/api/v1/panel?ticker=GME%23&time_frame=5Y")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("GME#"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_symbol_is_not_found() {
        let (app, state) = app(30);
        let (status, body) =
            send(app, get("/api/v1/panel?ticker=ZZZZINVALID&time_frame=1%20Month")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ZZZZINVALID"));
        assert_eq!(state.cached_series(), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_not_found() {
        let (app, _) = app(30);
        let (status, _) = send(app, get("/api/v1/panel?ticker=BROKEN")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn fear_greed_latest_score() {
        let (app, _) = app(40);
        let (status, body) =
            send(app, get("/api/v1/fear-greed?ticker=gme&time_frame=5Y")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticker"], "GME");
        assert_eq!(body["time_frame"], "5Y");
        let score = body["score"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&score));
        assert!(body["level"].is_string());
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn fear_greed_on_short_series_is_not_found() {
        let (app, _) = app(10);
        let (status, body) = send(app, get("/api/v1/fear-greed?ticker=GME")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("GME"));
    }

    #[tokio::test]
    async fn invalidate_one_then_all() {
        let (app, state) = app(30);
        send(app.clone(), get("/api/v1/panel?ticker=A&time_frame=1%20Month")).await;
        send(app.clone(), get("/api/v1/panel?ticker=B&time_frame=1%20Month")).await;
        assert_eq!(state.cached_series(), 2);

        let (status, body) = send(
            app.clone(),
            post_json("/api/v1/cache/invalidate", r#"{"ticker":"a","time_frame":"1 Month"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dropped"], 1);

        let (_, body) = send(app, post_json("/api/v1/cache/invalidate", "{}")).await;
        assert_eq!(body["dropped"], 1);
        assert_eq!(state.cached_series(), 0);
    }

    #[tokio::test]
    async fn invalidate_rejects_malformed_body() {
        let (app, _) = app(30);
        let (status, body) =
            send(app, post_json("/api/v1/cache/invalidate", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
