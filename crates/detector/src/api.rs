//! HTTP API for health checks, Prometheus metrics and detection results

use detector_lib::{
    health::{ComponentStatus, HealthRegistry},
    AnomalyError, DetectionService, DEFAULT_RISK_THRESHOLD,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub service: Arc<DetectionService>,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, service: Arc<DetectionService>) -> Self {
        Self {
            health_registry,
            service,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Handler failures mapped to status codes
enum ApiError {
    NotFound(String),
    Detection(AnomalyError),
}

impl From<AnomalyError> for ApiError {
    fn from(e: AnomalyError) -> Self {
        ApiError::Detection(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Detection(e @ AnomalyError::SourceUnavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::Detection(e) => {
                error!(error = %e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct PredictionQuery {
    threshold: Option<f64>,
}

/// Health check response - 200 unless a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Latest per-host results, highest total score first
async fn anomalies(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = state.service.latest_report().await?;
    Ok(Json(report.results))
}

async fn summary(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = state.service.latest_report().await?;
    Ok(Json(report.summary))
}

/// Run a detection cycle now
async fn detect(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = state.service.run_once().await?;
    Ok(Json(report))
}

/// Cached result for one host, detected on demand when missing
async fn host_result(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detector = state.service.detector();
    if let Some(result) = detector.store().load_result(&host_id).await? {
        return Ok(Json(result));
    }

    detector
        .detect_anomalies_for_host(&host_id, state.service.config())
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No detection result for host {}", host_id)))
}

async fn host_predictions(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<String>,
    Query(query): Query<PredictionQuery>,
) -> impl IntoResponse {
    let threshold = query.threshold.unwrap_or(DEFAULT_RISK_THRESHOLD);
    let predictions = state
        .service
        .detector()
        .predict_resource_exhaustion(&host_id, threshold)
        .await;
    Json(predictions)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/anomalies", get(anomalies))
        .route("/api/v1/summary", get(summary))
        .route("/api/v1/detect", post(detect))
        .route("/api/v1/hosts/:host_id", get(host_result))
        .route("/api/v1/hosts/:host_id/predictions", get(host_predictions))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
