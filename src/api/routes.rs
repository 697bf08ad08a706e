//! API Routes
//!
//! HTTP endpoints for resolution, manual refresh, health and metrics

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::Metrics;
use crate::cache::ResolutionCache;
use crate::mirror::Mirror;
use crate::reconcile::{Reconciler, TriggerOutcome};
use crate::resolver::{ResolveError, Resolver};

/// Shared API state
pub struct ApiState {
    pub resolver: Arc<Resolver>,
    pub reconciler: Arc<Reconciler>,
    pub cache: Arc<ResolutionCache>,
    pub mirror: Arc<dyn Mirror>,
    pub metrics: Arc<Metrics>,
}

/// Build the application router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Resolution
        .route("/api/resolve/:name", get(resolve_domain))
        .route("/api/profile/:name", get(get_profile))

        // Manual refresh
        .route("/api/refresh", post(trigger_refresh))
        .route("/api/refresh/:name", post(refresh_domain))

        // Health & Status
        .route("/health", get(health_check))
        .route("/status", get(get_status))

        // Metrics
        .route("/metrics", get(get_metrics_prometheus))
        .route("/metrics/json", get(get_metrics_json))

        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_api_server(state: Arc<ApiState>, port: u16) -> anyhow::Result<()> {
    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("📊 HTTP API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Domain not found" })),
    )
        .into_response()
}

fn internal_error(message: &str) -> Response {
    error!("Request failed: {}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// GET /api/resolve/:name - Resolve a domain to its address
async fn resolve_domain(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> Response {
    match state.resolver.resolve(&name).await {
        Ok(address) => Json(serde_json::json!({ "ip": address })).into_response(),
        Err(ResolveError::NotFound) => not_found(),
        Err(ResolveError::Internal(e)) => internal_error(&e),
    }
}

/// GET /api/profile/:name - Full domain record
async fn get_profile(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> Response {
    match state.resolver.get_record(&name).await {
        Ok(record) => Json(record).into_response(),
        Err(ResolveError::NotFound) => not_found(),
        Err(ResolveError::Internal(e)) => internal_error(&e),
    }
}

/// Optional body of POST /api/refresh
#[derive(Debug, Default, Deserialize)]
struct RefreshRequest {
    domain: Option<String>,
}

/// POST /api/refresh/:name - Force a ledger re-query for one domain
async fn refresh_domain(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> Response {
    refresh_one(&state, &name).await
}

/// POST /api/refresh - Refresh one domain, or start a reconciliation pass
async fn trigger_refresh(
    State(state): State<Arc<ApiState>>,
    body: Option<Json<RefreshRequest>>,
) -> Response {
    let request = body.map(|Json(request)| request).unwrap_or_default();

    match request.domain.filter(|domain| !domain.trim().is_empty()) {
        Some(domain) => refresh_one(&state, &domain).await,
        None => {
            let message = match state.reconciler.trigger() {
                TriggerOutcome::Started => "Reconciliation started",
                TriggerOutcome::AlreadyRunning => "Reconciliation already running",
            };
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({ "message": message })),
            )
                .into_response()
        }
    }
}

async fn refresh_one(state: &ApiState, name: &str) -> Response {
    match state.resolver.force_refresh(name).await {
        Ok(record) => Json(serde_json::json!({
            "message": "Domain refreshed",
            "domain": record,
        }))
        .into_response(),
        Err(ResolveError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "message": "Domain not found or ledger unavailable" })),
        )
            .into_response(),
        Err(ResolveError::Internal(e)) => internal_error(&e),
    }
}

/// GET /health - Liveness with server time
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /status - Detailed status
async fn get_status(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let cache = state.cache.stats();
    let mirror_records = state.mirror.count().ok();

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.metrics.uptime_secs(),
        "cache": {
            "positive": cache.positive,
            "negative": cache.negative,
        },
        "mirror": {
            "records": mirror_records,
        },
        "reconciliation": {
            "running": state.reconciler.is_running(),
            "last_report": state.reconciler.last_report(),
        }
    }))
}

/// GET /metrics - Prometheus format metrics
async fn get_metrics_prometheus(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.to_prometheus(),
    )
}

/// GET /metrics/json - JSON format metrics
async fn get_metrics_json(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}
