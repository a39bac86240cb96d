//! Axum-based HTTP surface over the latest price snapshot and the refresh signals

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::error::{ElprisError, Result};
use crate::pipeline::PriceSnapshot;
use crate::refresh::{RefreshCoordinator, RefreshSignal, TriggerOutcome, Visibility};

#[derive(Clone)]
pub struct AppState {
    pub snapshots: watch::Receiver<Arc<PriceSnapshot>>,
    pub signals: mpsc::UnboundedSender<RefreshSignal>,
    pub coordinator: RefreshCoordinator,
    pub config: Arc<Config>,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityBody {
    pub state: Visibility,
}

#[derive(Serialize)]
struct PricesResponse<'a> {
    #[serde(flatten)]
    snapshot: &'a PriceSnapshot,
    refreshing: bool,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn prices(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshots.borrow().clone();
    Json(
        serde_json::to_value(PricesResponse {
            snapshot: &snapshot,
            refreshing: state.coordinator.is_running(),
        })
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() })),
    )
}

async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    match state.coordinator.trigger() {
        TriggerOutcome::Started(_) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "accepted": true })),
        ),
        TriggerOutcome::AlreadyRunning => (
            StatusCode::OK,
            Json(serde_json::json!({ "accepted": false })),
        ),
        TriggerOutcome::Detached => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "refresh is shut down" })),
        ),
    }
}

async fn visibility(
    State(state): State<AppState>,
    Json(body): Json<VisibilityBody>,
) -> impl IntoResponse {
    match state
        .signals
        .send(RefreshSignal::VisibilityChanged(body.state))
    {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "queued": true })),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "signal listener is gone" })),
        ),
    }
}

async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(
        serde_json::to_value(state.config.as_ref())
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() })),
    )
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/prices", get(prices))
        .route("/api/refresh", post(refresh))
        .route("/api/visibility", post(visibility))
        .route("/api/config", get(get_config))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let router = build_router(state);

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let (addr, parsed_ok): (SocketAddr, bool) = match host.parse::<IpAddr>() {
        Ok(ip) => (SocketAddr::new(ip, port), true),
        Err(_) => (([127, 0, 0, 1], port).into(), false),
    };
    if !parsed_ok {
        logger.warn(&format!(
            "Invalid host '{}'; falling back to 127.0.0.1",
            host
        ));
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ElprisError::web(format!("Failed to bind {}: {}", addr, e)))?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router)
        .await
        .map_err(|e| ElprisError::web(format!("Server stopped: {}", e)))
}
