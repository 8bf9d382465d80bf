//! HTTP API handlers for Blindstick.
//!
//! Renderers poll these endpoints; the page itself lives elsewhere.
//!
//! - `GET /api/snapshot`: the latest [`DashboardView`]
//! - `GET /api/alerts/history`: just the alert feed
//! - `POST /api/refresh`: poll the store now and return the new view
//! - `GET /health`: health check
//!
//! Handlers only read the published view. A refresh is delegated to the
//! monitor task so the notification state keeps a single writer.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::dashboard::DashboardView;
use crate::model::HistoryEntry;
use crate::monitor::{MonitorHandle, SharedView};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub view: SharedView,
    pub monitor: MonitorHandle,
}

/// Build the router with all endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/alerts/history", get(get_history))
        .route("/api/refresh", post(post_refresh))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// GET /api/snapshot - The latest dashboard view.
///
/// # Response
///
/// ```json
/// {
///     "updated_at": "2024-01-15T10:30:00Z",
///     "source": "live",
///     "status_badge": "emergency",
///     "battery_percent": 85,
///     "signal": "Strong",
///     "emergency_active": true,
///     "obstacle": { "distance_cm": 18, "progress_percent": 18, "band": "alert", "label": "Obstacle nearby!" },
///     "history": [ { "time": "10:29:58", "category": "emergency", "message": "🚨 Emergency at 10:29:58 - Ipoh", "sort_key": 1705314598000 } ],
///     ...
/// }
/// ```
#[instrument(skip(state))]
pub async fn get_snapshot(State(state): State<AppState>) -> Json<DashboardView> {
    let view = state.view.read().await.clone();
    Json(view)
}

/// GET /api/alerts/history - The alert feed, most recent first.
#[instrument(skip(state))]
pub async fn get_history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    let history = state.view.read().await.history.clone();
    Json(history)
}

/// POST /api/refresh - Poll the store immediately.
///
/// Returns `503 Service Unavailable` if the monitor task is not running.
#[instrument(skip(state))]
pub async fn post_refresh(
    State(state): State<AppState>,
) -> Result<Json<DashboardView>, StatusCode> {
    match state.monitor.refresh().await {
        Some(view) => {
            info!(source = ?view.source, "Dashboard refreshed on request");
            Ok(Json(view))
        }
        None => {
            warn!("Refresh requested but the monitor is not running");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
