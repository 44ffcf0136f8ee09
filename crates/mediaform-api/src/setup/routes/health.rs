//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use mediaform_cache::CacheStats;
use std::sync::Arc;
use std::time::Duration;

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: &'static str,
    pub storage: String,
    pub sources: usize,
    pub transform_slots_available: usize,
    pub cache: CacheStats,
}

/// Liveness probe - process is running.
pub(super) async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Health check with storage reachability and cache statistics.
pub(super) async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let storage = match tokio::time::timeout(TIMEOUT, state.catalog.probe_storage()).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Storage health check failed");
            format!("degraded: {}", e)
        }
        Err(_) => "timeout".to_string(),
    };

    let response = HealthCheckResponse {
        status: "healthy",
        storage,
        sources: state.catalog.len().await,
        transform_slots_available: state.transform_permits.available_permits(),
        cache: state.cache.stats(),
    };

    (StatusCode::OK, Json(response))
}
