use crate::{controllayer::health, state::AppState};
use axum::{extract::State, response::IntoResponse};
use tracing::{info, instrument};

/// GET /health
/// Reports database and cache status
#[instrument(skip(state), fields(service = "/health"))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    info!("Health check request received");
    health::health_check(State(state)).await
}

/// GET /health/live
pub async fn liveness() -> impl IntoResponse {
    health::liveness().await
}

/// GET /health/ready
#[instrument(skip(state), fields(service = "/health/ready"))]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    health::readiness(State(state)).await
}
