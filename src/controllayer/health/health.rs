use crate::{errors::errors::ServiceResult, state::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;

pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_UNHEALTHY: &str = "unhealthy";

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: i64,
    pub database: ComponentHealth,
    pub cache: ComponentHealth,
}

/// Status of a single backing service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == STATUS_HEALTHY
    }
}

async fn probe<F>(check: F) -> ComponentHealth
where
    F: Future<Output = ServiceResult<()>>,
{
    let start = Instant::now();
    match check.await {
        Ok(()) => ComponentHealth {
            status: STATUS_HEALTHY.to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Health probe failed");
            ComponentHealth {
                status: STATUS_UNHEALTHY.to_string(),
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Probes the database and the cache concurrently
pub async fn check_components(state: &AppState) -> (ComponentHealth, ComponentHealth) {
    tokio::join!(
        probe(state.users.repository().ping()),
        probe(state.users.cache().ping())
    )
}

/// Health check endpoint handler
///
/// Returns 200 OK if the database and the cache both answer
/// Returns 503 Service Unavailable otherwise
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (database, cache) = check_components(&state).await;
    let healthy = database.is_healthy() && cache.is_healthy();

    let response = HealthResponse {
        status: if healthy { STATUS_HEALTHY } else { STATUS_UNHEALTHY }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        database,
        cache,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe endpoint
///
/// Simple endpoint that returns 200 OK if the service is running
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe endpoint
///
/// Returns 200 OK when both backing services answer, 503 otherwise
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let (database, cache) = check_components(&state).await;

    if database.is_healthy() && cache.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
