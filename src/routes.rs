use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{health, users},
    middleware::{error_handling_middleware, not_found_handler, request_id_middleware},
    state::AppState,
};

/// Create the main application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Health routes
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // User routes
    let user_routes = Router::new()
        .route("/user", post(users::create_user))
        .route("/user/:id", get(users::get_user))
        .route("/user/short-way/:id", get(users::get_user_short_way));

    Router::new()
        .merge(health_routes)
        .merge(user_routes)
        .fallback(not_found_handler)
        .layer(middleware::from_fn(error_handling_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
