use super::request_id::get_request_id;
use crate::errors::errors::create_error_response;
use axum::{
    Extension,
    extract::Request,
    http::{StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Logs every failed response with its request id.
/// Client errors go out at warn level, server errors at error level.
pub async fn error_handling_middleware(request: Request, next: Next) -> Response {
    let request_id = get_request_id(&request).map(|id| id.to_string());
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            status = %status,
            method = %method,
            uri = %uri,
            request_id = ?request_id,
            "Request failed"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            status = %status,
            method = %method,
            uri = %uri,
            request_id = ?request_id,
            "Request rejected"
        );
    }

    response
}

/// Fallback for unknown routes, rendered in the service error format
pub async fn not_found_handler(uri: Uri, request_id: Option<Extension<Uuid>>) -> Response {
    create_error_response(
        StatusCode::NOT_FOUND,
        "ROUTE_NOT_FOUND",
        &format!("No route for {}", uri.path()),
        request_id.map(|Extension(id)| id.to_string()),
    )
}
