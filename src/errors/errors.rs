use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for the users service
#[derive(Debug)]
pub enum ServiceError {
    // User Errors
    UserNotFound(i64),
    InvalidUserId(String),

    // Validation Errors
    ValidationError(String),
    InvalidInput(String),
    MissingRequiredField(String),

    // Database Errors
    DatabaseError(String),
    DatabaseConnectionError,
    MigrationError(String),

    // Cache Errors
    CacheError(String),
    CacheUnavailable,

    // Internal Errors
    SerializationError(String),
    InternalServerError(String),
    ConfigurationError(String),
}

/// Error response structure sent to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::UserNotFound(id) => write!(f, "User not found by id: {}", id),
            ServiceError::InvalidUserId(raw) => write!(f, "Invalid user id: {}", raw),

            ServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ServiceError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            ServiceError::MissingRequiredField(field) => {
                write!(f, "Missing required field: {}", field)
            }

            ServiceError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ServiceError::DatabaseConnectionError => write!(f, "Failed to connect to database"),
            ServiceError::MigrationError(msg) => write!(f, "Migration failed: {}", msg),

            ServiceError::CacheError(msg) => write!(f, "Cache error: {}", msg),
            ServiceError::CacheUnavailable => write!(f, "Cache is unavailable"),

            ServiceError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            ServiceError::InternalServerError(msg) => write!(f, "Internal server error: {}", msg),
            ServiceError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 404 Not Found
            ServiceError::UserNotFound(_) => StatusCode::NOT_FOUND,

            // 400 Bad Request
            ServiceError::InvalidUserId(_)
            | ServiceError::ValidationError(_)
            | ServiceError::InvalidInput(_)
            | ServiceError::MissingRequiredField(_) => StatusCode::BAD_REQUEST,

            // 503 Service Unavailable
            ServiceError::DatabaseConnectionError | ServiceError::CacheUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 500 Internal Server Error
            ServiceError::DatabaseError(_)
            | ServiceError::MigrationError(_)
            | ServiceError::CacheError(_)
            | ServiceError::SerializationError(_)
            | ServiceError::InternalServerError(_)
            | ServiceError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::UserNotFound(_) => "USER_NOT_FOUND",
            ServiceError::InvalidUserId(_) => "INVALID_USER_ID",

            ServiceError::ValidationError(_) => "VALIDATION_ERROR",
            ServiceError::InvalidInput(_) => "INVALID_INPUT",
            ServiceError::MissingRequiredField(_) => "MISSING_REQUIRED_FIELD",

            ServiceError::DatabaseError(_) => "DATABASE_ERROR",
            ServiceError::DatabaseConnectionError => "DATABASE_CONNECTION_ERROR",
            ServiceError::MigrationError(_) => "MIGRATION_ERROR",

            ServiceError::CacheError(_) => "CACHE_ERROR",
            ServiceError::CacheUnavailable => "CACHE_UNAVAILABLE",

            ServiceError::SerializationError(_) => "SERIALIZATION_ERROR",
            ServiceError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ServiceError::ConfigurationError(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Convert error to JSON details for response
    pub fn to_details(&self) -> Option<serde_json::Value> {
        match self {
            ServiceError::UserNotFound(id) => Some(serde_json::json!({ "user_id": id })),
            ServiceError::MissingRequiredField(field) => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        }
    }

    /// Whether the client is at fault; used to pick the log level
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Implement IntoResponse for Axum integration
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Request failed");
        }

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: self.to_details(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Build an error response outside of a `ServiceError`, e.g. from middleware
/// or extractor rejections. The request id, when known, is echoed in the details.
pub fn create_error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    request_id: Option<String>,
) -> Response {
    let details = request_id.map(|id| serde_json::json!({ "request_id": id }));
    let error_response = ErrorResponse {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
            details,
        },
    };

    (status, Json(error_response)).into_response()
}

/// Conversion from sqlx errors
impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ServiceError::DatabaseError("Record not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                ServiceError::DatabaseConnectionError
            }
            _ => ServiceError::DatabaseError(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for ServiceError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        ServiceError::MigrationError(err.to_string())
    }
}

/// Conversion from redis errors
impl From<redis::RedisError> for ServiceError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            ServiceError::CacheUnavailable
        } else {
            ServiceError::CacheError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

/// Conversion from validation errors
impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

/// Malformed or mistyped request bodies are client errors
impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::InvalidInput(rejection.body_text())
    }
}

/// Type alias for Results using ServiceError
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let error = ServiceError::UserNotFound(42);
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.error_code(), "USER_NOT_FOUND");
        assert_eq!(error.to_string(), "User not found by id: 42");
    }

    #[test]
    fn test_sqlx_pool_timeout_is_connection_error() {
        let error: ServiceError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(error, ServiceError::DatabaseConnectionError));
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_serde_error_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: ServiceError = err.into();
        assert!(matches!(error, ServiceError::SerializationError(_)));
        assert!(!error.is_client_error());
    }

    #[test]
    fn test_create_error_response_status() {
        let response = create_error_response(
            StatusCode::BAD_REQUEST,
            "invalid_path",
            "bad id",
            Some("abc".to_string()),
        );
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
