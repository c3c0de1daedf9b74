use crate::{
    controllayer::users::users_handler,
    datalayer::CRUD::types::User,
    errors::errors::{ServiceError, ServiceResult},
    state::AppState,
};
use axum::{
    Json,
    extract::{FromRequest, Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use validator::Validate;

// ===== REQUEST DTOs =====

/// Body of `POST /user`. Unknown fields (including a client-sent `id`) are ignored.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "lastname must be 1-100 characters"))]
    pub lastname: String,
    #[validate(range(min = 0, max = 150, message = "age must be between 0 and 150"))]
    pub age: Option<i32>,
}

impl CreateUserRequest {
    /// Trims surrounding whitespace from the text fields
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            lastname: self.lastname.trim().to_string(),
            age: self.age,
        }
    }
}

/// `Json` extractor whose rejections render as `ServiceError` bodies
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ServiceError))]
pub struct AppJson<T>(pub T);

// ===== HANDLERS =====

/// POST /user
/// Create a new user
#[instrument(skip(state, payload), fields(service = "/user"))]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> ServiceResult<Json<User>> {
    debug!(has_age = payload.age.is_some(), "Creating new user");
    users_handler::create_user(&state, payload).await.map(Json)
}

/// GET /user/:id
/// Explicit cache-aside lookup
#[instrument(skip(state), fields(service = "/user/:id"))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ServiceResult<Json<User>> {
    info!(user_id = %raw_id, "Getting user");
    users_handler::get_user(&state, &raw_id).await.map(Json)
}

/// GET /user/short-way/:id
/// Lookup memoised through the `user` cache region
#[instrument(skip(state), fields(service = "/user/short-way/:id"))]
pub async fn get_user_short_way(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ServiceResult<Json<User>> {
    info!(user_id = %raw_id, "Getting user (short way)");
    users_handler::get_user_short_way(&state, &raw_id).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ignores_client_id() {
        let request: CreateUserRequest =
            serde_json::from_str(r#"{"id": 5, "name": "Luis", "lastname": "Rubio", "age": 31}"#)
                .unwrap();
        assert_eq!(request.name, "Luis");
        assert_eq!(request.age, Some(31));
    }

    #[test]
    fn test_age_is_optional() {
        let request: CreateUserRequest =
            serde_json::from_str(r#"{"name": "Luis", "lastname": "Rubio"}"#).unwrap();
        assert_eq!(request.age, None);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validation_bounds() {
        let request = CreateUserRequest {
            name: "Luis".to_string(),
            lastname: "x".repeat(101),
            age: Some(-1),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("lastname"));
        assert!(fields.contains_key("age"));
        assert!(!fields.contains_key("name"));
    }

    #[test]
    fn test_normalized_trims_whitespace() {
        let request = CreateUserRequest {
            name: "  Luis ".to_string(),
            lastname: "\tRubio\n".to_string(),
            age: None,
        }
        .normalized();
        assert_eq!(request.name, "Luis");
        assert_eq!(request.lastname, "Rubio");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_create_user_keeps_names_out_of_logs() {
        use crate::datalayer::CRUD::redis::redis::MockCacheStore;
        use crate::datalayer::CRUD::users::MockUserRepository;
        use std::{sync::Arc, time::Duration};

        let mut repo = MockUserRepository::new();
        repo.expect_insert().returning(|new_user| {
            Ok(User {
                id: 3,
                name: new_user.name,
                lastname: new_user.lastname,
                age: new_user.age,
                created_at: chrono::Utc::now(),
            })
        });
        let state = AppState::new(
            Arc::new(repo),
            Arc::new(MockCacheStore::new()),
            "user",
            Duration::from_millis(100),
        );

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let request = CreateUserRequest {
            name: "Saoirse".to_string(),
            lastname: "Ni Bhriain".to_string(),
            age: Some(40),
        };
        let Json(user) = create_user(State(state), AppJson(request)).await.unwrap();
        assert_eq!(user.id, 3);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("User created"));
        assert!(!output.contains("Saoirse"));
        assert!(!output.contains("Ni Bhriain"));
    }
}
