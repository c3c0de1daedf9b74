use crate::{
    datalayer::CRUD::types::User,
    errors::errors::{ServiceError, ServiceResult},
    handlers::users::CreateUserRequest,
    state::AppState,
};
use tracing::instrument;

/// Parses a path segment into a user id; anything but a positive integer is rejected
pub fn parse_user_id(raw: &str) -> ServiceResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ServiceError::InvalidUserId(raw.to_string())),
    }
}

#[instrument(skip(state, payload), fields(service = "/user"))]
pub async fn create_user(state: &AppState, payload: CreateUserRequest) -> ServiceResult<User> {
    state.users.create(payload).await
}

#[instrument(skip(state), fields(service = "/user/:id"))]
pub async fn get_user(state: &AppState, raw_id: &str) -> ServiceResult<User> {
    let id = parse_user_id(raw_id)?;
    state.users.get_user_by_id(id).await
}

#[instrument(skip(state), fields(service = "/user/short-way/:id"))]
pub async fn get_user_short_way(state: &AppState, raw_id: &str) -> ServiceResult<User> {
    let id = parse_user_id(raw_id)?;
    state.users.get_user_by_id_cached(id).await
}
