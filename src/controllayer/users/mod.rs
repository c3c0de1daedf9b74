pub mod user_service;
pub mod users_handler;

pub use user_service::{USER_CACHE_REGION, UserService, cacheable};
