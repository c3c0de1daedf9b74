pub mod redis;
pub mod sql_generator;
pub mod types;
pub mod users;
