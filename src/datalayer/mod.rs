#[allow(non_snake_case)]
pub mod CRUD;
pub mod db_ops;
pub mod helper;

pub use db_ops::{DatabaseHealth, DbConfig, DbManager, initialize_database};
