pub mod constants;
pub mod types;
pub use constants::{REQUIRED_TABLES, URL};
pub use types::DbConfig;
