pub mod types;

pub use types::{DBTables, NewUser, User, Users};
