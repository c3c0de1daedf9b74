use chrono::{DateTime, Utc};
use sea_query::Iden;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[allow(non_snake_case)]
pub mod DBTables {
    pub const USERS: &str = "users";
}

/// Column identifiers of the `users` table
#[derive(Iden, Debug, Clone, Copy)]
pub enum Users {
    Table,
    Id,
    Name,
    Lastname,
    Age,
    CreatedAt,
}

/// User struct matching the users table schema.
/// The same JSON shape is used on the wire and as the cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub lastname: String,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Fields a caller may supply when creating a user; the id is always
/// generated by the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub lastname: String,
    pub age: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_iden_names() {
        assert_eq!(Users::Table.to_string(), DBTables::USERS);
        assert_eq!(Users::Lastname.to_string(), "lastname");
        assert_eq!(Users::CreatedAt.to_string(), "created_at");
    }

    #[test]
    fn test_user_json_shape() {
        let user = User {
            id: 7,
            name: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            age: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["lastname"], "Lovelace");
        assert!(json["age"].is_null());

        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back, user);
    }
}
