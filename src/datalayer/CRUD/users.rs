use super::types::{NewUser, User, Users};
use crate::datalayer::CRUD::sql_generator::{FluentInsert, FluentSelect, bind_query};
use crate::datalayer::db_ops::db_health::check_database_health;
use crate::errors::errors::{ServiceError, ServiceResult};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres};
use tracing::{debug, instrument};

/// Persistence seam for user records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Stores a new user and returns the persisted row
    async fn insert(&self, user: NewUser) -> ServiceResult<User>;

    /// Looks a user up by primary key
    async fn find_by_id(&self, id: i64) -> ServiceResult<Option<User>>;

    /// Verifies the backing store is reachable
    async fn ping(&self) -> ServiceResult<()>;
}

/// Builder for creating and reading users
///
/// Setters provide values for `create` and filters for `read`. Every
/// statement returns all columns of the `users` table.
#[derive(Debug, Default)]
pub struct UserBuilder {
    id: Option<i64>,
    name: Option<String>,
    lastname: Option<String>,
    age: Option<i32>,
}

impl UserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn lastname(mut self, lastname: String) -> Self {
        self.lastname = Some(lastname);
        self
    }

    pub fn age(mut self, age: Option<i32>) -> Self {
        self.age = age;
        self
    }

    /// Build the INSERT statement; `id` is ignored because the database assigns it
    pub fn build_insert(&self) -> ServiceResult<(String, sea_query::Values)> {
        let name = self
            .name
            .clone()
            .ok_or_else(|| ServiceError::MissingRequiredField("name".to_string()))?;
        let lastname = self
            .lastname
            .clone()
            .ok_or_else(|| ServiceError::MissingRequiredField("lastname".to_string()))?;

        Ok(FluentInsert::into(Users::Table)
            .value(Users::Name, name)
            .value(Users::Lastname, lastname)
            .value_opt(Users::Age, self.age)
            .returning(Users::Id)
            .returning(Users::Name)
            .returning(Users::Lastname)
            .returning(Users::Age)
            .returning(Users::CreatedAt)
            .render())
    }

    /// Build the SELECT statement from the set fields (AND-ed filters)
    pub fn build_select(&self) -> ServiceResult<(String, sea_query::Values)> {
        let select = FluentSelect::from(Users::Table)
            .column(Users::Id)
            .column(Users::Name)
            .column(Users::Lastname)
            .column(Users::Age)
            .column(Users::CreatedAt)
            .filter_opt(Users::Id, self.id)
            .filter_opt(Users::Name, self.name.clone())
            .filter_opt(Users::Lastname, self.lastname.clone())
            .filter_opt(Users::Age, self.age)
            .limit(1);

        if !select.has_filters() {
            return Err(ServiceError::InvalidInput(
                "At least one filter is required to read a user".to_string(),
            ));
        }

        Ok(select.render())
    }

    /// Insert a new user in the database
    pub async fn create(self, pool: &PgPool) -> ServiceResult<User> {
        let (sql, values) = self.build_insert()?;
        debug!(sql = %sql, "Inserting user");

        let query = bind_query(sqlx::query::<Postgres>(&sql), values);
        let row = query.fetch_one(pool).await?;

        User::from_row(&row).map_err(|e| ServiceError::DatabaseError(e.to_string()))
    }

    /// Read a single user matching the set fields; `None` when nothing matches
    pub async fn read(self, pool: &PgPool) -> ServiceResult<Option<User>> {
        let (sql, values) = self.build_select()?;
        debug!(sql = %sql, "Reading user");

        let query = bind_query(sqlx::query::<Postgres>(&sql), values);
        let row = query.fetch_optional(pool).await?;

        row.map(|r| User::from_row(&r))
            .transpose()
            .map_err(|e| ServiceError::DatabaseError(e.to_string()))
    }
}

/// PostgreSQL-backed user repository
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self, user), fields(service = "PgUserRepository"))]
    async fn insert(&self, user: NewUser) -> ServiceResult<User> {
        UserBuilder::new()
            .name(user.name)
            .lastname(user.lastname)
            .age(user.age)
            .create(&self.pool)
            .await
    }

    #[instrument(skip(self), fields(service = "PgUserRepository"))]
    async fn find_by_id(&self, id: i64) -> ServiceResult<Option<User>> {
        UserBuilder::new().id(id).read(&self.pool).await
    }

    async fn ping(&self) -> ServiceResult<()> {
        check_database_health(&self.pool).await?;
        Ok(())
    }
}
