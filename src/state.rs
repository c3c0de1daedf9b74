use crate::{
    controllayer::users::UserService,
    datalayer::{
        CRUD::{
            redis::{CacheConfig, CacheStore, RedisCacheStore, TimeoutCacheStore},
            users::{PgUserRepository, UserRepository},
        },
        DbManager,
    },
    errors::errors::ServiceResult,
};
use std::{sync::Arc, time::Duration};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
}

impl AppState {
    /// Every cache call made through the state is bounded by `cache_timeout`
    pub fn new(
        repository: Arc<dyn UserRepository>,
        cache: Arc<dyn CacheStore>,
        key_prefix: impl Into<String>,
        cache_timeout: Duration,
    ) -> Self {
        let cache = Arc::new(TimeoutCacheStore::new(cache, cache_timeout));
        Self {
            users: UserService::new(repository, cache, key_prefix),
        }
    }

    /// Wire the PostgreSQL repository and the Redis cache together
    pub async fn connect(db: &DbManager, cache_config: &CacheConfig) -> ServiceResult<Self> {
        let repository = PgUserRepository::new(db.pool().clone());
        let cache = RedisCacheStore::connect(cache_config).await?;

        Ok(Self::new(
            Arc::new(repository),
            Arc::new(cache),
            cache_config.key_prefix.clone(),
            cache_config.op_timeout,
        ))
    }
}
