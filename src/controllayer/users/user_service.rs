use crate::{
    datalayer::CRUD::{
        redis::{CacheStore, region_key, user_key},
        types::{NewUser, User},
        users::UserRepository,
    },
    errors::errors::{ServiceError, ServiceResult},
    handlers::users::CreateUserRequest,
    logging::telemetry::create_counter,
};
use once_cell::sync::Lazy;
use opentelemetry::{KeyValue, metrics::Counter};
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt::Display, future::Future, sync::Arc};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Cache region used by the memoised read path
pub const USER_CACHE_REGION: &str = "user";

static CACHE_HITS: Lazy<Counter<u64>> =
    Lazy::new(|| create_counter("user_cache_hits_total", "User reads served from Redis"));
static CACHE_MISSES: Lazy<Counter<u64>> = Lazy::new(|| {
    create_counter(
        "user_cache_misses_total",
        "User reads that fell through to PostgreSQL",
    )
});

/// Reads and deserializes a cached value.
/// Cache failures and undecodable entries are logged and reported as a miss.
async fn read_cached<T: DeserializeOwned>(cache: &dyn CacheStore, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(key, error = %e, "Cache read failed, falling back to database");
            None
        }
    }
}

/// Serializes and stores a value; failures are logged, never returned
async fn write_cached<T: Serialize>(cache: &dyn CacheStore, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(key, error = %e, "Failed to serialize value for cache");
            return;
        }
    };

    if let Err(e) = cache.set(key, raw).await {
        warn!(key, error = %e, "Cache write failed");
    }
}

/// Memoises `loader` in the named cache region under `{region}::{key}`.
///
/// A cached value is returned without calling the loader. Otherwise the
/// loader runs and, only when it succeeds, its result is cached. Errors from
/// the loader (including not-found) are never cached.
pub async fn cacheable<T, K, F, Fut>(
    cache: &dyn CacheStore,
    region: &str,
    key: K,
    loader: F,
) -> ServiceResult<T>
where
    T: Serialize + DeserializeOwned,
    K: Display,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ServiceResult<T>>,
{
    let cache_key = region_key(region, key);

    if let Some(value) = read_cached::<T>(cache, &cache_key).await {
        debug!(key = %cache_key, "Cache hit");
        CACHE_HITS.add(1, &[KeyValue::new("strategy", "cacheable")]);
        return Ok(value);
    }

    debug!(key = %cache_key, "Cache miss");
    CACHE_MISSES.add(1, &[KeyValue::new("strategy", "cacheable")]);

    let value = loader().await?;
    write_cached(cache, &cache_key, &value).await;
    Ok(value)
}

/// User use cases: creation and the two cached read paths
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    cache: Arc<dyn CacheStore>,
    key_prefix: String,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository>,
        cache: Arc<dyn CacheStore>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            cache,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn repository(&self) -> &Arc<dyn UserRepository> {
        &self.repository
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Validates and stores a new user. The cache is not touched.
    #[instrument(skip(self, request), fields(service = "UserService"))]
    pub async fn create(&self, request: CreateUserRequest) -> ServiceResult<User> {
        let request = request.normalized();
        request.validate()?;

        let user = self
            .repository
            .insert(NewUser {
                name: request.name,
                lastname: request.lastname,
                age: request.age,
            })
            .await?;

        info!(user_id = user.id, "User created");
        Ok(user)
    }

    /// Explicit cache-aside read: `{prefix}:{id}` in Redis first, then the
    /// database, writing the loaded user back to the cache.
    #[instrument(skip(self), fields(service = "UserService"))]
    pub async fn get_user_by_id(&self, id: i64) -> ServiceResult<User> {
        let key = user_key(&self.key_prefix, id);

        if let Some(user) = read_cached::<User>(self.cache.as_ref(), &key).await {
            debug!(key = %key, "Cache hit");
            CACHE_HITS.add(1, &[KeyValue::new("strategy", "cache_aside")]);
            return Ok(user);
        }

        debug!(key = %key, "Cache miss");
        CACHE_MISSES.add(1, &[KeyValue::new("strategy", "cache_aside")]);

        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::UserNotFound(id))?;

        write_cached(self.cache.as_ref(), &key, &user).await;

        Ok(user)
    }

    /// Memoised read through the `user` cache region
    #[instrument(skip(self), fields(service = "UserService"))]
    pub async fn get_user_by_id_cached(&self, id: i64) -> ServiceResult<User> {
        let repository = Arc::clone(&self.repository);
        cacheable(self.cache.as_ref(), USER_CACHE_REGION, id, || async move {
            repository
                .find_by_id(id)
                .await?
                .ok_or(ServiceError::UserNotFound(id))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datalayer::CRUD::redis::redis::MockCacheStore;
    use crate::datalayer::CRUD::users::MockUserRepository;
    use chrono::Utc;
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    fn sample_user(id: i64) -> User {
        User {
            id,
            name: "Luis".to_string(),
            lastname: "Rubio".to_string(),
            age: Some(30),
            created_at: Utc::now(),
        }
    }

    fn service(repo: MockUserRepository, cache: MockCacheStore) -> UserService {
        UserService::new(Arc::new(repo), Arc::new(cache), "user")
    }

    #[tokio::test]
    async fn test_cache_hit_skips_repository() {
        let user = sample_user(1);
        let cached = serde_json::to_string(&user).unwrap();

        let mut cache = MockCacheStore::new();
        cache
            .expect_get()
            .withf(|key| key == "user:1")
            .times(1)
            .returning(move |_| Ok(Some(cached.clone())));
        cache.expect_set().never();

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().never();

        let found = service(repo, cache).get_user_by_id(1).await.unwrap();
        assert_eq!(found, user);
    }

    #[tokio::test]
    async fn test_cache_miss_loads_and_populates() {
        let user = sample_user(2);
        let expected = user.clone();

        let mut cache = MockCacheStore::new();
        cache.expect_get().times(1).returning(|_| Ok(None));
        cache
            .expect_set()
            .withf(|key, value| key == "user:2" && value.contains("\"lastname\":\"Rubio\""))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .with(eq(2))
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let found = service(repo, cache).get_user_by_id(2).await.unwrap();
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_cached() {
        let mut cache = MockCacheStore::new();
        cache.expect_get().returning(|_| Ok(None));
        cache.expect_set().never();

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let result = service(repo, cache).get_user_by_id(404).await;
        assert!(matches!(result, Err(ServiceError::UserNotFound(404))));
    }

    #[tokio::test]
    async fn test_cache_failure_falls_back_to_database() {
        let user = sample_user(3);

        let mut cache = MockCacheStore::new();
        cache
            .expect_get()
            .returning(|_| Err(ServiceError::CacheUnavailable));
        cache
            .expect_set()
            .returning(|_, _| Err(ServiceError::CacheUnavailable));

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let result = service(repo, cache).get_user_by_id(3).await;
        assert_ok!(result);
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_is_treated_as_miss() {
        let user = sample_user(4);

        let mut cache = MockCacheStore::new();
        cache
            .expect_get()
            .returning(|_| Ok(Some("not json".to_string())));
        cache.expect_set().times(1).returning(|_, _| Ok(()));

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let found = service(repo, cache).get_user_by_id(4).await.unwrap();
        assert_eq!(found.id, 4);
    }

    #[tokio::test]
    async fn test_cached_read_uses_region_key() {
        let user = sample_user(5);

        let mut cache = MockCacheStore::new();
        cache
            .expect_get()
            .withf(|key| key == "user::5")
            .returning(|_| Ok(None));
        cache
            .expect_set()
            .withf(|key, _| key == "user::5")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let found = service(repo, cache).get_user_by_id_cached(5).await.unwrap();
        assert_eq!(found.id, 5);
    }

    #[tokio::test]
    async fn test_cached_read_not_found() {
        let mut cache = MockCacheStore::new();
        cache.expect_get().returning(|_| Ok(None));
        cache.expect_set().never();

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let result = service(repo, cache).get_user_by_id_cached(6).await;
        assert_err!(&result);
        assert!(matches!(result, Err(ServiceError::UserNotFound(6))));
    }

    #[tokio::test]
    async fn test_create_validates_before_insert() {
        let cache = MockCacheStore::new();
        let mut repo = MockUserRepository::new();
        repo.expect_insert().never();

        let request = CreateUserRequest {
            name: "   ".to_string(),
            lastname: "Rubio".to_string(),
            age: Some(20),
        };

        let result = service(repo, cache).create(request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_trims_and_inserts() {
        let cache = MockCacheStore::new();
        let mut repo = MockUserRepository::new();
        repo.expect_insert()
            .withf(|new_user| new_user.name == "Luis" && new_user.lastname == "Rubio")
            .times(1)
            .returning(|new_user| {
                Ok(User {
                    id: 10,
                    name: new_user.name,
                    lastname: new_user.lastname,
                    age: new_user.age,
                    created_at: Utc::now(),
                })
            });

        let request = CreateUserRequest {
            name: " Luis ".to_string(),
            lastname: "Rubio".to_string(),
            age: None,
        };

        let created = service(repo, cache).create(request).await.unwrap();
        assert_eq!(created.id, 10);
        assert_eq!(created.age, None);
    }
}
