use super::cache_config::CacheConfig;
use crate::datalayer::helper::ExponentialBackoff;
use crate::errors::errors::{ServiceError, ServiceResult};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{error, info, warn};

/// Key of a direct cache-aside entry: `{prefix}:{id}`.
/// Trailing colons are dropped from the prefix so the key can never take the
/// `{region}::{key}` shape of the memoised entries.
pub fn user_key(prefix: &str, id: i64) -> String {
    format!("{}:{}", prefix.trim_end_matches(':'), id)
}

/// Key of an entry inside a named cache region: `{region}::{key}`
pub fn region_key(region: &str, key: impl std::fmt::Display) -> String {
    format!("{}::{}", region, key)
}

/// String-valued cache seam; values are JSON documents
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> ServiceResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> ServiceResult<()>;

    async fn ping(&self) -> ServiceResult<()>;
}

/// Redis-backed cache store sharing one multiplexed connection
#[derive(Clone)]
pub struct RedisCacheStore {
    redis: ConnectionManager,
    ttl: Option<Duration>,
}

impl RedisCacheStore {
    pub fn new(redis: ConnectionManager, ttl: Option<Duration>) -> Self {
        Self { redis, ttl }
    }

    /// Open the connection manager, retrying with backoff until Redis answers
    pub async fn connect(config: &CacheConfig) -> ServiceResult<Self> {
        info!(url = %config.redis_url, ttl = ?config.ttl, "Connecting to Redis");

        let client = Client::open(config.redis_url.as_str())?;
        let redis = ExponentialBackoff::new()
            .retry("redis", config.connect_retries, || {
                ConnectionManager::new(client.clone())
            })
            .await
            .map_err(|e| {
                error!("Failed to connect to Redis: {}", e);
                e
            })?;

        info!("Redis connection established");
        Ok(Self::new(redis, config.ttl))
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> ServiceResult<Option<String>> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> ServiceResult<()> {
        let mut conn = self.redis.clone();
        match self.ttl {
            Some(ttl) => {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("EX")
                    .arg(ttl.as_secs())
                    .query_async::<_, ()>(&mut conn)
                    .await?
            }
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn ping(&self) -> ServiceResult<()> {
        let mut conn = self.redis.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Bounds every call on the wrapped store; a call that outlives the limit
/// is abandoned and reported as `CacheUnavailable`
pub struct TimeoutCacheStore {
    inner: Arc<dyn CacheStore>,
    limit: Duration,
}

impl TimeoutCacheStore {
    pub fn new(inner: Arc<dyn CacheStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T, Fut>(&self, op: &'static str, call: Fut) -> ServiceResult<T>
    where
        Fut: Future<Output = ServiceResult<T>>,
    {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, limit_ms = self.limit.as_millis() as u64, "Cache call timed out");
                Err(ServiceError::CacheUnavailable)
            }
        }
    }
}

#[async_trait]
impl CacheStore for TimeoutCacheStore {
    async fn get(&self, key: &str) -> ServiceResult<Option<String>> {
        self.bounded("GET", self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: String) -> ServiceResult<()> {
        self.bounded("SET", self.inner.set(key, value)).await
    }

    async fn ping(&self) -> ServiceResult<()> {
        self.bounded("PING", self.inner.ping()).await
    }
}
