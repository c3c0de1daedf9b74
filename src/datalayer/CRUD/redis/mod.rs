pub mod cache_config;
pub mod redis;

pub use self::cache_config::CacheConfig;
pub use self::redis::{CacheStore, RedisCacheStore, TimeoutCacheStore, region_key, user_key};
