use std::time::Duration;

pub const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_KEY_PREFIX: &str = "user";
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(500);

/// Redis cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub redis_url: String,
    /// Entry lifetime; `None` stores entries without expiry
    pub ttl: Option<Duration>,
    /// Prefix of direct cache-aside keys, `{prefix}:{id}`
    pub key_prefix: String,
    /// Attempts made to reach Redis before startup fails
    pub connect_retries: u32,
    /// Upper bound on a single GET/SET/PING; an expired call counts as unavailable
    pub op_timeout: Duration,
}

/*
Defaults are read from the environment:
- REDIS_URL wins; otherwise redis://{REDIS_HOST}:{REDIS_PORT}
- CACHE_TTL_SECS: 0 or unset means no expiry
- CACHE_KEY_PREFIX: "user"
- REDIS_CONNECT_RETRIES: 5
- CACHE_OP_TIMEOUT_MS: 500, zero falls back to the default
*/
impl Default for CacheConfig {
    fn default() -> Self {
        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| {
            let host =
                std::env::var("REDIS_HOST").unwrap_or_else(|_| DEFAULT_REDIS_HOST.to_string());
            let port = std::env::var("REDIS_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(DEFAULT_REDIS_PORT);
            build_redis_url(&host, port)
        });

        let ttl = std::env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .and_then(ttl_from_secs);

        Self {
            redis_url,
            ttl,
            key_prefix: std::env::var("CACHE_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string()),
            connect_retries: std::env::var("REDIS_CONNECT_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            op_timeout: std::env::var("CACHE_OP_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(op_timeout_from_ms)
                .unwrap_or(DEFAULT_OP_TIMEOUT),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_redis_url(mut self, redis_url: String) -> Self {
        self.redis_url = redis_url;
        self
    }

    pub fn set_host_port(mut self, host: &str, port: u16) -> Self {
        self.redis_url = build_redis_url(host, port);
        self
    }

    /// Zero disables expiry
    pub fn set_ttl_secs(mut self, secs: u64) -> Self {
        self.ttl = ttl_from_secs(secs);
        self
    }

    pub fn set_key_prefix(mut self, key_prefix: String) -> Self {
        self.key_prefix = key_prefix;
        self
    }

    pub fn set_connect_retries(mut self, connect_retries: u32) -> Self {
        self.connect_retries = connect_retries;
        self
    }

    pub fn set_op_timeout_ms(mut self, millis: u64) -> Self {
        self.op_timeout = op_timeout_from_ms(millis);
        self
    }
}

pub fn build_redis_url(host: &str, port: u16) -> String {
    format!("redis://{}:{}", host, port)
}

fn ttl_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn op_timeout_from_ms(millis: u64) -> Duration {
    if millis == 0 {
        DEFAULT_OP_TIMEOUT
    } else {
        Duration::from_millis(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_redis_url() {
        assert_eq!(build_redis_url("redis", 6380), "redis://redis:6380");
    }

    #[test]
    fn test_builder_overrides() {
        let config = CacheConfig::new()
            .set_host_port("cache.internal", 6381)
            .set_ttl_secs(120)
            .set_key_prefix("people".to_string())
            .set_connect_retries(2);

        assert_eq!(config.redis_url, "redis://cache.internal:6381");
        assert_eq!(config.ttl, Some(Duration::from_secs(120)));
        assert_eq!(config.key_prefix, "people");
        assert_eq!(config.connect_retries, 2);
    }

    #[test]
    fn test_op_timeout_setter() {
        let config = CacheConfig::new().set_op_timeout_ms(75);
        assert_eq!(config.op_timeout, Duration::from_millis(75));

        let config = config.set_op_timeout_ms(0);
        assert_eq!(config.op_timeout, DEFAULT_OP_TIMEOUT);
    }

    #[test]
    fn test_zero_ttl_means_no_expiry() {
        let config = CacheConfig::new().set_ttl_secs(0);
        assert_eq!(config.ttl, None);
    }
}
