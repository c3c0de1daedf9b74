use std::str::FromStr;
use std::time::Duration;

use crate::datalayer::db_ops::constants::{self, DbConfig};
use crate::errors::errors::{ServiceError, ServiceResult};

fn parse_or<T, F>(lookup: F, name: &str, fallback: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(fallback)
}

fn env_or<T: FromStr>(name: &str, fallback: T) -> T {
    parse_or(|key| std::env::var(key).ok(), name, fallback)
}

/*
Pool defaults, each overridable from the environment:
- DATABASE_URL            constants::URL
- DB_MAX_CONNECTIONS      10
- DB_MIN_CONNECTIONS      2
- DB_ACQUIRE_TIMEOUT_SECS 30
- DB_CONNECT_RETRIES      5
- RUN_MIGRATIONS          true
Idle connections are reaped after 10 minutes, any connection after 30.
*/
impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: env_or("DATABASE_URL", constants::URL.to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connection_timeout: Duration::from_secs(env_or("DB_ACQUIRE_TIMEOUT_SECS", 30)),
            idle_timeout: Duration::from_secs(10 * 60),
            max_lifetime: Duration::from_secs(30 * 60),
            connect_retries: env_or("DB_CONNECT_RETRIES", 5),
            run_migrations: env_or("RUN_MIGRATIONS", true),
        }
    }
}

impl DbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects pool sizes sqlx would refuse or silently clamp
    pub fn validate(&self) -> ServiceResult<()> {
        if self.max_connections == 0 {
            return Err(ServiceError::ConfigurationError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ServiceError::ConfigurationError(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }

    pub fn set_database_url(mut self, database_url: String) -> Self {
        self.database_url = database_url;
        self
    }

    pub fn set_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn set_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn set_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn set_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn set_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    pub fn set_connect_retries(mut self, retries: u32) -> Self {
        self.connect_retries = retries;
        self
    }

    pub fn set_run_migrations(mut self, enabled: bool) -> Self {
        self.run_migrations = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lifetimes() {
        let config = DbConfig::default();

        assert_eq!(config.idle_timeout, Duration::from_secs(600));
        assert_eq!(config.max_lifetime, Duration::from_secs(1800));
        assert!(!config.database_url.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_setters_override_defaults() {
        let config = DbConfig::new()
            .set_database_url("postgres://app:app@db:5432/users".to_string())
            .set_max_connections(20)
            .set_min_connections(4)
            .set_connection_timeout(Duration::from_secs(5))
            .set_idle_timeout(Duration::from_secs(60))
            .set_max_lifetime(Duration::from_secs(120))
            .set_connect_retries(1)
            .set_run_migrations(false);

        assert_eq!(config.database_url, "postgres://app:app@db:5432/users");
        assert_eq!((config.min_connections, config.max_connections), (4, 20));
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.max_lifetime, Duration::from_secs(120));
        assert_eq!(config.connect_retries, 1);
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_validate_pool_bounds() {
        let inverted = DbConfig::new().set_max_connections(2).set_min_connections(3);
        assert!(matches!(
            inverted.validate(),
            Err(ServiceError::ConfigurationError(_))
        ));

        let empty = DbConfig::new().set_max_connections(0).set_min_connections(0);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_parse_or_ignores_unparsable_values() {
        let padded = |_: &str| Some(" 12 ".to_string());
        assert_eq!(parse_or(padded, "DB_MAX_CONNECTIONS", 3u32), 12);

        let garbage = |_: &str| Some("twelve".to_string());
        assert_eq!(parse_or(garbage, "DB_MAX_CONNECTIONS", 3u32), 3);

        let unset = |_: &str| None;
        assert!(parse_or(unset, "RUN_MIGRATIONS", true));
    }
}
