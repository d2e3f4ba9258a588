//! MySQL pool settings
//!
//! [`DatabaseConfig`] is either built in code or read from `DATABASE_*`
//! environment variables (a `.env` file is honoured). Durations are given in
//! whole seconds in the environment.

use serde::Deserialize;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::error::DatabaseError;

/// Shared MySQL connection pool
pub type DatabasePool = MySqlPool;

/// Prefix of the environment variables read by [`DatabaseConfig::from_env`]
pub const ENV_PREFIX: &str = "DATABASE";

const DEFAULT_URL: &str = "mysql://root@127.0.0.1:3306/app";

/// Pool settings
///
/// ```rust
/// use infra_db::DatabaseConfig;
/// use std::time::Duration;
///
/// let config = DatabaseConfig::new("mysql://root@localhost/app")
///     .with_max_connections(20)
///     .with_acquire_timeout(Duration::from_secs(10));
/// assert_eq!(config.min_connections, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a caller waits for a free connection
    #[serde(rename = "acquire_timeout_secs", deserialize_with = "seconds")]
    pub acquire_timeout: Duration,
    #[serde(rename = "max_lifetime_secs", deserialize_with = "seconds")]
    pub max_lifetime: Duration,
    #[serde(rename = "idle_timeout_secs", deserialize_with = "seconds")]
    pub idle_timeout: Duration,
}

fn seconds<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(30 * 60),
            idle_timeout: Duration::from_secs(10 * 60),
        }
    }
}

impl DatabaseConfig {
    /// Default settings against `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Loads `.env`, then reads `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`,
    /// `DATABASE_MIN_CONNECTIONS`, `DATABASE_ACQUIRE_TIMEOUT_SECS`,
    /// `DATABASE_MAX_LIFETIME_SECS` and `DATABASE_IDLE_TIMEOUT_SECS`
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Configuration` if a value cannot be parsed
    pub fn from_env() -> Result<Self, DatabaseError> {
        dotenvy::dotenv().ok();
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Reads the settings from a `config` environment source
    pub fn from_environment(source: config::Environment) -> Result<Self, DatabaseError> {
        Ok(config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?)
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_min_connections(mut self, min_connections: u32) -> Self {
        self.min_connections = min_connections;
        self
    }

    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    pub fn with_max_lifetime(mut self, max_lifetime: Duration) -> Self {
        self.max_lifetime = max_lifetime;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn pool_options(&self) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .max_lifetime(self.max_lifetime)
            .idle_timeout(self.idle_timeout)
    }
}

/// Connects a pool with the given settings
///
/// # Errors
///
/// Returns `DatabaseError::ConnectionFailed` if no connection can be opened
///
/// ```rust,ignore
/// let pool = infra_db::create_pool(infra_db::DatabaseConfig::from_env()?).await?;
/// ```
pub async fn create_pool(config: DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting MySQL pool"
    );

    let pool = config
        .pool_options()
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!("MySQL pool connected");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_builder_overrides_defaults() {
        let config = DatabaseConfig::new("mysql://test")
            .with_max_connections(50)
            .with_min_connections(10)
            .with_acquire_timeout(Duration::from_secs(60));

        assert_eq!(config.url, "mysql://test");
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.min_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(60));
        assert_eq!(config.idle_timeout, DatabaseConfig::default().idle_timeout);
    }

    #[test]
    fn test_from_environment_applies_overrides() {
        let config = DatabaseConfig::from_environment(environment(&[
            ("DATABASE_URL", "mysql://root@db/app"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("DATABASE_ACQUIRE_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.url, "mysql://root@db/app");
        assert_eq!(config.max_connections, 25);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_empty_environment_yields_defaults() {
        let config = DatabaseConfig::from_environment(environment(&[])).unwrap();
        assert_eq!(config, DatabaseConfig::default());
    }

    #[test]
    fn test_unparsable_value_is_a_configuration_error() {
        let result = DatabaseConfig::from_environment(environment(&[(
            "DATABASE_MAX_CONNECTIONS",
            "many",
        )]));
        assert!(matches!(result, Err(DatabaseError::Configuration(_))));
    }
}
