//! MySQL containers for integration tests
//!
//! Every [`TestDatabase`] owns a fresh `mysql` testcontainer with the
//! `users`/`cities` schema applied. Tests that only read can share one
//! container through [`get_shared_test_database`].

use std::sync::Arc;
use std::time::Duration;

use infra_db::{create_pool, DatabaseConfig, DatabasePool, MySqlExecutor};
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::mysql::Mysql;
use tokio::sync::OnceCell;

use crate::fixtures::{CITIES_TABLE, USERS_TABLE};

/// Error type of container setup
pub type SetupError = Box<dyn std::error::Error + Send + Sync>;

/// Port the server listens on inside the container
const MYSQL_PORT: u16 = 3306;

const INITIAL_SCHEMA: &str = include_str!("../../../migrations/20240101_000001_initial_schema.sql");

/// URL of the passwordless `root` account on the module's `test` database
pub fn mysql_url(host: &str, port: u16) -> String {
    format!("mysql://root@{}:{}/test", host, port)
}

/// A running MySQL container and a pool connected to it
///
/// The container is stopped when this value is dropped.
pub struct TestDatabase {
    _container: ContainerAsync<Mysql>,
    pub url: String,
    pub pool: DatabasePool,
}

impl TestDatabase {
    /// Starts a container, connects, and applies the schema
    pub async fn start() -> Result<Self, SetupError> {
        let container = Mysql::default().start().await?;
        let url = mysql_url(
            &container.get_host().await?.to_string(),
            container.get_host_port_ipv4(MYSQL_PORT).await?,
        );

        let pool = create_pool(
            DatabaseConfig::new(url.clone())
                .with_max_connections(5)
                .with_min_connections(1)
                .with_acquire_timeout(Duration::from_secs(30)),
        )
        .await?;

        for statement in schema_statements(INITIAL_SCHEMA) {
            sqlx::query(&statement).execute(&pool).await?;
        }

        Ok(Self {
            _container: container,
            url,
            pool,
        })
    }

    /// A repository executor on this database's pool
    pub fn executor(&self) -> MySqlExecutor {
        MySqlExecutor::new(self.pool.clone())
    }

    /// Deletes every row, keeping the tables
    pub async fn clear_data(&self) -> Result<(), SetupError> {
        for table in [USERS_TABLE, CITIES_TABLE] {
            sqlx::query(&format!("DELETE FROM `{}`", table))
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }
}

/// Statements of a schema file, without `--` comment lines
fn schema_statements(schema: &str) -> Vec<String> {
    schema
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

static SHARED: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// One container shared by every caller in the test binary
///
/// # Panics
///
/// Panics if the container cannot be started
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::start()
                    .await
                    .expect("Failed to start shared MySQL container"),
            )
        })
        .await
        .clone()
}

/// Declares an ignored `#[tokio::test]` that receives its own [`TestDatabase`]
///
/// ```rust,ignore
/// db_test!(test_insert, |db| {
///     let executor = db.executor();
/// });
/// ```
#[macro_export]
macro_rules! db_test {
    ($name:ident, |$db:ident| $body:block) => {
        #[tokio::test]
        #[ignore = "requires docker"]
        async fn $name() {
            let $db = $crate::database::TestDatabase::start()
                .await
                .expect("Failed to start MySQL container");
            $body
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_url() {
        assert_eq!(mysql_url("127.0.0.1", 49153), "mysql://root@127.0.0.1:49153/test");
    }

    #[test]
    fn test_schema_statements() {
        let statements = schema_statements(INITIAL_SCHEMA);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS cities"));
        assert!(statements[1].contains("UNIQUE KEY idx_user_city (id, city)"));
    }
}
