//! Infrastructure Database Layer
//!
//! This crate provides the MySQL implementation of the common repository's
//! [`QueryExecutor`](repository_core::QueryExecutor) port using SQLx.
//!
//! # Architecture
//!
//! - [`pool`]: connection pool configuration, from code or `DATABASE_*` env vars
//! - [`sql`]: rendering of repository queries into bound MySQL statements
//! - [`executor`]: the [`MySqlExecutor`] adapter and row decoding
//! - [`error`]: adapter errors and their translation for the repository
//! - [`telemetry`]: tracing subscriber setup
//!
//! Server errors are rendered as `Error <number> (<sqlstate>): <message>`,
//! the form the repository's duplicate-key classifier recognises.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, MySqlExecutor};
//! use repository_core::{CommonRepository, CommonRepositoryPort};
//!
//! let pool = create_pool(DatabaseConfig::from_env()?).await?;
//! let repo: CommonRepository<User, _> = CommonRepository::new("users", MySqlExecutor::new(pool));
//! let user = repo.get_record_by_id(1.into()).await?;
//! ```

pub mod error;
pub mod executor;
pub mod pool;
pub mod sql;
pub mod telemetry;

pub use error::DatabaseError;
pub use executor::MySqlExecutor;
pub use pool::{create_pool, DatabaseConfig, DatabasePool};
pub use telemetry::init_tracing;
