//! Shared helpers for the repository test suites
//!
//! - [`fixtures`]: the `users`/`cities` records, seed rows, and in-memory
//!   executors carrying the schema's unique indexes
//! - [`builders`]: `with_*` builders for users and query parameters
//! - [`generators`]: proptest strategies
//! - [`assertions`]: checks on `RepositoryError` results and record order
//! - [`database`]: MySQL testcontainers and the `db_test!` macro

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::{get_shared_test_database, mysql_url, SetupError, TestDatabase};
pub use fixtures::*;
pub use generators::*;
