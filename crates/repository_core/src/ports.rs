//! Ports to the query-execution layer
//!
//! The repository never talks to a database driver directly. It hands a
//! [`Query`] to a [`QueryExecutor`] and receives rows, counts, or an
//! [`ExecutorError`]. Connection pooling, locking and transactions belong to
//! the executor.
//!
//! ```text
//! CommonRepository<M, E> ──► QueryExecutor ──► MySqlExecutor   (infra_db)
//!                                        └──► InMemoryExecutor (mock)
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::query::Query;
use crate::value::Row;

/// Failure reported by a [`QueryExecutor`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    /// No row matched a single-row read
    #[error("record not found")]
    NotFound,

    /// The database rejected the statement; the message is the driver's text
    #[error("{message}")]
    Database { message: String },

    /// The executor could not reach the database
    #[error("Connection error: {0}")]
    Connection(String),

    /// A row could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ExecutorError {
    pub fn database(message: impl Into<String>) -> Self {
        ExecutorError::Database {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ExecutorError::NotFound)
    }
}

/// Result of an insert statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub rows_affected: u64,
    /// First auto-increment key generated by the statement
    ///
    /// Rows of a multi-row insert that had no key received consecutive
    /// values starting here. `None` when no key was generated.
    pub generated_id: Option<u64>,
}

/// A row-shaped entity managed by a repository
///
/// Records are marshalled through `serde`: each serialized field is a
/// column. `COLUMNS` is the allow-list every attribute name, sort column,
/// and filter attribute is checked against.
///
/// # Example
///
/// ```rust
/// use repository_core::Record;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct City {
///     id: i64,
///     name: String,
/// }
///
/// impl Record for City {
///     const COLUMNS: &'static [&'static str] = &["id", "name"];
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Columns that may be referenced by callers
    const COLUMNS: &'static [&'static str];

    /// Primary key column used by the `*_by_id` operations
    const PRIMARY_KEY: &'static str = "id";

    /// Returns true when `column` is part of the allow-list
    fn has_column(column: &str) -> bool {
        Self::COLUMNS.iter().any(|c| *c == column)
    }
}

/// The query-execution capability the repository delegates to
///
/// Implementations must be safe to share between tasks; the repository
/// adds no synchronisation of its own.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Inserts rows into `table` in one statement
    async fn insert(&self, table: &str, rows: &[Row]) -> Result<InsertOutcome, ExecutorError>;

    /// Returns every row matching the query
    async fn select(&self, query: &Query) -> Result<Vec<Row>, ExecutorError>;

    /// Returns the first matching row or [`ExecutorError::NotFound`]
    async fn first(&self, query: &Query) -> Result<Row, ExecutorError>;

    /// Counts rows matching the query's predicates
    async fn count(&self, query: &Query) -> Result<u64, ExecutorError>;

    /// Sets `data` on every matching row, returning the affected count
    async fn update(&self, query: &Query, data: &Row) -> Result<u64, ExecutorError>;

    /// Deletes every matching row, returning the affected count
    async fn delete(&self, query: &Query) -> Result<u64, ExecutorError>;
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> QueryExecutor for std::sync::Arc<E> {
    async fn insert(&self, table: &str, rows: &[Row]) -> Result<InsertOutcome, ExecutorError> {
        (**self).insert(table, rows).await
    }

    async fn select(&self, query: &Query) -> Result<Vec<Row>, ExecutorError> {
        (**self).select(query).await
    }

    async fn first(&self, query: &Query) -> Result<Row, ExecutorError> {
        (**self).first(query).await
    }

    async fn count(&self, query: &Query) -> Result<u64, ExecutorError> {
        (**self).count(query).await
    }

    async fn update(&self, query: &Query, data: &Row) -> Result<u64, ExecutorError> {
        (**self).update(query, data).await
    }

    async fn delete(&self, query: &Query) -> Result<u64, ExecutorError> {
        (**self).delete(query).await
    }
}
