//! Repository error types

use thiserror::Error;

use crate::duplicate::DuplicateEntry;
use crate::ports::ExecutorError;
use crate::query_params::QueryParamsError;

/// Errors returned by repository operations
///
/// Executor failures are normalised: a missing row becomes `NotFound`, a
/// duplicate-key violation on create becomes `DuplicateKey`, and anything
/// else is passed through unchanged as `Unclassified`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("duplicated key not allowed")]
    DuplicateKey {
        /// Table named by the violated key
        table: String,
        /// Values of the duplicated entry
        values: Vec<String>,
    },

    #[error(transparent)]
    Unclassified(ExecutorError),

    #[error("Invalid query parameters: {0}")]
    InvalidQuery(#[from] QueryParamsError),

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Refusing to update or delete without conditions")]
    MissingWhereClause,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound)
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, RepositoryError::DuplicateKey { .. })
    }
}

impl From<ExecutorError> for RepositoryError {
    fn from(error: ExecutorError) -> Self {
        match error {
            ExecutorError::NotFound => RepositoryError::NotFound,
            other => RepositoryError::Unclassified(other),
        }
    }
}

impl From<DuplicateEntry> for RepositoryError {
    fn from(entry: DuplicateEntry) -> Self {
        RepositoryError::DuplicateKey {
            table: entry.table,
            values: entry.values,
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(error: serde_json::Error) -> Self {
        RepositoryError::Serialization(error.to_string())
    }
}
