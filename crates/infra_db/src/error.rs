//! Database error types
//!
//! This module defines the errors raised by the MySQL adapter and their
//! translation into the [`ExecutorError`] vocabulary the repository
//! understands.

use repository_core::ExecutorError;
use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

/// Errors that can occur in the MySQL adapter
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    /// A table or column name contains characters that cannot be quoted safely
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// An insert was issued with rows of differing columns
    #[error("Invalid insert: {0}")]
    InvalidInsert(String),

    /// A column could not be converted into a value
    #[error("Failed to decode column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Tracing could not be initialised
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Error reported by SQLx
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        match self {
            DatabaseError::ConnectionFailed(_) => true,
            DatabaseError::SqlError(e) => is_connection_failure(e),
            _ => false,
        }
    }
}

fn is_connection_failure(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed
    )
}

/// Renders a server error the way the MySQL client library does:
/// `Error <number> (<sqlstate>): <message>`
pub fn mysql_error_message(error: &MySqlDatabaseError) -> String {
    format!(
        "Error {} ({}): {}",
        error.number(),
        error.code().unwrap_or("HY000"),
        error.message()
    )
}

impl From<DatabaseError> for ExecutorError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::SqlError(sqlx::Error::RowNotFound) => ExecutorError::NotFound,
            DatabaseError::SqlError(sqlx::Error::Database(db_err)) => {
                match db_err.try_downcast_ref::<MySqlDatabaseError>() {
                    Some(mysql) => ExecutorError::database(mysql_error_message(mysql)),
                    None => ExecutorError::database(db_err.message()),
                }
            }
            DatabaseError::SqlError(e) if is_connection_failure(&e) => {
                ExecutorError::Connection(e.to_string())
            }
            DatabaseError::SqlError(
                e @ (sqlx::Error::ColumnDecode { .. }
                | sqlx::Error::ColumnNotFound(_)
                | sqlx::Error::Decode(_)),
            ) => ExecutorError::Decode(e.to_string()),
            DatabaseError::SqlError(e) => ExecutorError::database(e.to_string()),
            DatabaseError::ConnectionFailed(message) => ExecutorError::Connection(message),
            DatabaseError::Decode { .. } => ExecutorError::Decode(error.to_string()),
            other => ExecutorError::database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let error: ExecutorError = DatabaseError::SqlError(sqlx::Error::RowNotFound).into();
        assert_eq!(error, ExecutorError::NotFound);
    }

    #[test]
    fn test_pool_timeout_maps_to_connection() {
        let error = DatabaseError::SqlError(sqlx::Error::PoolTimedOut);
        assert!(error.is_connection_error());
        assert!(matches!(ExecutorError::from(error), ExecutorError::Connection(_)));
    }

    #[test]
    fn test_invalid_identifier_is_reported_as_database_error() {
        let error: ExecutorError = DatabaseError::InvalidIdentifier("a b".to_string()).into();
        assert_eq!(error.to_string(), "Invalid identifier 'a b'");
    }

    #[test]
    fn test_decode_maps_to_decode() {
        let error: ExecutorError = DatabaseError::Decode {
            column: "age".to_string(),
            message: "unexpected type".to_string(),
        }
        .into();
        assert!(matches!(error, ExecutorError::Decode(_)));
    }
}
