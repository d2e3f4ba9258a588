//! Repository Core - generic data access over a query-execution port
//!
//! This crate provides the building blocks shared by every repository:
//! - Duplicate-key classification of database error messages
//! - Pagination, sorting and filter parameters parsed from request input
//! - Composable scopes that shape a backend-neutral [`Query`]
//! - A generic CRUD repository parameterized by record type
//!
//! The database itself sits behind the [`QueryExecutor`] port. `infra_db`
//! provides the MySQL adapter; the `mock` feature provides an in-memory one.

pub mod duplicate;
pub mod error;
pub mod ports;
pub mod query;
pub mod query_params;
pub mod repository;
pub mod response;
pub mod value;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use duplicate::{classify_error, parse_duplicate_entry, DuplicateEntry};
pub use error::RepositoryError;
pub use ports::{ExecutorError, InsertOutcome, QueryExecutor, Record};
pub use query::{CompareOp, OrderBy, Predicate, Query, Scope};
pub use query_params::{
    FilterAction, FilterParam, Page, QueryParams, QueryParamsError, Sort, SortDirection,
    UnknownFilterAction,
};
pub use repository::{CommonRepository, CommonRepositoryPort};
pub use response::PageResponse;
pub use value::{AttributeValues, Attributes, Row, Value};
