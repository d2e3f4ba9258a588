//! MySQL Query Executor
//!
//! [`MySqlExecutor`] is the database-backed implementation of the
//! repository's [`QueryExecutor`] port. Queries are rendered by
//! [`crate::sql`], executed on a shared [`DatabasePool`], and result rows are
//! decoded column by column into [`Row`] maps.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, MySqlExecutor};
//! use repository_core::CommonRepository;
//!
//! let pool = create_pool(DatabaseConfig::from_env()?).await?;
//! let users: CommonRepository<User, _> = CommonRepository::new("users", MySqlExecutor::new(pool));
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use tracing::{debug, instrument};

use repository_core::{ExecutorError, InsertOutcome, Query, QueryExecutor, Row, Value};

use crate::error::DatabaseError;
use crate::pool::DatabasePool;
use crate::sql;

/// Executes repository queries against MySQL
#[derive(Debug, Clone)]
pub struct MySqlExecutor {
    pool: DatabasePool,
}

impl MySqlExecutor {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Verifies the pool can reach the server with `SELECT 1`
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn fetch_rows(&self, query: &Query) -> Result<Vec<Row>, DatabaseError> {
        let mut builder = sql::select(query)?;
        debug!(sql = builder.sql(), "select");
        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_first(&self, query: &Query) -> Result<Row, DatabaseError> {
        let query = query.clone().limit(1);
        let mut builder = sql::select(&query)?;
        debug!(sql = builder.sql(), "first");
        match builder.build().fetch_optional(&self.pool).await? {
            Some(row) => decode_row(&row),
            None => Err(DatabaseError::SqlError(sqlx::Error::RowNotFound)),
        }
    }

    async fn fetch_count(&self, query: &Query) -> Result<u64, DatabaseError> {
        let mut builder = sql::count(query)?;
        debug!(sql = builder.sql(), "count");
        let count: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn execute(
        &self,
        mut builder: sqlx::QueryBuilder<'static, sqlx::MySql>,
    ) -> Result<u64, DatabaseError> {
        debug!(sql = builder.sql(), "execute");
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    #[instrument(skip(self, rows), fields(table = %table, count = rows.len()))]
    async fn insert(&self, table: &str, rows: &[Row]) -> Result<InsertOutcome, ExecutorError> {
        if rows.is_empty() {
            return Ok(InsertOutcome::default());
        }
        let mut builder = sql::insert(table, rows)?;
        debug!(sql = builder.sql(), "insert");
        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        // Zero means the statement generated no key
        Ok(InsertOutcome {
            rows_affected: result.rows_affected(),
            generated_id: Some(result.last_insert_id()).filter(|id| *id > 0),
        })
    }

    #[instrument(skip(self, query), fields(table = %query.table))]
    async fn select(&self, query: &Query) -> Result<Vec<Row>, ExecutorError> {
        Ok(self.fetch_rows(query).await?)
    }

    #[instrument(skip(self, query), fields(table = %query.table))]
    async fn first(&self, query: &Query) -> Result<Row, ExecutorError> {
        Ok(self.fetch_first(query).await?)
    }

    #[instrument(skip(self, query), fields(table = %query.table))]
    async fn count(&self, query: &Query) -> Result<u64, ExecutorError> {
        Ok(self.fetch_count(query).await?)
    }

    #[instrument(skip(self, query, data), fields(table = %query.table))]
    async fn update(&self, query: &Query, data: &Row) -> Result<u64, ExecutorError> {
        if data.is_empty() {
            return Ok(0);
        }
        let builder = sql::update(query, data)?;
        Ok(self.execute(builder).await?)
    }

    #[instrument(skip(self, query), fields(table = %query.table))]
    async fn delete(&self, query: &Query) -> Result<u64, ExecutorError> {
        let builder = sql::delete(query)?;
        Ok(self.execute(builder).await?)
    }
}

/// Decodes every column of a result row by its MySQL type
pub fn decode_row(row: &MySqlRow) -> Result<Row, DatabaseError> {
    row.columns()
        .iter()
        .map(|column| {
            let value = decode_column(row, column.ordinal())?;
            Ok((column.name().to_string(), value))
        })
        .collect()
}

fn decode_column(row: &MySqlRow, index: usize) -> Result<Value, DatabaseError> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::Int(row.try_get::<i64, _>(index)?)
        }
        name if name.ends_with("UNSIGNED") => Value::UInt(row.try_get::<u64, _>(index)?),
        "FLOAT" => Value::Float(f64::from(row.try_get::<f32, _>(index)?)),
        "DOUBLE" => Value::Float(row.try_get::<f64, _>(index)?),
        "DECIMAL" => Value::Text(row.try_get::<Decimal, _>(index)?.to_string()),
        "DATETIME" => Value::Text(
            row.try_get::<NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "TIMESTAMP" => Value::Text(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
        "DATE" => Value::Text(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        _ => match row.try_get::<String, _>(index) {
            Ok(text) => Value::Text(text),
            Err(_) => {
                let bytes = row
                    .try_get::<Vec<u8>, _>(index)
                    .map_err(|e| DatabaseError::Decode {
                        column: row.columns()[index].name().to_string(),
                        message: format!("unsupported type {}: {}", type_name, e),
                    })?;
                Value::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
        },
    };
    Ok(value)
}
