//! Generic CRUD repository
//!
//! [`CommonRepository`] implements [`CommonRepositoryPort`] once for every
//! [`Record`] type. It validates attribute names against the record's
//! columns, builds a [`Query`], and delegates execution to a
//! [`QueryExecutor`].
//!
//! # Example
//!
//! ```rust,ignore
//! use repository_core::{Attributes, CommonRepository, CommonRepositoryPort, QueryParams};
//!
//! let users = CommonRepository::<User, _>::new("users", executor);
//!
//! let created = users.create_record(user).await?;
//! let found = users.get_record_by_id(created.id.into()).await?;
//!
//! let params = QueryParams::from_query_string("name.like=bon&limit=20");
//! let page = users.get_page(&params).await?;
//! ```

use async_trait::async_trait;
use std::marker::PhantomData;
use tracing::{debug, instrument};

use crate::duplicate::classify_error;
use crate::error::RepositoryError;
use crate::ports::{ExecutorError, QueryExecutor, Record};
use crate::query::{Predicate, Query};
use crate::query_params::{QueryParams, SortDirection};
use crate::response::PageResponse;
use crate::value::{AttributeValues, Attributes, Row, Value};

/// Common database operations for any record type
#[async_trait]
pub trait CommonRepositoryPort<M: Record>: Send + Sync {
    /// Inserts one record and returns it as stored
    ///
    /// A primary key left NULL or zero is replaced by the key the database
    /// generated. A unique constraint violation is reported as
    /// [`RepositoryError::DuplicateKey`].
    async fn create_record(&self, record: M) -> Result<M, RepositoryError>;

    /// Inserts several records in one statement and returns them as stored
    async fn create_bulk_records(&self, records: Vec<M>) -> Result<Vec<M>, RepositoryError>;

    /// Retrieves a record by primary key, or `NotFound`
    async fn get_record_by_id(&self, id: Value) -> Result<M, RepositoryError>;

    /// Retrieves the first record matching every attribute, or `NotFound`
    async fn get_record_by_attributes(&self, attributes: Attributes) -> Result<M, RepositoryError>;

    /// Retrieves every record whose primary key is in `ids`
    async fn get_records_for_multiple_ids(&self, ids: Vec<Value>) -> Result<Vec<M>, RepositoryError>;

    /// Retrieves every record whose columns are in the given value lists
    async fn get_records_by_multiple_attribute_values(
        &self,
        values: AttributeValues,
    ) -> Result<Vec<M>, RepositoryError>;

    /// Retrieves every record in the table
    async fn get_all_records(&self) -> Result<Vec<M>, RepositoryError>;

    /// Retrieves a filtered, sorted page of records
    ///
    /// With `None` the whole table is returned unfiltered.
    async fn get_records_by_query_params(
        &self,
        params: Option<&QueryParams>,
    ) -> Result<Vec<M>, RepositoryError>;

    /// Counts the records matching the filters, ignoring page and sort
    async fn get_record_count(&self, params: Option<&QueryParams>) -> Result<u64, RepositoryError>;

    /// Retrieves a page of records together with the total count
    async fn get_page(&self, params: &QueryParams) -> Result<PageResponse<M>, RepositoryError>;

    /// Updates the columns in `data` on the record with primary key `id`
    async fn update_record_by_id(&self, id: Value, data: Attributes) -> Result<(), RepositoryError>;

    /// Updates the columns in `data` on every record matching `filter`
    ///
    /// The affected row count is not checked: matching nothing succeeds.
    async fn update_records_by_attributes(
        &self,
        filter: Attributes,
        data: Attributes,
    ) -> Result<(), RepositoryError>;

    /// Deletes the record with primary key `id`, or `NotFound`
    async fn delete_record_by_id(&self, id: Value) -> Result<(), RepositoryError>;

    /// Deletes every record matching `filter`; `NotFound` when none matched
    async fn delete_records_by_attributes(&self, filter: Attributes) -> Result<(), RepositoryError>;
}

/// Repository for one table, generic over record type and executor
pub struct CommonRepository<M, E> {
    table_name: String,
    executor: E,
    _record: PhantomData<fn() -> M>,
}

impl<M, E: Clone> Clone for CommonRepository<M, E> {
    fn clone(&self) -> Self {
        Self {
            table_name: self.table_name.clone(),
            executor: self.executor.clone(),
            _record: PhantomData,
        }
    }
}

impl<M, E> std::fmt::Debug for CommonRepository<M, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommonRepository")
            .field("table_name", &self.table_name)
            .field("record", &std::any::type_name::<M>())
            .finish()
    }
}

impl<M: Record, E: QueryExecutor> CommonRepository<M, E> {
    /// Creates a repository over `table_name` using `executor`
    pub fn new(table_name: impl Into<String>, executor: E) -> Self {
        Self {
            table_name: table_name.into(),
            executor,
            _record: PhantomData,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn query(&self) -> Query {
        Query::table(self.table_name.clone())
    }

    fn check_column(column: &str) -> Result<(), RepositoryError> {
        if M::has_column(column) {
            Ok(())
        } else {
            Err(RepositoryError::UnknownColumn(column.to_string()))
        }
    }

    fn where_attributes(&self, attributes: &Attributes) -> Result<Query, RepositoryError> {
        attributes.iter().try_fold(self.query(), |query, (column, value)| {
            Self::check_column(column)?;
            Ok(query.filter(Predicate::eq(column, value.clone())))
        })
    }

    fn where_in(&self, values: &AttributeValues) -> Result<Query, RepositoryError> {
        values.iter().try_fold(self.query(), |query, (column, candidates)| {
            Self::check_column(column)?;
            Ok(query.filter(Predicate::In {
                column: column.to_string(),
                values: candidates.to_vec(),
            }))
        })
    }

    fn filtered(&self, params: &QueryParams) -> Result<Query, RepositoryError> {
        params.validate(M::COLUMNS)?;
        Ok(self
            .query()
            .scopes([&params.filter_modifier(&self.table_name)]))
    }

    /// Classifies a failed insert; duplicates lose the driver message
    fn insert_error(error: ExecutorError) -> RepositoryError {
        match classify_error(&error) {
            Some(entry) => entry.into(),
            None => error.into(),
        }
    }

    /// Gives an unset primary key the next generated id
    ///
    /// Generated ids are consumed in order by the rows that asked for one.
    fn fill_generated_key(
        record: M,
        mut row: Row,
        generated: &mut Option<u64>,
    ) -> Result<M, RepositoryError> {
        let unset = row.get(M::PRIMARY_KEY).map_or(true, Value::is_unset_key);
        match *generated {
            Some(id) if unset => {
                row.insert(M::PRIMARY_KEY.to_string(), Value::generated_key(id));
                *generated = id.checked_add(1);
                from_row(row)
            }
            _ => Ok(record),
        }
    }

    async fn fetch_all(&self, query: &Query) -> Result<Vec<M>, RepositoryError> {
        let rows = self.executor.select(query).await?;
        rows.into_iter().map(from_row).collect()
    }
}

#[async_trait]
impl<M: Record, E: QueryExecutor> CommonRepositoryPort<M> for CommonRepository<M, E> {
    #[instrument(skip(self, record), fields(table = %self.table_name))]
    async fn create_record(&self, record: M) -> Result<M, RepositoryError> {
        debug!("Creating record");
        let row = to_row(&record)?;
        let outcome = self
            .executor
            .insert(&self.table_name, std::slice::from_ref(&row))
            .await
            .map_err(Self::insert_error)?;
        debug!(generated_id = ?outcome.generated_id, "Record created");
        let mut generated = outcome.generated_id;
        Self::fill_generated_key(record, row, &mut generated)
    }

    #[instrument(skip(self, records), fields(table = %self.table_name, count = records.len()))]
    async fn create_bulk_records(&self, records: Vec<M>) -> Result<Vec<M>, RepositoryError> {
        if records.is_empty() {
            return Ok(records);
        }
        debug!("Creating records in bulk");
        let rows = records.iter().map(to_row).collect::<Result<Vec<_>, _>>()?;
        let outcome = self
            .executor
            .insert(&self.table_name, &rows)
            .await
            .map_err(Self::insert_error)?;
        let mut generated = outcome.generated_id;
        records
            .into_iter()
            .zip(rows)
            .map(|(record, row)| Self::fill_generated_key(record, row, &mut generated))
            .collect()
    }

    async fn get_record_by_id(&self, id: Value) -> Result<M, RepositoryError> {
        self.get_record_by_attributes(Attributes::new().with(M::PRIMARY_KEY, id))
            .await
    }

    #[instrument(skip(self, attributes), fields(table = %self.table_name))]
    async fn get_record_by_attributes(&self, attributes: Attributes) -> Result<M, RepositoryError> {
        debug!(?attributes, "Fetching first record by attributes");
        let query = self
            .where_attributes(&attributes)?
            .order_by(M::PRIMARY_KEY, SortDirection::Ascending)
            .limit(1);
        let row = self.executor.first(&query).await?;
        from_row(row)
    }

    async fn get_records_for_multiple_ids(&self, ids: Vec<Value>) -> Result<Vec<M>, RepositoryError> {
        self.get_records_by_multiple_attribute_values(AttributeValues::new().with(M::PRIMARY_KEY, ids))
            .await
    }

    #[instrument(skip(self, values), fields(table = %self.table_name))]
    async fn get_records_by_multiple_attribute_values(
        &self,
        values: AttributeValues,
    ) -> Result<Vec<M>, RepositoryError> {
        debug!(?values, "Fetching records by attribute values");
        let query = self.where_in(&values)?;
        self.fetch_all(&query).await
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn get_all_records(&self) -> Result<Vec<M>, RepositoryError> {
        debug!("Fetching all records");
        self.fetch_all(&self.query()).await
    }

    #[instrument(skip(self, params), fields(table = %self.table_name))]
    async fn get_records_by_query_params(
        &self,
        params: Option<&QueryParams>,
    ) -> Result<Vec<M>, RepositoryError> {
        let query = match params {
            Some(params) => {
                debug!(?params, "Fetching records by query params");
                self.filtered(params)?
                    .scopes([&params.pagination_modifier(), &params.sort_modifier()])
            }
            None => self.query(),
        };
        self.fetch_all(&query).await
    }

    #[instrument(skip(self, params), fields(table = %self.table_name))]
    async fn get_record_count(&self, params: Option<&QueryParams>) -> Result<u64, RepositoryError> {
        let query = match params {
            Some(params) => self.filtered(params)?,
            None => self.query(),
        };
        Ok(self.executor.count(&query).await?)
    }

    async fn get_page(&self, params: &QueryParams) -> Result<PageResponse<M>, RepositoryError> {
        let data = self.get_records_by_query_params(Some(params)).await?;
        let total = self.get_record_count(Some(params)).await?;
        Ok(PageResponse::new(data, total, params))
    }

    async fn update_record_by_id(&self, id: Value, data: Attributes) -> Result<(), RepositoryError> {
        self.update_records_by_attributes(Attributes::new().with(M::PRIMARY_KEY, id), data)
            .await
    }

    #[instrument(skip(self, filter, data), fields(table = %self.table_name))]
    async fn update_records_by_attributes(
        &self,
        filter: Attributes,
        data: Attributes,
    ) -> Result<(), RepositoryError> {
        if filter.is_empty() {
            return Err(RepositoryError::MissingWhereClause);
        }
        if data.is_empty() {
            return Ok(());
        }
        for column in data.columns() {
            Self::check_column(column)?;
        }
        let query = self.where_attributes(&filter)?;
        let affected = self.executor.update(&query, &data.to_row()).await?;
        debug!(affected, "Updated records");
        Ok(())
    }

    async fn delete_record_by_id(&self, id: Value) -> Result<(), RepositoryError> {
        self.delete_records_by_attributes(Attributes::new().with(M::PRIMARY_KEY, id))
            .await
    }

    #[instrument(skip(self, filter), fields(table = %self.table_name))]
    async fn delete_records_by_attributes(&self, filter: Attributes) -> Result<(), RepositoryError> {
        if filter.is_empty() {
            return Err(RepositoryError::MissingWhereClause);
        }
        let query = self.where_attributes(&filter)?;
        let affected = self.executor.delete(&query).await?;
        debug!(affected, "Deleted records");
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Serializes a record into a row of column values
pub fn to_row<M: Record>(record: &M) -> Result<Row, RepositoryError> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(column, value)| (column, Value::from_json(value)))
            .collect()),
        other => Err(RepositoryError::Serialization(format!(
            "record must serialize to an object, got {}",
            other
        ))),
    }
}

/// Deserializes a record from a row of column values
pub fn from_row<M: Record>(row: Row) -> Result<M, RepositoryError> {
    let map: serde_json::Map<String, serde_json::Value> = row
        .into_iter()
        .map(|(column, value)| (column, value.into_json()))
        .collect();
    Ok(serde_json::from_value(serde_json::Value::Object(map))?)
}
