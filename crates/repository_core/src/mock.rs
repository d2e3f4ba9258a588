//! In-memory query executor for tests
//!
//! Tables are vectors of rows behind a `tokio` lock. Predicates, ordering,
//! offset and limit are evaluated the way MySQL would for the simple
//! scalar values the repository uses. Unique indexes declared with
//! [`InMemoryExecutor::with_unique_index`] reject duplicates with the same
//! `Error 1062` message the MySQL driver produces. Columns declared with
//! [`InMemoryExecutor::with_auto_increment`] receive generated keys when a
//! row leaves them NULL or zero.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::ports::{ExecutorError, InsertOutcome, QueryExecutor};
use crate::query::{CompareOp, Predicate, Query};
use crate::query_params::SortDirection;
use crate::value::{Row, Value};

#[derive(Debug, Clone)]
struct UniqueIndex {
    table: String,
    name: String,
    columns: Vec<String>,
}

#[derive(Debug, Clone)]
struct AutoIncrement {
    column: String,
    last: u64,
}

/// In-memory implementation of [`QueryExecutor`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryExecutor {
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
    indexes: Arc<RwLock<Vec<UniqueIndex>>>,
    counters: Arc<Mutex<HashMap<String, AutoIncrement>>>,
    next_failure: Arc<Mutex<Option<ExecutorError>>>,
}

impl InMemoryExecutor {
    /// Creates an executor with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a unique index; `name` appears in duplicate-key messages
    pub async fn with_unique_index(self, table: &str, name: &str, columns: &[&str]) -> Self {
        self.indexes.write().await.push(UniqueIndex {
            table: table.to_string(),
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    /// Declares `column` of `table` as an auto-increment key
    pub async fn with_auto_increment(self, table: &str, column: &str) -> Self {
        self.counters.lock().await.insert(
            table.to_string(),
            AutoIncrement {
                column: column.to_string(),
                last: 0,
            },
        );
        self
    }

    /// Pre-populates a table, bypassing unique checks
    pub async fn seed(&self, table: &str, rows: Vec<Row>) {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Makes the next call fail with `error`
    pub async fn fail_next(&self, error: ExecutorError) {
        *self.next_failure.lock().await = Some(error);
    }

    /// Returns a copy of every row in `table`
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    async fn take_failure(&self) -> Result<(), ExecutorError> {
        match self.next_failure.lock().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn matching(&self, query: &Query) -> Vec<Row> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.table, &query.predicates))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if !query.order.is_empty() {
            rows.sort_by(|a, b| {
                query
                    .order
                    .iter()
                    .map(|term| {
                        let left = cell(a, &query.table, &term.column);
                        let right = cell(b, &query.table, &term.column);
                        let ordering = compare_for_sort(left, right);
                        match term.direction {
                            SortDirection::Ascending => ordering,
                            SortDirection::Descending => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        rows.into_iter().skip(offset).take(limit).collect()
    }

    fn duplicate_of(
        indexes: &[UniqueIndex],
        table: &str,
        existing: &[Row],
        row: &Row,
    ) -> Option<ExecutorError> {
        indexes
            .iter()
            .filter(|index| index.table == table)
            .find_map(|index| {
                let key: Vec<&Value> = index
                    .columns
                    .iter()
                    .map(|c| row.get(c).unwrap_or(&Value::Null))
                    .collect();
                if key.iter().any(|v| v.is_null()) {
                    return None;
                }
                let clash = existing.iter().any(|other| {
                    index
                        .columns
                        .iter()
                        .zip(&key)
                        .all(|(c, v)| other.get(c) == Some(*v))
                });
                clash.then(|| {
                    let entry = key
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join("-");
                    ExecutorError::database(format!(
                        "Error 1062 (23000): Duplicate entry '{}' for key '{}.{}'",
                        entry, table, index.name
                    ))
                })
            })
    }
}

#[async_trait]
impl QueryExecutor for InMemoryExecutor {
    async fn insert(&self, table: &str, rows: &[Row]) -> Result<InsertOutcome, ExecutorError> {
        self.take_failure().await?;
        let indexes = self.indexes.read().await;
        let mut tables = self.tables.write().await;
        let existing = tables.entry(table.to_string()).or_default();

        let mut counters = self.counters.lock().await;
        let mut counter = counters.get(table).cloned();

        // All-or-nothing, like a single multi-row INSERT
        let mut staged: Vec<Row> = existing.clone();
        let mut generated_id = None;
        for row in rows {
            let mut row = row.clone();
            if let Some(counter) = counter.as_mut() {
                let column = counter.column.clone();
                let current = row.get(&column).cloned().unwrap_or(Value::Null);
                if current.is_unset_key() {
                    let id = staged
                        .iter()
                        .filter_map(|other| other.get(&column).and_then(key_of))
                        .fold(counter.last, u64::max)
                        + 1;
                    counter.last = id;
                    generated_id.get_or_insert(id);
                    row.insert(column, Value::generated_key(id));
                } else if let Some(id) = key_of(&current) {
                    counter.last = counter.last.max(id);
                }
            }
            if let Some(error) = Self::duplicate_of(&indexes, table, &staged, &row) {
                return Err(error);
            }
            staged.push(row);
        }
        *existing = staged;
        if let Some(counter) = counter {
            counters.insert(table.to_string(), counter);
        }
        Ok(InsertOutcome {
            rows_affected: rows.len() as u64,
            generated_id,
        })
    }

    async fn select(&self, query: &Query) -> Result<Vec<Row>, ExecutorError> {
        self.take_failure().await?;
        Ok(self.matching(query).await)
    }

    async fn first(&self, query: &Query) -> Result<Row, ExecutorError> {
        self.take_failure().await?;
        self.matching(query)
            .await
            .into_iter()
            .next()
            .ok_or(ExecutorError::NotFound)
    }

    async fn count(&self, query: &Query) -> Result<u64, ExecutorError> {
        self.take_failure().await?;
        let query = query.clone().without_window();
        Ok(self.matching(&query).await.len() as u64)
    }

    async fn update(&self, query: &Query, data: &Row) -> Result<u64, ExecutorError> {
        self.take_failure().await?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&query.table) else {
            return Ok(0);
        };
        let mut affected = 0;
        for row in rows
            .iter_mut()
            .filter(|row| matches_all(row, &query.table, &query.predicates))
        {
            for (column, value) in data {
                row.insert(column.clone(), value.clone());
            }
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, query: &Query) -> Result<u64, ExecutorError> {
        self.take_failure().await?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&query.table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !matches_all(row, &query.table, &query.predicates));
        Ok((before - rows.len()) as u64)
    }
}

fn key_of(value: &Value) -> Option<u64> {
    match value {
        Value::Int(n) => u64::try_from(*n).ok(),
        Value::UInt(n) => Some(*n),
        _ => None,
    }
}

/// Resolves `column`, accepting a `table.column` qualified name
fn cell<'a>(row: &'a Row, table: &str, column: &str) -> &'a Value {
    let column = column
        .strip_prefix(table)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(column);
    row.get(column).unwrap_or(&Value::Null)
}

fn matches_all(row: &Row, table: &str, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|predicate| matches(row, table, predicate))
}

fn matches(row: &Row, table: &str, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Compare { column, op, value } => {
            let Some(ordering) = cell(row, table, column).sql_cmp(value) else {
                return false;
            };
            match op {
                CompareOp::Eq => ordering == Ordering::Equal,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Gte => ordering != Ordering::Less,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Lte => ordering != Ordering::Greater,
            }
        }
        Predicate::Like { column, pattern } => {
            let cell = cell(row, table, column);
            !cell.is_null() && like(&cell.to_string().to_lowercase(), &pattern.to_lowercase())
        }
        Predicate::In { column, values } => {
            let cell = cell(row, table, column);
            values
                .iter()
                .any(|v| cell.sql_cmp(v) == Some(Ordering::Equal))
        }
    }
}

/// `LIKE` matching with `%` and `_` wildcards, case-insensitive like MySQL's default collation
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

/// NULLs sort first, as in MySQL ascending order
fn compare_for_sort(left: &Value, right: &Value) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => left.sql_cmp(right).unwrap_or(Ordering::Equal),
    }
}
