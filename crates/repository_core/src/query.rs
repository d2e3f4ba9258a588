//! Backend-neutral query description and composable scopes
//!
//! A [`Query`] names a table and carries AND-combined predicates, an
//! ordering, and an optional offset and limit. Executors translate it into
//! their own dialect. Scopes are reusable `Query -> Query` transformations
//! applied before execution.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::query_params::SortDirection;
use crate::value::Value;

/// A composable query transformation
pub type Scope = Box<dyn Fn(Query) -> Query + Send + Sync>;

/// Comparison operator of a [`Predicate::Compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// SQL spelling of the operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One filter condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// `column <op> value`
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// `column LIKE pattern`
    Like { column: String, pattern: String },
    /// `column IN (values...)`
    In { column: String, values: Vec<Value> },
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Compare { column, .. }
            | Predicate::Like { column, .. }
            | Predicate::In { column, .. } => column,
        }
    }
}

/// One `ORDER BY` term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// A query against a single table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub table: String,
    pub predicates: Vec<Predicate>,
    pub order: Vec<OrderBy>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl Query {
    /// Starts an unfiltered query over `table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            order: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// Appends a predicate; predicates are combined with AND
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Appends an ordering term
    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Applies the scopes in order
    pub fn scopes<'a, I>(self, scopes: I) -> Self
    where
        I: IntoIterator<Item = &'a Scope>,
    {
        scopes.into_iter().fold(self, |query, scope| scope(query))
    }

    /// Drops ordering, offset and limit, as used for counting
    pub fn without_window(mut self) -> Self {
        self.order.clear();
        self.offset = None;
        self.limit = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_apply_in_order() {
        let first: Scope = Box::new(|q: Query| q.limit(5));
        let second: Scope = Box::new(|q: Query| q.limit(7).offset(14));

        let query = Query::table("users").scopes([&first, &second]);
        assert_eq!(query.limit, Some(7));
        assert_eq!(query.offset, Some(14));
    }

    #[test]
    fn test_without_window_keeps_predicates() {
        let query = Query::table("users")
            .filter(Predicate::eq("name", "nafi"))
            .order_by("id", SortDirection::Ascending)
            .offset(10)
            .limit(10)
            .without_window();

        assert_eq!(query.predicates.len(), 1);
        assert!(query.order.is_empty());
        assert_eq!(query.offset, None);
        assert_eq!(query.limit, None);
    }
}
