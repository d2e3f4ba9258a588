//! Pagination, sorting and filtering parameters
//!
//! [`QueryParams`] is built once per request from untyped key/value input,
//! typically a URL query string:
//!
//! ```text
//! ?limit=20&page=2&sort_by=name&sort_direction=asc&name.like=bon&age.greater-than=18
//! ```
//!
//! The recognized keys `limit`, `page`, `sort_by` and `sort_direction` set
//! the page and sort. Any other key of the form `attribute.action` becomes a
//! [`FilterParam`]; segments after a second dot are ignored. The parameters then produce [`Scope`]s that shape a
//! [`Query`] before it is executed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::query::{CompareOp, Predicate, Query, Scope};
use crate::value::Value;

const PAGE_LIMIT_KEY: &str = "limit";
const PAGE_NUMBER_KEY: &str = "page";
const SORT_BY_KEY: &str = "sort_by";
const SORT_DIRECTION_KEY: &str = "sort_direction";

/// Errors raised by strict parsing and column validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryParamsError {
    #[error("Invalid value '{value}' for '{key}': expected a positive integer")]
    InvalidNumber { key: String, value: String },

    #[error("Invalid sort direction '{0}': expected 'asc' or 'desc'")]
    InvalidSortDirection(String),

    #[error("Unknown filter action '{action}' for attribute '{attribute}'")]
    UnknownFilterAction { attribute: String, action: String },

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
}

/// A filter action spelling outside the supported set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown filter action '{0}'")]
pub struct UnknownFilterAction(pub String);

/// Pagination settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    /// Requested page number, starting at 1
    pub number: u64,
    /// Number of items per page
    pub limit: u64,
}

impl Page {
    pub fn new(number: u64, limit: u64) -> Self {
        Self { number, limit }
    }

    /// Rows skipped before this page
    ///
    /// A page number of 0 is treated as the first page.
    pub fn offset(&self) -> u64 {
        self.number.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { number: 1, limit: 10 }
    }
}

/// Sorting direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for SortDirection {
    type Err = QueryParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Ascending)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Descending)
        } else {
            Err(QueryParamsError::InvalidSortDirection(s.to_string()))
        }
    }
}

/// Sorting settings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    /// Column to sort by
    pub by: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(by: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            by: by.into(),
            direction,
        }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            by: "created_at".to_string(),
            direction: SortDirection::Descending,
        }
    }
}

/// Filtering actions accepted after the dot of a filter key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterAction {
    Equals,
    Like,
    In,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
}

impl FilterAction {
    /// The spelling used in query keys
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterAction::Equals => "equals",
            FilterAction::Like => "like",
            FilterAction::In => "in",
            FilterAction::GreaterThan => "greater-than",
            FilterAction::GreaterThanEqual => "greater-than-equal",
            FilterAction::LessThan => "less-than",
            FilterAction::LessThanEqual => "less-than-equal",
        }
    }
}

impl fmt::Display for FilterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterAction {
    type Err = UnknownFilterAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(FilterAction::Equals),
            "like" => Ok(FilterAction::Like),
            "in" => Ok(FilterAction::In),
            "greater-than" => Ok(FilterAction::GreaterThan),
            "greater-than-equal" => Ok(FilterAction::GreaterThanEqual),
            "less-than" => Ok(FilterAction::LessThan),
            "less-than-equal" => Ok(FilterAction::LessThanEqual),
            other => Err(UnknownFilterAction(other.to_string())),
        }
    }
}

/// A single predicate over one attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterParam {
    pub attribute: String,
    pub action: FilterAction,
    pub value: String,
}

impl FilterParam {
    pub fn new(attribute: impl Into<String>, action: FilterAction, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            action,
            value: value.into(),
        }
    }

    /// Builds the predicate for this filter against `column`
    pub fn to_predicate(&self, column: String) -> Predicate {
        let value = self.value.clone();
        let compare = |op| Predicate::Compare {
            column: column.clone(),
            op,
            value: Value::Text(value.clone()),
        };
        match self.action {
            FilterAction::Equals => compare(CompareOp::Eq),
            FilterAction::GreaterThan => compare(CompareOp::Gt),
            FilterAction::GreaterThanEqual => compare(CompareOp::Gte),
            FilterAction::LessThan => compare(CompareOp::Lt),
            FilterAction::LessThanEqual => compare(CompareOp::Lte),
            FilterAction::Like => Predicate::Like {
                column: column.clone(),
                pattern: format!("%{}%", value),
            },
            FilterAction::In => Predicate::In {
                column: column.clone(),
                values: value.split(',').map(Value::from).collect(),
            },
        }
    }
}

/// Page, sort and filters for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub page: Page,
    pub sort: Sort,
    pub filter_params: Vec<FilterParam>,
}

impl QueryParams {
    pub fn new(page: Page, sort: Sort, filter_params: Vec<FilterParam>) -> Self {
        Self {
            page,
            sort,
            filter_params,
        }
    }

    /// Parses raw key/values leniently
    ///
    /// The last value of each key wins. Unparsable `page`, `limit` and
    /// `sort_direction` values leave the defaults in place, filter keys with
    /// an unknown action are dropped, and everything else is ignored.
    ///
    /// # Example
    ///
    /// ```rust
    /// use repository_core::{FilterAction, QueryParams, SortDirection};
    ///
    /// let params = QueryParams::parse([
    ///     ("limit", vec!["20"]),
    ///     ("page", vec!["2"]),
    ///     ("sort_by", vec!["name"]),
    ///     ("name.like", vec!["bon"]),
    /// ]);
    ///
    /// assert_eq!((params.page.number, params.page.limit), (2, 20));
    /// assert_eq!(params.sort.by, "name");
    /// assert_eq!(params.sort.direction, SortDirection::Descending);
    /// assert_eq!(params.filter_params[0].action, FilterAction::Like);
    /// ```
    pub fn parse<I, K, V, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut params = QueryParams::default();
        for (key, values) in raw {
            let Some(value) = values.into_iter().last().map(Into::into) else {
                continue;
            };
            // Lenient mode only drops input it cannot use
            let _ = params.apply(key.as_ref(), value, false);
        }
        params
    }

    /// Parses raw key/values, rejecting anything the lenient parser would drop
    ///
    /// Page numbers and limits must be positive integers, the sort direction
    /// must be `asc` or `desc`, and every filter key must name a known action.
    pub fn try_parse<I, K, V, S>(raw: I) -> Result<Self, QueryParamsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut params = QueryParams::default();
        for (key, values) in raw {
            let Some(value) = values.into_iter().last().map(Into::into) else {
                continue;
            };
            params.apply(key.as_ref(), value, true)?;
        }
        Ok(params)
    }

    /// Decodes a URL query string and parses it leniently
    ///
    /// Repeated keys are grouped in first-seen order, so the last occurrence
    /// of a key is the one honored.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match grouped.iter_mut().find(|(k, _)| *k == key) {
                Some((_, values)) => values.push(value.into_owned()),
                None => grouped.push((key.into_owned(), vec![value.into_owned()])),
            }
        }
        Self::parse(grouped)
    }

    fn apply(&mut self, key: &str, value: String, strict: bool) -> Result<(), QueryParamsError> {
        match key {
            PAGE_LIMIT_KEY => self.page.limit = parse_count(key, &value, strict)?,
            PAGE_NUMBER_KEY => self.page.number = parse_count(key, &value, strict)?,
            SORT_BY_KEY => self.sort.by = value,
            SORT_DIRECTION_KEY => self.sort.direction = value.parse()?,
            _ => {
                // Segments after the action are ignored
                let mut segments = key.split('.');
                let (Some(attribute), Some(action)) = (segments.next(), segments.next()) else {
                    return Ok(());
                };
                let action = action.parse::<FilterAction>().map_err(|UnknownFilterAction(action)| {
                    QueryParamsError::UnknownFilterAction {
                        attribute: attribute.to_string(),
                        action,
                    }
                })?;
                self.filter_params
                    .push(FilterParam::new(attribute, action, value));
            }
        }
        Ok(())
    }

    /// Checks the sort column and every filter attribute against an allow-list
    pub fn validate(&self, allowed_columns: &[&str]) -> Result<(), QueryParamsError> {
        let known = |column: &str| allowed_columns.iter().any(|c| *c == column);
        if !known(&self.sort.by) {
            return Err(QueryParamsError::UnknownColumn(self.sort.by.clone()));
        }
        if let Some(filter) = self.filter_params.iter().find(|f| !known(&f.attribute)) {
            return Err(QueryParamsError::UnknownColumn(filter.attribute.clone()));
        }
        Ok(())
    }

    /// Scope ordering by `sort.by` and `sort.direction`
    ///
    /// The column name is used verbatim; call [`validate`](Self::validate)
    /// first when it comes from user input.
    pub fn sort_modifier(&self) -> Scope {
        let sort = self.sort.clone();
        Box::new(move |query: Query| query.order_by(sort.by.clone(), sort.direction))
    }

    /// Scope applying the page's offset and limit
    pub fn pagination_modifier(&self) -> Scope {
        let page = self.page;
        Box::new(move |query: Query| query.offset(page.offset()).limit(page.limit))
    }

    /// Scope adding one predicate per filter, in order
    ///
    /// A non-empty `table_prefix` qualifies every attribute as
    /// `prefix.attribute`.
    pub fn filter_modifier(&self, table_prefix: &str) -> Scope {
        let prefix = table_prefix.to_string();
        let filters = self.filter_params.clone();
        Box::new(move |query: Query| {
            filters.iter().fold(query, |query, filter| {
                let column = if prefix.is_empty() {
                    filter.attribute.clone()
                } else {
                    format!("{}.{}", prefix, filter.attribute)
                };
                query.filter(filter.to_predicate(column))
            })
        })
    }
}

/// Zero passes through unless `strict` is set
fn parse_count(key: &str, value: &str, strict: bool) -> Result<u64, QueryParamsError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 || !strict => Ok(n),
        _ => Err(QueryParamsError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
