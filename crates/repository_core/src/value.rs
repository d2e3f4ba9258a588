//! Typed values and attribute mappings
//!
//! Every value that crosses the executor port is a [`Value`]. Rows are
//! ordered maps from column name to value, and the attribute mappings used
//! by the repository keep their insertion order so predicates are issued in
//! the order the caller wrote them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// One row as exchanged with a [`QueryExecutor`](crate::ports::QueryExecutor)
pub type Row = BTreeMap<String, Value>;

/// A scalar cell or bind parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Returns true for `Value::Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// NULL or numeric zero, the key values MySQL replaces with an auto-increment id
    pub fn is_unset_key(&self) -> bool {
        matches!(self, Value::Null | Value::Int(0) | Value::UInt(0))
    }

    /// A generated key, as `Int` when it fits
    pub fn generated_key(id: u64) -> Self {
        i64::try_from(id).map_or(Value::UInt(id), Value::Int)
    }

    /// Numeric view of the value, parsing text when it holds a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::UInt(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Null => None,
        }
    }

    /// Compares two values the way a SQL engine coerces mixed operands:
    /// numerically when both sides are numeric, textually otherwise.
    ///
    /// `NULL` never compares.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => Some(self.to_string().cmp(&other.to_string())),
        }
    }

    /// Converts a JSON value into a cell; nested structures are stored as JSON text
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }

    /// Converts the cell back into JSON
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::UInt(u) => serde_json::Value::from(u),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::UInt(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )+
    };
}

value_from!(Int, i8, i16, i32, i64);
value_from!(UInt, u8, u16, u32, u64);
value_from!(Float, f32, f64);
value_from!(Bool, bool);
value_from!(Text, String, &str);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Column → value mapping used to select or update rows
///
/// Keys keep their insertion order; inserting an existing key replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, Value)>);

impl Attributes {
    /// Creates an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one attribute
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Adds or replaces one attribute in place
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.0.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the column names in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Converts the mapping into a row, as used for update payloads
    pub fn to_row(&self) -> Row {
        self.0.iter().cloned().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (k, v) in iter {
            attributes.insert(k, v);
        }
        attributes
    }
}

impl IntoIterator for Attributes {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Column → candidate values mapping, matched with `IN (...)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeValues(Vec<(String, Vec<Value>)>);

impl AttributeValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the candidate list for one column
    pub fn with<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let column = column.into();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        match self.0.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = values,
            None => self.0.push((column, values)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.0.iter().map(|(c, v)| (c.as_str(), v.as_slice()))
    }
}
