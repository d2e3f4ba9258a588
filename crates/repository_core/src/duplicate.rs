//! Duplicate-key error classification
//!
//! MySQL reports a unique constraint violation as
//!
//! ```text
//! Error 1062 (23000): Duplicate entry '5-dhaka' for key 'users.idx_user_city'
//! ```
//!
//! Composite unique keys join their column values with `-` in the entry.
//! The classifier splits on that separator, so values that themselves
//! contain hyphens cannot be told apart from separate columns.
//!
//! Only ASCII word characters and `-` are recognized in the entry. A value
//! with any other character (`café`, `a b`) is not classified.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

static DUPLICATE_ENTRY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"Error 1062 \(23000\): Duplicate entry '(?P<entry>[A-Za-z0-9_-]+)' for key '(?P<key>[A-Za-z0-9_.]+)'",
    )
    .expect("duplicate entry pattern is valid")
});

/// The parts of a duplicate-key violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateEntry {
    /// Table named by the violated key (`users` in `users.idx_user_city`)
    pub table: String,
    /// Non-empty hyphen-separated segments of the duplicated entry
    pub values: Vec<String>,
}

impl DuplicateEntry {
    /// The table followed by each duplicated value
    pub fn tokens(&self) -> Vec<String> {
        std::iter::once(self.table.clone())
            .chain(self.values.iter().cloned())
            .collect()
    }
}

/// Parses a duplicate-key error message
///
/// Returns `None` for any message that is not a MySQL duplicate entry
/// violation, including the empty string.
///
/// # Example
///
/// ```rust
/// use repository_core::parse_duplicate_entry;
///
/// let entry = parse_duplicate_entry(
///     "Error 1062 (23000): Duplicate entry '5-dhaka' for key 'users.idx_user_city'",
/// )
/// .unwrap();
/// assert_eq!(entry.tokens(), vec!["users", "5", "dhaka"]);
///
/// assert!(parse_duplicate_entry("connection refused").is_none());
/// ```
pub fn parse_duplicate_entry(message: &str) -> Option<DuplicateEntry> {
    let captures = DUPLICATE_ENTRY_PATTERN.captures(message)?;
    let entry = captures.name("entry")?.as_str();
    let key = captures.name("key")?.as_str();

    let table = key.split('.').next().unwrap_or(key).to_string();
    let values = entry
        .split('-')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    Some(DuplicateEntry { table, values })
}

/// Classifies an error by its rendered message
pub fn classify_error<E: Display + ?Sized>(error: &E) -> Option<DuplicateEntry> {
    parse_duplicate_entry(&error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key_entry() {
        let entry = parse_duplicate_entry(
            "Error 1062 (23000): Duplicate entry '5-dhaka' for key 'users.idx_user_city'",
        )
        .unwrap();

        assert_eq!(entry.table, "users");
        assert_eq!(entry.values, vec!["5", "dhaka"]);
        assert_eq!(entry.tokens(), vec!["users", "5", "dhaka"]);
    }

    #[test]
    fn test_single_column_entry() {
        let entry = parse_duplicate_entry(
            "Error 1062 (23000): Duplicate entry 'nafi' for key 'users.name'",
        )
        .unwrap();
        assert_eq!(entry.tokens(), vec!["users", "nafi"]);
    }

    #[test]
    fn test_empty_segments_are_dropped() {
        let entry = parse_duplicate_entry(
            "Error 1062 (23000): Duplicate entry '-7--x-' for key 'cities.idx'",
        )
        .unwrap();
        assert_eq!(entry.tokens(), vec!["cities", "7", "x"]);
    }

    #[test]
    fn test_key_without_table_qualifier() {
        let entry = parse_duplicate_entry(
            "Error 1062 (23000): Duplicate entry '1' for key 'PRIMARY'",
        )
        .unwrap();
        assert_eq!(entry.table, "PRIMARY");
        assert_eq!(entry.values, vec!["1"]);
    }

    #[test]
    fn test_embedded_in_wrapped_message() {
        let message = "create failed: Error 1062 (23000): Duplicate entry 'a' for key 't.k'";
        assert!(parse_duplicate_entry(message).is_some());
    }

    #[test]
    fn test_non_matching_messages() {
        assert!(parse_duplicate_entry("").is_none());
        assert!(parse_duplicate_entry("connection refused").is_none());
        assert!(parse_duplicate_entry(
            "Error 1452 (23000): Cannot add or update a child row"
        )
        .is_none());
        // Values outside the entry character class do not match
        assert!(parse_duplicate_entry(
            "Error 1062 (23000): Duplicate entry 'a b' for key 't.k'"
        )
        .is_none());
    }

    #[test]
    fn test_non_ascii_entry_is_not_classified() {
        assert!(parse_duplicate_entry(
            "Error 1062 (23000): Duplicate entry 'café' for key 'users.name'"
        )
        .is_none());
        assert!(parse_duplicate_entry(
            "Error 1062 (23000): Duplicate entry 'x' for key 'usérs.name'"
        )
        .is_none());
    }

    #[test]
    fn test_classify_error_uses_display() {
        let error = std::io::Error::new(
            std::io::ErrorKind::Other,
            "Error 1062 (23000): Duplicate entry '3' for key 'cities.PRIMARY'",
        );
        let entry = classify_error(&error).unwrap();
        assert_eq!(entry.tokens(), vec!["cities", "3"]);
    }
}
