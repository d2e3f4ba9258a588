//! Property-Based Test Generators
//!
//! Provides proptest strategies for query parameters, users, and the
//! driver messages the duplicate-key classifier reads.

use proptest::prelude::*;
use repository_core::{FilterAction, FilterParam, Page, QueryParams, Sort, SortDirection};

use crate::fixtures::{TestUser, UserFixtures};

/// Strategy for SQL-safe identifiers
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

/// Strategy for every filter action
pub fn filter_action_strategy() -> impl Strategy<Value = FilterAction> {
    prop_oneof![
        Just(FilterAction::Equals),
        Just(FilterAction::Like),
        Just(FilterAction::In),
        Just(FilterAction::GreaterThan),
        Just(FilterAction::GreaterThanEqual),
        Just(FilterAction::LessThan),
        Just(FilterAction::LessThanEqual),
    ]
}

pub fn sort_direction_strategy() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Ascending), Just(SortDirection::Descending)]
}

/// Strategy for filters over the given columns
pub fn filter_param_strategy(
    columns: &'static [&'static str],
) -> impl Strategy<Value = FilterParam> {
    (
        prop::sample::select(columns),
        filter_action_strategy(),
        "[a-z0-9]{1,8}",
    )
        .prop_map(|(column, action, value)| FilterParam::new(column, action, value))
}

/// Strategy for query parameters referencing only the given columns
pub fn query_params_strategy(
    columns: &'static [&'static str],
) -> impl Strategy<Value = QueryParams> {
    (
        1u64..50,
        1u64..100,
        prop::sample::select(columns),
        sort_direction_strategy(),
        prop::collection::vec(filter_param_strategy(columns), 0..4),
    )
        .prop_map(|(number, limit, by, direction, filters)| {
            QueryParams::new(Page::new(number, limit), Sort::new(by, direction), filters)
        })
}

/// Strategy for a MySQL duplicate-entry message with its expected tokens
///
/// Yields `(message, table, entry segments)`.
pub fn duplicate_message_strategy() -> impl Strategy<Value = (String, String, Vec<String>)> {
    (
        identifier_strategy(),
        identifier_strategy(),
        prop::collection::vec("[A-Za-z0-9_]{1,8}", 1..4),
    )
        .prop_map(|(table, index, segments)| {
            let message = format!(
                "Error 1062 (23000): Duplicate entry '{}' for key '{}.{}'",
                segments.join("-"),
                table,
                index
            );
            (message, table, segments)
        })
}

/// Strategy for users with a fixed id
pub fn test_user_strategy(id: i64) -> impl Strategy<Value = TestUser> {
    ("[a-z]{3,10}", "[a-z]{4,8}", 18i64..90)
        .prop_map(move |(name, city, age)| UserFixtures::user(id, &name, &city, age))
}
