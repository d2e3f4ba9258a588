//! Custom Test Assertions
//!
//! Provides assertion helpers for repository results that give more
//! meaningful failure messages than matching by hand.

use std::fmt::Debug;

use repository_core::RepositoryError;

use crate::fixtures::TestUser;

/// Asserts that a result failed with a duplicate-key error on `table`
/// carrying exactly `values`
///
/// # Panics
///
/// Panics if the result is `Ok` or any other error
pub fn assert_duplicate_key<T: Debug>(
    result: &Result<T, RepositoryError>,
    table: &str,
    values: &[&str],
) {
    match result {
        Err(RepositoryError::DuplicateKey {
            table: actual_table,
            values: actual_values,
        }) => {
            assert_eq!(actual_table, table, "Duplicate key reported on the wrong table");
            assert_eq!(actual_values, values, "Duplicate key values differ");
        }
        other => panic!("Expected DuplicateKey error, got {:?}", other),
    }
}

/// Asserts that a result failed with `NotFound`
pub fn assert_not_found<T: Debug>(result: &Result<T, RepositoryError>) {
    assert!(
        matches!(result, Err(RepositoryError::NotFound)),
        "Expected NotFound error, got {:?}",
        result
    );
}

/// Asserts that a result failed with an error passed through unclassified
pub fn assert_unclassified<T: Debug>(result: &Result<T, RepositoryError>) {
    assert!(
        matches!(result, Err(RepositoryError::Unclassified(_))),
        "Expected Unclassified error, got {:?}",
        result
    );
}

/// Asserts the ids of `users`, in order
pub fn assert_user_ids(users: &[TestUser], expected: &[i64]) {
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, expected, "User ids differ");
}

/// Asserts that `items` are ordered by `key`, ascending or descending
pub fn assert_sorted_by<T, K: PartialOrd + Debug>(
    items: &[T],
    key: impl Fn(&T) -> K,
    descending: bool,
) {
    for pair in items.windows(2) {
        let (a, b) = (key(&pair[0]), key(&pair[1]));
        let in_order = if descending { a >= b } else { a <= b };
        assert!(in_order, "Items out of order: {:?} then {:?}", a, b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ExecutorFixtures, UserFixtures, USERS_TABLE};
    use repository_core::{CommonRepository, CommonRepositoryPort, ExecutorError};

    #[test]
    fn test_assert_duplicate_key_passes_on_match() {
        let result: Result<(), _> = Err(RepositoryError::DuplicateKey {
            table: "users".to_string(),
            values: vec!["5".to_string(), "dhaka".to_string()],
        });
        assert_duplicate_key(&result, "users", &["5", "dhaka"]);
    }

    #[test]
    #[should_panic(expected = "Expected NotFound")]
    fn test_assert_not_found_panics_on_ok() {
        assert_not_found(&Ok::<_, RepositoryError>(1));
    }

    #[test]
    fn test_assert_sorted_by() {
        let users = UserFixtures::seed();
        assert_sorted_by(&users, |u| u.id, false);
        assert_user_ids(&users, &[1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_assert_unclassified_on_driver_failure() {
        let executor = ExecutorFixtures::empty().await;
        executor
            .fail_next(ExecutorError::database("Error 1213 (40001): Deadlock found"))
            .await;
        let users = CommonRepository::<TestUser, _>::new(USERS_TABLE, executor);

        assert_unclassified(&users.create_record(UserFixtures::user(1, "nafi", "dhaka", 31)).await);
    }
}
