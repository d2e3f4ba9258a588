//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::NaiveDateTime;
use repository_core::{FilterAction, FilterParam, Page, QueryParams, Sort, SortDirection};

use crate::fixtures::{TemporalFixtures, TestUser};

/// Builder for constructing test users
pub struct TestUserBuilder {
    id: i64,
    name: String,
    city: String,
    age: i64,
    created_at: NaiveDateTime,
}

impl Default for TestUserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestUserBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            id: 100,
            name: "test_user".to_string(),
            city: "dhaka".to_string(),
            age: 30,
            created_at: TemporalFixtures::january(1),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    pub fn with_age(mut self, age: i64) -> Self {
        self.age = age;
        self
    }

    pub fn with_created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = created_at;
        self
    }

    /// Builds the user
    pub fn build(self) -> TestUser {
        TestUser {
            id: self.id,
            name: self.name,
            city: self.city,
            age: self.age,
            created_at: TemporalFixtures::render(self.created_at),
        }
    }
}

/// Builder for query parameters
///
/// Produces either a parsed [`QueryParams`] or the equivalent URL query
/// string, so the same request can exercise both entry points.
#[derive(Debug, Clone, Default)]
pub struct TestQueryParamsBuilder {
    page: Page,
    sort: Sort,
    filters: Vec<FilterParam>,
}

impl TestQueryParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, number: u64) -> Self {
        self.page.number = number;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.page.limit = limit;
        self
    }

    pub fn sort(mut self, by: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Sort::new(by, direction);
        self
    }

    pub fn filter(mut self, attribute: &str, action: FilterAction, value: &str) -> Self {
        self.filters.push(FilterParam::new(attribute, action, value));
        self
    }

    pub fn build(self) -> QueryParams {
        QueryParams::new(self.page, self.sort, self.filters)
    }

    /// Renders the parameters as `key=value` pairs joined by `&`
    ///
    /// Values are written verbatim, so they should not contain `&` or `=`.
    pub fn to_query_string(&self) -> String {
        let mut pairs = vec![
            format!("page={}", self.page.number),
            format!("limit={}", self.page.limit),
            format!("sort_by={}", self.sort.by),
            format!("sort_direction={}", self.sort.direction),
        ];
        pairs.extend(
            self.filters
                .iter()
                .map(|f| format!("{}.{}={}", f.attribute, f.action, f.value)),
        );
        pairs.join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_builder_defaults() {
        let user = TestUserBuilder::new().with_name("nafi").build();
        assert_eq!(user.name, "nafi");
        assert_eq!(user.city, "dhaka");
        assert_eq!(user.created_at, "2024-01-01T00:00:00");
    }

    #[test]
    fn test_query_string_parses_back() {
        let builder = TestQueryParamsBuilder::new()
            .page(2)
            .limit(5)
            .sort("name", SortDirection::Ascending)
            .filter("city", FilterAction::Equals, "dhaka")
            .filter("age", FilterAction::GreaterThanEqual, "20");

        let parsed = QueryParams::from_query_string(&builder.to_query_string());
        assert_eq!(parsed, builder.build());
    }
}
