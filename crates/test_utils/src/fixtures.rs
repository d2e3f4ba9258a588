//! Pre-built Test Fixtures
//!
//! Provides the `users` and `cities` records used across the test suite and
//! a fixed seed data set. Seed data is deterministic so tests can assert on
//! exact ids and orderings.

use chrono::{NaiveDate, NaiveDateTime};
use repository_core::mock::InMemoryExecutor;
use repository_core::Record;
use serde::{Deserialize, Serialize};

/// Table holding [`TestUser`] rows
pub const USERS_TABLE: &str = "users";

/// Table holding [`TestCity`] rows
pub const CITIES_TABLE: &str = "cities";

/// A user row; `(id, city)` and `name` carry unique indexes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestUser {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub age: i64,
    pub created_at: String,
}

impl Record for TestUser {
    const COLUMNS: &'static [&'static str] = &["id", "name", "city", "age", "created_at"];
}

/// A city row; `name` is unique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCity {
    pub id: i64,
    pub name: String,
}

impl Record for TestCity {
    const COLUMNS: &'static [&'static str] = &["id", "name"];
}

/// Fixture for timestamps
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Midnight on January `day`, 2024
    pub fn january(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day.clamp(1, 31))
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    /// Renders a timestamp the way DATETIME columns are decoded
    pub fn render(timestamp: NaiveDateTime) -> String {
        timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Fixture for user rows
pub struct UserFixtures;

impl UserFixtures {
    /// Builds a user created on January `id`, 2024
    pub fn user(id: i64, name: &str, city: &str, age: i64) -> TestUser {
        TestUser {
            id,
            name: name.to_string(),
            city: city.to_string(),
            age,
            created_at: TemporalFixtures::render(TemporalFixtures::january(id as u32)),
        }
    }

    /// The five seed users; three live in dhaka
    pub fn seed() -> Vec<TestUser> {
        vec![
            Self::user(1, "nafi", "dhaka", 31),
            Self::user(2, "bondhan", "khulna", 27),
            Self::user(3, "bonny", "dhaka", 45),
            Self::user(4, "rafi", "sylhet", 19),
            Self::user(5, "tania", "dhaka", 22),
        ]
    }
}

/// Fixture for city rows
pub struct CityFixtures;

impl CityFixtures {
    pub fn city(id: i64, name: &str) -> TestCity {
        TestCity {
            id,
            name: name.to_string(),
        }
    }

    pub fn seed() -> Vec<TestCity> {
        vec![
            Self::city(1, "dhaka"),
            Self::city(2, "khulna"),
            Self::city(3, "sylhet"),
        ]
    }
}

/// Fixture for in-memory executors carrying the same unique indexes as the
/// MySQL schema
pub struct ExecutorFixtures;

impl ExecutorFixtures {
    pub async fn empty() -> InMemoryExecutor {
        InMemoryExecutor::new()
            .with_unique_index(USERS_TABLE, "PRIMARY", &["id"])
            .await
            .with_unique_index(USERS_TABLE, "idx_user_city", &["id", "city"])
            .await
            .with_unique_index(USERS_TABLE, "idx_user_name", &["name"])
            .await
            .with_unique_index(CITIES_TABLE, "PRIMARY", &["id"])
            .await
            .with_unique_index(CITIES_TABLE, "idx_city_name", &["name"])
            .await
            .with_auto_increment(CITIES_TABLE, "id")
            .await
    }
}
