//! Integration tests for the repository on a live MySQL container
//!
//! These tests need a Docker daemon and are ignored by default:
//! `cargo test -p infra_db -- --ignored`

use infra_db::{DatabaseError, MySqlExecutor};
use repository_core::{
    AttributeValues, Attributes, CommonRepository, CommonRepositoryPort, FilterAction,
    QueryExecutor, QueryParams, SortDirection,
};
use test_utils::{
    assert_duplicate_key, assert_not_found, assert_sorted_by, assert_user_ids, db_test,
    get_shared_test_database, CityFixtures, TestCity, TestDatabase, TestQueryParamsBuilder,
    TestUser, TestUserBuilder, UserFixtures, CITIES_TABLE, USERS_TABLE,
};

async fn seeded(db: &TestDatabase) -> CommonRepository<TestUser, MySqlExecutor> {
    let repo = CommonRepository::new(USERS_TABLE, db.executor());
    repo.create_bulk_records(UserFixtures::seed())
        .await
        .expect("Failed to seed users");
    repo
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_shared_database_ping_and_clear() {
    let db = get_shared_test_database().await;
    db.executor().ping().await.expect("ping failed");

    db.clear_data().await.expect("clear failed");
    let repo = seeded(&db).await;
    assert_eq!(repo.get_record_count(None).await.unwrap(), 5);
    db.clear_data().await.expect("clear failed");
}

db_test!(test_create_and_read_back, |db| {
    let repo = CommonRepository::<TestUser, _>::new(USERS_TABLE, db.executor());
    let user = TestUserBuilder::new().with_id(7).with_name("nafi").build();

    repo.create_record(user.clone()).await.unwrap();

    let found = repo.get_record_by_id(7.into()).await.unwrap();
    assert_eq!(found, user);
});

db_test!(test_create_returns_auto_increment_key, |db| {
    let repo = CommonRepository::<TestCity, _>::new(CITIES_TABLE, db.executor());

    let created = repo.create_record(CityFixtures::city(0, "dhaka")).await.unwrap();
    assert!(created.id > 0);
    assert_eq!(repo.get_record_by_id(created.id.into()).await.unwrap(), created);

    let bulk = repo
        .create_bulk_records(vec![CityFixtures::city(0, "khulna"), CityFixtures::city(0, "sylhet")])
        .await
        .unwrap();
    assert_eq!(bulk[0].id, created.id + 1);
    assert_eq!(bulk[1].id, created.id + 2);
});

db_test!(test_duplicate_name_is_classified, |db| {
    let repo = seeded(&db).await;

    let result = repo
        .create_record(TestUserBuilder::new().with_id(9).with_name("nafi").build())
        .await;

    assert_duplicate_key(&result, "users", &["nafi"]);
});

db_test!(test_bulk_duplicate_inserts_nothing, |db| {
    let repo = seeded(&db).await;

    let result = repo
        .create_bulk_records(vec![
            TestUserBuilder::new().with_id(10).with_name("new").build(),
            TestUserBuilder::new().with_id(11).with_name("rafi").build(),
        ])
        .await;

    assert_duplicate_key(&result, "users", &["rafi"]);
    assert_eq!(repo.get_record_count(None).await.unwrap(), 5);
});

db_test!(test_missing_id_is_not_found, |db| {
    let repo = seeded(&db).await;
    assert_not_found(&repo.get_record_by_id(42.into()).await);
    assert_not_found(&repo.delete_record_by_id(42.into()).await);
});

db_test!(test_reads_by_attributes, |db| {
    let repo = seeded(&db).await;

    let first = repo
        .get_record_by_attributes(Attributes::new().with("city", "dhaka"))
        .await
        .unwrap();
    assert_eq!(first.id, 1);

    let users = repo.get_records_for_multiple_ids(vec![2.into(), 4.into()]).await.unwrap();
    assert_eq!(users.len(), 2);

    let users = repo
        .get_records_by_multiple_attribute_values(
            AttributeValues::new().with("name", ["nafi", "tania", "nobody"]),
        )
        .await
        .unwrap();
    assert_eq!(users.len(), 2);
});

db_test!(test_query_params_filter_sort_and_paginate, |db| {
    let repo = seeded(&db).await;
    let params = TestQueryParamsBuilder::new()
        .page(1)
        .limit(2)
        .sort("age", SortDirection::Ascending)
        .filter("city", FilterAction::Equals, "dhaka")
        .build();

    let users = repo.get_records_by_query_params(Some(&params)).await.unwrap();
    assert_user_ids(&users, &[5, 1]);
    assert_eq!(repo.get_record_count(Some(&params)).await.unwrap(), 3);
});

db_test!(test_query_string_like_and_in_filters, |db| {
    let repo = seeded(&db).await;
    let params = QueryParams::from_query_string("name.like=bon&id.in=2,3,4&sort_by=id&sort_direction=desc");

    let users = repo.get_records_by_query_params(Some(&params)).await.unwrap();
    assert_user_ids(&users, &[3, 2]);
    assert_sorted_by(&users, |u| u.id, true);
});

db_test!(test_page_response, |db| {
    let repo = seeded(&db).await;
    let params = TestQueryParamsBuilder::new().page(2).limit(2).build();

    let page = repo.get_page(&params).await.unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages(), 3);
    assert_user_ids(&page.data, &[3, 2]);
});

db_test!(test_update_and_delete, |db| {
    let repo = seeded(&db).await;

    repo.update_record_by_id(4.into(), Attributes::new().with("city", "dhaka"))
        .await
        .unwrap();
    let dhaka = repo
        .get_records_by_multiple_attribute_values(AttributeValues::new().with("city", ["dhaka"]))
        .await
        .unwrap();
    assert_eq!(dhaka.len(), 4);

    repo.delete_records_by_attributes(Attributes::new().with("city", "dhaka"))
        .await
        .unwrap();
    assert_eq!(repo.get_all_records().await.unwrap().len(), 1);
});

db_test!(test_unsafe_identifier_never_reaches_server, |db| {
    let executor = db.executor();
    let query = repository_core::Query::table("users; DROP TABLE users");

    let error = executor.select(&query).await.unwrap_err();
    assert_eq!(
        error.to_string(),
        DatabaseError::InvalidIdentifier("users; DROP TABLE users".to_string()).to_string()
    );
});
