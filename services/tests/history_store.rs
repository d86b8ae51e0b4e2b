//! Integration tests for the request history store

use migration::{Migrator, MigratorTrait};
use restbench_services::{
    CacheService, CachedHistoryService, HistoryFilter, HistoryQuery, HistoryStore, NewRecord,
    StatusFilterMode, StatusPredicate,
};
use sea_orm::{Database, DatabaseConnection};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Helper to create an in-memory database with migrations applied
async fn create_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

fn record(method: &str, url: &str, status: i32, response: &str) -> NewRecord {
    NewRecord {
        method: method.to_string(),
        url: url.to_string(),
        headers: HashMap::new(),
        body: None,
        response: response.to_string(),
        status,
        response_time: 12,
    }
}

async fn seed(store: &HistoryStore, records: Vec<NewRecord>) -> Vec<i32> {
    let mut ids = Vec::new();
    for r in records {
        ids.push(store.insert(r).await.unwrap());
    }
    ids
}

fn filtered(filter: HistoryFilter) -> HistoryQuery {
    HistoryQuery::new(Some(1), Some(50), filter)
}

#[tokio::test]
async fn test_insert_assigns_increasing_ids() {
    let store = HistoryStore::new(create_test_db().await);

    let ids = seed(
        &store,
        vec![
            record("GET", "http://a", 200, "a"),
            record("GET", "http://b", 200, "b"),
        ],
    )
    .await;

    assert!(ids[1] > ids[0]);
}

#[tokio::test]
async fn test_unfiltered_query_is_newest_first() {
    let store = HistoryStore::new(create_test_db().await);
    let ids = seed(
        &store,
        (0..5)
            .map(|i| record("GET", &format!("http://host/{}", i), 200, "ok"))
            .collect(),
    )
    .await;

    let page = store.query(&HistoryQuery::default()).await.unwrap();

    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.current_page, 1);
    assert!(!page.has_more);

    let returned: Vec<i32> = page.requests.iter().map(|r| r.id).collect();
    let mut expected = ids.clone();
    expected.reverse();
    assert_eq!(returned, expected);

    for pair in page.requests.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

#[tokio::test]
async fn test_pagination_splits_pages() {
    let store = HistoryStore::new(create_test_db().await);
    seed(
        &store,
        (0..7)
            .map(|i| record("GET", &format!("http://host/{}", i), 200, "ok"))
            .collect(),
    )
    .await;

    let first = store
        .query(&HistoryQuery::new(Some(1), Some(3), HistoryFilter::default()))
        .await
        .unwrap();
    assert_eq!(first.requests.len(), 3);
    assert_eq!(first.total, 7);
    assert_eq!(first.total_pages, 3);
    assert!(first.has_more);

    let last = store
        .query(&HistoryQuery::new(Some(3), Some(3), HistoryFilter::default()))
        .await
        .unwrap();
    assert_eq!(last.requests.len(), 1);
    assert!(!last.has_more);
    assert_eq!(last.requests[0].url, "http://host/0");

    let beyond = store
        .query(&HistoryQuery::new(Some(9), Some(3), HistoryFilter::default()))
        .await
        .unwrap();
    assert!(beyond.requests.is_empty());
    assert_eq!(beyond.total, 7);
}

#[tokio::test]
async fn test_oversized_limit_is_clamped() {
    let store = HistoryStore::new(create_test_db().await);
    seed(
        &store,
        (0..60)
            .map(|i| record("GET", &format!("http://host/{}", i), 200, "ok"))
            .collect(),
    )
    .await;

    let page = store
        .query(&HistoryQuery::new(Some(1), Some(1000), HistoryFilter::default()))
        .await
        .unwrap();

    assert_eq!(page.requests.len(), 50);
    assert_eq!(page.total, 60);
    assert_eq!(page.total_pages, 2);
}

#[tokio::test]
async fn test_method_filter_is_exact() {
    let store = HistoryStore::new(create_test_db().await);
    seed(
        &store,
        vec![
            record("GET", "http://a", 200, ""),
            record("POST", "http://b", 201, ""),
            record("get", "http://c", 200, ""),
        ],
    )
    .await;

    let page = store
        .query(&filtered(HistoryFilter {
            method: Some("GET".into()),
            ..Default::default()
        }))
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.requests[0].url, "http://a");
}

#[tokio::test]
async fn test_status_filter_modes() {
    let store = HistoryStore::new(create_test_db().await);
    seed(
        &store,
        vec![
            record("GET", "http://a", 500, ""),
            record("GET", "http://b", 503, ""),
            record("GET", "http://c", 404, ""),
            record("GET", "http://d", 600, ""),
        ],
    )
    .await;

    let class = store
        .query(&filtered(HistoryFilter {
            status: Some(StatusPredicate::from_value(500, StatusFilterMode::Class)),
            ..Default::default()
        }))
        .await
        .unwrap();
    let mut statuses: Vec<i32> = class.requests.iter().map(|r| r.status).collect();
    statuses.sort();
    assert_eq!(statuses, vec![500, 503]);

    let exact = store
        .query(&filtered(HistoryFilter {
            status: Some(StatusPredicate::from_value(500, StatusFilterMode::Exact)),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(exact.total, 1);
    assert_eq!(exact.requests[0].status, 500);

    let non_class = store
        .query(&filtered(HistoryFilter {
            status: Some(StatusPredicate::from_value(404, StatusFilterMode::Class)),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(non_class.total, 1);
    assert_eq!(non_class.requests[0].url, "http://c");
}

#[tokio::test]
async fn test_search_matches_url_or_response_case_insensitively() {
    let store = HistoryStore::new(create_test_db().await);
    seed(
        &store,
        vec![
            record("GET", "http://example.com/FOO", 200, "nothing"),
            record("GET", "http://example.com/bar", 200, "has Foo inside"),
            record("GET", "http://example.com/baz", 200, "unrelated"),
        ],
    )
    .await;

    let page = store
        .query(&filtered(HistoryFilter {
            search: Some("foo".into()),
            ..Default::default()
        }))
        .await
        .unwrap();

    let mut urls: Vec<&str> = page.requests.iter().map(|r| r.url.as_str()).collect();
    urls.sort();
    assert_eq!(urls, vec!["http://example.com/FOO", "http://example.com/bar"]);
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let store = HistoryStore::new(create_test_db().await);
    seed(
        &store,
        vec![
            record("GET", "http://a/100%", 200, ""),
            record("GET", "http://a/1000", 200, ""),
        ],
    )
    .await;

    let page = store
        .query(&filtered(HistoryFilter {
            search: Some("100%".into()),
            ..Default::default()
        }))
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.requests[0].url, "http://a/100%");
}

#[tokio::test]
async fn test_filters_compose() {
    let store = HistoryStore::new(create_test_db().await);
    seed(
        &store,
        vec![
            record("GET", "http://api/users", 200, ""),
            record("POST", "http://api/users", 201, ""),
            record("GET", "http://api/users", 404, ""),
            record("GET", "http://api/orders", 200, ""),
        ],
    )
    .await;

    let page = store
        .query(&filtered(HistoryFilter {
            method: Some("GET".into()),
            status: Some(StatusPredicate::from_value(200, StatusFilterMode::Class)),
            search: Some("users".into()),
        }))
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.requests[0].method, "GET");
    assert_eq!(page.requests[0].status, 200);
}

#[tokio::test]
async fn test_headers_and_body_round_trip() {
    let store = HistoryStore::new(create_test_db().await);
    let headers = HashMap::from([
        ("Authorization".to_string(), "Bearer t".to_string()),
        ("X-Empty".to_string(), String::new()),
    ]);

    store
        .insert(NewRecord {
            headers: headers.clone(),
            body: Some(String::new()),
            ..record("POST", "http://a", 201, "created")
        })
        .await
        .unwrap();
    store.insert(record("GET", "http://b", 200, "")).await.unwrap();

    let page = store.query(&HistoryQuery::default()).await.unwrap();
    let posted = page.requests.iter().find(|r| r.method == "POST").unwrap();
    let fetched = page.requests.iter().find(|r| r.method == "GET").unwrap();

    assert_eq!(posted.headers, headers);
    assert_eq!(posted.body.as_deref(), Some(""));
    assert!(fetched.headers.is_empty());
    assert_eq!(fetched.body, None);
}

#[tokio::test]
async fn test_long_response_is_truncated_only_in_projection() {
    let db = create_test_db().await;
    let store = HistoryStore::new(db.clone());
    let long = "x".repeat(1500);
    let id = store.insert(record("GET", "http://a", 200, &long)).await.unwrap();

    let page = store.query(&HistoryQuery::default()).await.unwrap();
    assert_eq!(page.requests[0].response.len(), 1003);
    assert!(page.requests[0].response.ends_with("..."));

    use sea_orm::EntityTrait;
    let stored = restbench_services::request_history::Entity::find_by_id(id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.response, long);
}

#[tokio::test]
async fn test_clear_all_empties_history() {
    let store = HistoryStore::new(create_test_db().await);
    seed(
        &store,
        vec![
            record("GET", "http://a", 200, ""),
            record("GET", "http://b", 500, ""),
        ],
    )
    .await;

    assert_eq!(store.clear_all().await.unwrap(), 2);

    let page = store.query(&HistoryQuery::default()).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(page.requests.is_empty());
    assert_eq!(page.total_pages, 0);
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_record_swallows_storage_failures() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    // no migrations: the table does not exist
    let store = HistoryStore::new(db);

    assert!(store.insert(record("GET", "http://a", 200, "")).await.is_err());
    assert_eq!(store.record(record("GET", "http://a", 200, "")).await, None);
    assert!(store.query(&HistoryQuery::default()).await.is_err());
    assert!(store.clear_all().await.is_err());
}

#[tokio::test]
async fn test_cached_service_without_redis_passes_through() {
    let store = Arc::new(HistoryStore::new(create_test_db().await));
    let service = CachedHistoryService::new(
        store,
        Arc::new(CacheService::new(None).unwrap()),
        Duration::from_secs(60),
    );

    assert!(service.record(record("GET", "http://a", 200, "")).await.is_some());
    assert_eq!(service.query(&HistoryQuery::default()).await.unwrap().total, 1);

    service.record(record("GET", "http://b", 200, "")).await;
    assert_eq!(service.query(&HistoryQuery::default()).await.unwrap().total, 2);

    assert_eq!(service.clear_all().await.unwrap(), 2);
    assert_eq!(service.query(&HistoryQuery::default()).await.unwrap().total, 0);
}
