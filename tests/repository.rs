mod common;

use scaffold_sdk::{Document, ListQuery, PaginationParams, Repository, SortField, TimestampConfig};
use serde_json::{json, Value};

fn doc(v: Value) -> Document {
    v.as_object().cloned().unwrap()
}

async fn items() -> (common::TestStore, Repository) {
    let store = common::json_store().await;
    let repo: Repository = Repository::new(store.store.clone(), "items", TimestampConfig::both());
    (store, repo)
}

fn text<'a>(d: &'a Document, field: &str) -> &'a str {
    d.get(field).and_then(Value::as_str).unwrap_or_default()
}

#[tokio::test]
async fn create_stamps_id_and_timestamps() {
    let (_store, repo) = items().await;
    let created = repo.create(doc(json!({"name": "a"}))).await.unwrap();
    assert!(!text(&created, "id").is_empty());
    assert!(!text(&created, "createdAt").is_empty());
    assert!(!text(&created, "updatedAt").is_empty());

    let all = repo.get_all(false, &ListQuery::default(), None).await.unwrap();
    assert_eq!(all.records.len(), 1);
    assert_eq!(all.total, 1);
}

#[tokio::test]
async fn created_record_reads_back_unchanged() {
    let (_store, repo) = items().await;
    let created = repo
        .create(doc(json!({"name": "a", "tags": ["x", "y"], "n": 3})))
        .await
        .unwrap();
    let fetched = repo.get_by_id(text(&created, "id")).await.unwrap().unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn client_supplied_id_is_replaced() {
    let (_store, repo) = items().await;
    let id = "3f1c9f0e-8a4b-4c1e-9a57-1d2a3b4c5d6e";
    let created = repo.create(doc(json!({"id": id, "name": "a"}))).await.unwrap();
    assert_ne!(text(&created, "id"), id);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (_store, repo) = items().await;
    let created = repo.create(doc(json!({"name": "a"}))).await.unwrap();
    let id = text(&created, "id").to_string();
    assert!(repo.delete_by_id(id.as_str()).await.unwrap());
    assert!(!repo.delete_by_id(id.as_str()).await.unwrap());
    assert!(repo.get_by_id(id.as_str()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_keeps_id_and_created_at() {
    let (_store, repo) = items().await;
    let created = repo.create(doc(json!({"name": "a", "color": "red"}))).await.unwrap();
    let id = text(&created, "id").to_string();

    let patch = doc(json!({
        "id": "00000000-0000-4000-8000-000000000000",
        "createdAt": "1999-01-01T00:00:00Z",
        "name": "b",
    }));
    let updated = repo.update_by_id(id.as_str(), patch).await.unwrap().unwrap();
    assert_eq!(text(&updated, "id"), id);
    assert_eq!(text(&updated, "createdAt"), text(&created, "createdAt"));
    assert_eq!(text(&updated, "name"), "b");
    assert_eq!(text(&updated, "color"), "red");

    let fetched = repo.get_by_id(id.as_str()).await.unwrap().unwrap();
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn update_missing_record_is_none() {
    let (_store, repo) = items().await;
    let res = repo
        .update_by_id("00000000-0000-4000-8000-000000000000", doc(json!({"name": "b"})))
        .await
        .unwrap();
    assert!(res.is_none());
}

#[tokio::test]
async fn malformed_id_is_bad_request() {
    let (_store, repo) = items().await;
    let err = repo.get_by_id("not-a-uuid").await.unwrap_err();
    assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pages_reconcile_with_unpaginated_count() {
    let (_store, repo) = items().await;
    for i in 0..7 {
        let kind = if i % 2 == 0 { "even" } else { "odd" };
        repo.create(doc(json!({"i": i, "kind": kind}))).await.unwrap();
    }
    let query = ListQuery::default()
        .with_filter(scaffold_sdk::Filter::eq("kind", "even"))
        .with_sort(SortField::desc("i"));
    let everything = repo.get_all(false, &query, None).await.unwrap();
    assert_eq!(everything.total, 4);

    for per_page in 1..=5u64 {
        let mut seen = Vec::new();
        let mut page = 1;
        loop {
            let window = repo
                .get_all(true, &query, Some(PaginationParams::new(page, per_page)))
                .await
                .unwrap();
            assert!(window.records.len() as u64 <= per_page);
            assert_eq!(window.total, everything.total);
            assert_eq!(window.total_pages, everything.total.div_ceil(per_page));
            if window.records.is_empty() {
                break;
            }
            seen.extend(window.records);
            page += 1;
        }
        assert_eq!(seen, everything.records);
    }
    let order: Vec<i64> = everything.records.iter().filter_map(|d| d["i"].as_i64()).collect();
    assert_eq!(order, vec![6, 4, 2, 0]);
}

#[tokio::test]
async fn find_one_returns_first_match() {
    let (_store, repo) = items().await;
    repo.create(doc(json!({"name": "a"}))).await.unwrap();
    repo.create(doc(json!({"name": "b"}))).await.unwrap();
    let found = repo
        .find_one(&[scaffold_sdk::Filter::eq("name", "b")])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(text(&found, "name"), "b");
    assert!(repo
        .find_one(&[scaffold_sdk::Filter::eq("name", "c")])
        .await
        .unwrap()
        .is_none());
}
