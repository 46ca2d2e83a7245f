//! Endpoint tests for the article persistence API.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use locallens::{create_router, AppState, ArticleStore, Config, GeocodeClient, NewsClient};

fn test_app() -> (TestServer, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = Config {
        data_dir: dir.path().join("articles"),
        snapshot_dir: dir.path().join("snapshots"),
        auto_snapshot: false,
        ..Config::default()
    };

    let mut store = ArticleStore::new(config.clone());
    store.initialize().unwrap();

    let state = AppState::new(
        Arc::new(store),
        GeocodeClient::new(None),
        NewsClient::new(None),
    );
    let router = create_router(state, &config.assets_dir);

    (TestServer::new(router).unwrap(), dir)
}

fn sample_body(user_id: &str, title: &str) -> Value {
    json!({
        "userId": user_id,
        "title": title,
        "url": "http://x",
        "source": "X",
    })
}

#[tokio::test]
async fn save_list_delete_round_trip() {
    let (server, _dir) = test_app();

    // Save -> 201 with a generated id
    let saved = server
        .post("/articles")
        .json(&sample_body("u1", "A"))
        .await;
    saved.assert_status(StatusCode::CREATED);
    let body: Value = saved.json();
    assert_eq!(body["success"], json!(true));
    let id = body["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    // List -> exactly the record we saved
    let listed = server
        .get("/articles")
        .add_query_param("userId", "u1")
        .await;
    listed.assert_status_ok();
    let articles: Vec<Value> = listed.json();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["id"].as_str(), Some(id.as_str()));
    assert_eq!(articles[0]["title"], json!("A"));
    assert_eq!(articles[0]["url"], json!("http://x"));
    assert_eq!(articles[0]["source"], json!("X"));
    assert!(articles[0]["savedAt"].is_string());

    // Delete -> success
    let deleted = server
        .delete("/articles")
        .json(&json!({ "userId": "u1", "id": id }))
        .await;
    deleted.assert_status_ok();
    let body: Value = deleted.json();
    assert_eq!(body["success"], json!(true));

    // List again -> empty
    let listed = server
        .get("/articles")
        .add_query_param("userId", "u1")
        .await;
    listed.assert_status_ok();
    let articles: Vec<Value> = listed.json();
    assert!(articles.is_empty());
}

#[tokio::test]
async fn save_rejects_each_missing_field() {
    let (server, _dir) = test_app();

    for field in ["userId", "title", "url", "source"] {
        let mut body = sample_body("u1", "A");
        body.as_object_mut().unwrap().remove(field);

        let response = server.post("/articles").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // An empty value is rejected the same as an absent one
        let mut body = sample_body("u1", "A");
        body[field] = json!("");
        let response = server.post("/articles").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    // Nothing reached the store
    let listed = server
        .get("/articles")
        .add_query_param("userId", "u1")
        .await;
    let articles: Vec<Value> = listed.json();
    assert!(articles.is_empty());
}

#[tokio::test]
async fn list_requires_a_user_id() {
    let (server, _dir) = test_app();

    let response = server.get("/articles").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_for_an_unknown_user_is_empty_not_an_error() {
    let (server, _dir) = test_app();

    let response = server
        .get("/articles")
        .add_query_param("userId", "nobody")
        .await;
    response.assert_status_ok();
    let articles: Vec<Value> = response.json();
    assert!(articles.is_empty());
}

#[tokio::test]
async fn list_returns_newest_saves_first() {
    let (server, _dir) = test_app();

    for title in ["first", "second", "third"] {
        let response = server
            .post("/articles")
            .json(&sample_body("u1", title))
            .await;
        response.assert_status(StatusCode::CREATED);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let listed = server
        .get("/articles")
        .add_query_param("userId", "u1")
        .await;
    let titles: Vec<String> = listed
        .json::<Vec<Value>>()
        .into_iter()
        .map(|a| a["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn deleting_twice_yields_not_found() {
    let (server, _dir) = test_app();

    let saved = server
        .post("/articles")
        .json(&sample_body("u1", "A"))
        .await;
    let id = saved.json::<Value>()["id"].as_str().unwrap().to_string();

    let first = server
        .delete("/articles")
        .json(&json!({ "userId": "u1", "id": id }))
        .await;
    first.assert_status_ok();

    let second = server
        .delete("/articles")
        .json(&json!({ "userId": "u1", "id": id }))
        .await;
    second.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_is_scoped_to_the_owning_user() {
    let (server, _dir) = test_app();

    let saved = server
        .post("/articles")
        .json(&sample_body("u1", "A"))
        .await;
    let id = saved.json::<Value>()["id"].as_str().unwrap().to_string();

    // Another user cannot delete it, and learns nothing from the attempt
    let response = server
        .delete("/articles")
        .json(&json!({ "userId": "u2", "id": id }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    // The record is still there for its owner
    let listed = server
        .get("/articles")
        .add_query_param("userId", "u1")
        .await;
    let articles: Vec<Value> = listed.json();
    assert_eq!(articles.len(), 1);
}

#[tokio::test]
async fn wrong_verb_on_articles_is_method_not_allowed() {
    let (server, _dir) = test_app();

    let response = server
        .put("/articles")
        .json(&sample_body("u1", "A"))
        .await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}
