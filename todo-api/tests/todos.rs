use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use hyper::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use todo_api::api::{self, router::Router};
use todo_api::{AppConfig, Global};
use todo_core::Database;

struct TestApp {
    _dir: TempDir,
    router: Router,
}

async fn app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("todo.db").display());
    let db = Database::connect(&url).await.unwrap();
    let global = Arc::new(Global::new(AppConfig::default(), db));

    TestApp {
        router: api::routes(&global),
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|b| Bytes::from(b.to_string())).unwrap_or_default();
        self.send_raw(method, uri, body).await
    }

    async fn send_raw(&self, method: Method, uri: &str, body: Bytes) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap();

        let res = api::handle(&self.router, req).await;
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    async fn create(&self, title: &str, content: &str) -> Value {
        let (status, body) = self
            .send(Method::POST, "/todos/", Some(json!({ "title": title, "content": content })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

fn timestamp(value: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap()).unwrap().with_timezone(&Utc)
}

fn error(detail: &str, status: StatusCode) -> Value {
    json!({ "detail": detail, "status_code": status.as_u16() })
}

#[tokio::test]
async fn create_returns_item_with_equal_timestamps() {
    let app = app().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/todos/",
            Some(json!({ "title": "groceries", "content": "eggs, flour", "is_completed": true })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_i64());
    assert_eq!(body["title"], "groceries");
    assert_eq!(body["content"], "eggs, flour");
    assert_eq!(body["is_completed"], false);
    assert_eq!(body["created_at"], body["updated_at"]);
    assert!(body["created_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let app = app().await;

    let created = app.create("call mom", "sunday evening").await;
    let id = created["id"].as_i64().unwrap();

    let (status, fetched) = app.send(Method::GET, &format!("/todos/{id}/"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
    assert!(timestamp(&fetched["created_at"]) <= timestamp(&fetched["updated_at"]));
}

#[tokio::test]
async fn list_wraps_items_in_envelope() {
    let app = app().await;

    let (status, body) = app.send(Method::GET, "/todos/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": [], "todo_count": 0 }));

    let first = app.create("one", "1").await;
    let second = app.create("two", "2").await;

    let (status, body) = app.send(Method::GET, "/todos/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["todo_count"], 2);
    assert_eq!(body["data"], json!([first, second]));
}

#[tokio::test]
async fn non_numeric_id_is_rejected_before_lookup() {
    let app = app().await;

    for method in [Method::GET, Method::PATCH, Method::DELETE] {
        let (status, body) = app.send(method, "/todos/12a/", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, error("id must be numeric", StatusCode::BAD_REQUEST));
    }
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let app = app().await;

    let (status, body) = app.send(Method::GET, "/todos/999999/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, error("Not found.", StatusCode::NOT_FOUND));

    let (status, _) = app
        .send(Method::PATCH, "/todos/999999/", Some(json!({ "title": "a", "content": "b" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::DELETE, "/todos/999999/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_validation_order() {
    let app = app().await;

    let (status, body) = app.send(Method::POST, "/todos/", Some(json!({ "content": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, error("bad request format", StatusCode::BAD_REQUEST));

    let (status, body) = app
        .send(Method::POST, "/todos/", Some(json!({ "title": "", "content": "x" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, error("title must be at least 1 character", StatusCode::BAD_REQUEST));

    let (status, body) = app
        .send(Method::POST, "/todos/", Some(json!({ "title": "x", "content": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, error("content must be at least 1 character", StatusCode::BAD_REQUEST));

    // nothing was written
    let (_, body) = app.send(Method::GET, "/todos/", None).await;
    assert_eq!(body["todo_count"], 0);
}

#[tokio::test]
async fn create_reports_field_errors() {
    let app = app().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/todos/",
            Some(json!({ "title": "t".repeat(101), "content": "   " })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "title": ["Ensure this field has no more than 100 characters."],
            "content": ["This field may not be blank."],
        })
    );
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app().await;

    let (status, body) = app
        .send_raw(Method::POST, "/todos/", Bytes::from_static(b"{\"title\": \"a\""))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("JSON parse error - "));
    assert_eq!(body["status_code"], 400);
}

#[tokio::test]
async fn update_changes_content_and_refreshes_updated_at() {
    let app = app().await;

    let created = app.create("draft", "first").await;
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = app
        .send(
            Method::PATCH,
            &format!("/todos/{id}/"),
            Some(json!({ "title": "final", "content": "second", "is_completed": true })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["title"], "final");
    assert_eq!(updated["content"], "second");
    assert_eq!(updated["is_completed"], false);
    assert_eq!(updated["created_at"], created["created_at"]);
    assert!(timestamp(&updated["updated_at"]) >= timestamp(&created["updated_at"]));

    let (_, fetched) = app.send(Method::GET, &format!("/todos/{id}/"), None).await;
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn update_validation_errors_leave_item_untouched() {
    let app = app().await;

    let created = app.create("keep", "me").await;
    let uri = format!("/todos/{}/", created["id"]);

    let (status, body) = app.send(Method::PATCH, &uri, Some(json!({ "title": "only" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, error("bad request format", StatusCode::BAD_REQUEST));

    let (status, body) = app
        .send(Method::PATCH, &uri, Some(json!({ "title": null, "content": "x" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "title": ["This field may not be null."] }));

    let (_, fetched) = app.send(Method::GET, &uri, None).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let app = app().await;

    let created = app.create("ephemeral", "gone soon").await;
    let uri = format!("/todos/{}/", created["id"]);

    let (status, body) = app.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = app.send(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // ids are never handed out twice
    let next = app.create("after", "delete").await;
    assert!(next["id"].as_i64().unwrap() > created["id"].as_i64().unwrap());
}

#[tokio::test]
async fn unsupported_method_is_not_allowed() {
    let app = app().await;

    let (status, body) = app.send(Method::PUT, "/todos/1/", Some(json!({}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, error("Method \"PUT\" not allowed.", StatusCode::METHOD_NOT_ALLOWED));

    let (status, _) = app.send(Method::DELETE, "/todos/", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = app().await;

    let (status, body) = app.send(Method::GET, "/nothing/here/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, error("Not found.", StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn missing_trailing_slash_redirects() {
    let app = app().await;

    let req = Request::builder().uri("/todos").body(Bytes::new()).unwrap();
    let res = api::handle(&app.router, req).await;

    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[header::LOCATION], "/todos/");
}
