mod common;

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use huly_rpc::huly::HulyApi;
use huly_rpc::server;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{memory_client, scripted, Scripted};

fn app<F>(reply: F) -> (Router, Scripted)
where
    F: Fn(&common::Seen) -> Result<Value, String> + Send + Sync + 'static,
{
    // ---
    let (client, backend) = memory_client(Duration::from_secs(30));
    let backend = scripted(backend, reply);
    (server::router(HulyApi::new(client)), backend)
}

async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    // ---
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_reports_backend_state() {
    // ---
    let (app, _backend) = app(|_| Ok(Value::Null));

    let (status, body) = call(app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "disconnected");
    assert_eq!(body["endpoint"], common::ENDPOINT);
    assert_eq!(body["pendingRequests"], 0);
}

#[tokio::test]
async fn test_manifest_lists_catalog() {
    // ---
    let (app, _backend) = app(|_| Ok(Value::Null));

    let (status, body) = call(app, Method::GET, "/manifest", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "huly");
    assert_eq!(body["auth"]["type"], "custom");
    assert_eq!(body["actions"].as_array().unwrap().len(), 8);
    assert_eq!(body["triggers"].as_array().unwrap().len(), 2);
    assert!(body["triggers"]
        .as_array()
        .unwrap()
        .iter()
        .all(|trigger| trigger["type"] == "POLLING"));

    let create_issue = body["actions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|action| action["name"] == "create_issue")
        .unwrap();
    let priority = create_issue["props"]
        .as_array()
        .unwrap()
        .iter()
        .find(|prop| prop["name"] == "priority")
        .unwrap();
    assert_eq!(priority["type"], "STATIC_DROPDOWN");
    assert_eq!(priority["options"], json!(["low", "medium", "high"]));
}

#[tokio::test]
async fn test_run_action_returns_result() {
    // ---
    let (app, backend) = app(|seen| {
        Ok(json!([{ "id": "p1", "name": "Alice", "query": seen.params["query"] }]))
    });

    let (status, body) = call(
        app,
        Method::POST,
        "/actions/find_person",
        Some(json!({ "query": "ali" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Alice");
    assert_eq!(body[0]["query"], "ali");
    assert_eq!(backend.methods(), vec!["person.find"]);
}

#[tokio::test]
async fn test_run_action_without_body() {
    // ---
    let (app, backend) = app(|_| Ok(json!([])));

    let (status, body) = call(app, Method::POST, "/actions/find_person", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert_eq!(backend.requests()[0].params, json!({}));
}

#[tokio::test]
async fn test_unknown_action_is_not_found() {
    // ---
    let (app, backend) = app(|_| Ok(Value::Null));

    let (status, body) = call(app, Method::POST, "/actions/drop_tables", Some(json!({}))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown action: drop_tables");
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_invalid_props_are_rejected() {
    // ---
    let (app, backend) = app(|_| Ok(Value::Null));

    let (status, body) = call(
        app.clone(),
        Method::POST,
        "/actions/create_issue",
        Some(json!({ "projectId": "pr1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));

    let (status, _) = call(
        app,
        Method::POST,
        "/actions/create_issue",
        Some(json!({ "projectId": "pr1", "title": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_backend_error_is_bad_gateway() {
    // ---
    let (app, _backend) = app(|_| Err("project not found".to_string()));

    let (status, body) = call(
        app,
        Method::POST,
        "/actions/create_issue",
        Some(json!({ "projectId": "missing", "title": "t" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "error creating issue: project not found");
}

#[tokio::test]
async fn test_unreachable_backend_is_unavailable() {
    // ---
    let (client, backend) = memory_client(Duration::from_secs(30));
    backend.refuse_connections(Some("connection refused"));
    let app = server::router(HulyApi::new(client));

    let (status, body) = call(app, Method::POST, "/actions/find_person", Some(json!({}))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_trigger_poll_baseline_then_new_items() {
    // ---
    let (app, _backend) = app(|seen| {
        assert_eq!(seen.method, "issue.find");
        Ok(json!([
            { "id": "a", "title": "a", "lastModified": 100 },
            { "id": "b", "title": "b", "lastModified": 300 },
            { "id": "c", "title": "c", "lastModified": 200 }
        ]))
    });

    let (status, baseline) = call(
        app.clone(),
        Method::POST,
        "/triggers/new_issue/poll",
        Some(json!({ "props": { "projectId": "pr1" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(baseline, json!({ "items": [], "cursor": 300 }));

    let (status, newer) = call(
        app,
        Method::POST,
        "/triggers/new_issue/poll",
        Some(json!({ "props": { "projectId": "pr1" }, "cursor": 150 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<&str> = newer["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c", "b"]);
    assert_eq!(newer["cursor"], 300);
}

#[tokio::test]
async fn test_unknown_trigger_is_not_found() {
    // ---
    let (app, _backend) = app(|_| Ok(json!([])));

    let (status, body) = call(
        app,
        Method::POST,
        "/triggers/new_comment/poll",
        Some(json!({ "props": {} })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown trigger: new_comment");
}
