//! HTTP-surface integration tests, exercising the router the way
//! `original_source/tests/test_main.py` exercises the FastAPI app: build
//! the full app, drive it with real requests, assert on status codes and
//! bodies.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fleetd_client_api::{build_router, Config};
use fleetd_core::Registry;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_config() -> Config {
    Config { jwt_algo: None, jwt_verif_key: String::new(), api_key: None, bind_addr: "127.0.0.1:0".to_string() }
}

fn app(config: Config) -> axum::Router {
    build_router(Arc::new(Registry::new()), config)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_requires_no_auth() {
    let config = Config { api_key: Some("secret".to_string()), ..test_config() };
    let response = app(config)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_start_false_then_get_roundtrips() {
    let app = app(test_config());

    let create = Request::builder()
        .method("POST")
        .uri("/procs?start=false")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "svc", "command": ["true"]}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let descriptor = body_json(response).await;
    assert_eq!(descriptor["name"], "svc");
    assert_eq!(descriptor["pid"], Value::Null);
    assert_eq!(descriptor["running"], false);

    let get = Request::builder().uri("/procs/svc").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(get).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_duplicate_name_is_bad_request() {
    let app = app(test_config());
    let body = || Body::from(json!({"name": "dup", "command": ["true"]}).to_string());

    let first = Request::builder()
        .method("POST")
        .uri("/procs?start=false")
        .header("content-type", "application/json")
        .body(body())
        .unwrap();
    assert_eq!(app.clone().oneshot(first).await.unwrap().status(), StatusCode::OK);

    let second = Request::builder()
        .method("POST")
        .uri("/procs?start=false")
        .header("content-type", "application/json")
        .body(body())
        .unwrap();
    assert_eq!(app.clone().oneshot(second).await.unwrap().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_process_is_not_found() {
    let app = app(test_config());
    let response = app
        .oneshot(Request::builder().uri("/procs/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// S6: create `p` with `start=false`, then `DELETE /procs/p` is rejected
/// because `returncode` is undefined for a process that has never run.
#[tokio::test]
async fn delete_guard_on_never_started_process() {
    let app = app(test_config());
    let create = Request::builder()
        .method("POST")
        .uri("/procs?start=false")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "q", "command": ["true"]}).to_string()))
        .unwrap();
    assert_eq!(app.clone().oneshot(create).await.unwrap().status(), StatusCode::OK);

    let delete_before_start = Request::builder().method("DELETE").uri("/procs/q").body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(delete_before_start).await.unwrap().status(), StatusCode::BAD_REQUEST);

    let start = Request::builder().method("POST").uri("/procs/q/start").body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(start).await.unwrap().status(), StatusCode::OK);

    let stop = Request::builder().method("POST").uri("/procs/q/stop?kill=true").body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(stop).await.unwrap().status(), StatusCode::OK);

    let delete_after_stop = Request::builder().method("DELETE").uri("/procs/q").body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(delete_after_stop).await.unwrap().status(), StatusCode::NO_CONTENT);
}

/// Delete is also rejected while a started process is still running, and
/// succeeds once it's been stopped.
#[tokio::test]
async fn delete_guard_on_running_process() {
    let app = app(test_config());
    let create = Request::builder()
        .method("POST")
        .uri("/procs?start=true")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "p", "command": ["sleep", "5"]}).to_string()))
        .unwrap();
    assert_eq!(app.clone().oneshot(create).await.unwrap().status(), StatusCode::OK);

    let delete_while_running = Request::builder().method("DELETE").uri("/procs/p").body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(delete_while_running).await.unwrap().status(), StatusCode::BAD_REQUEST);

    let stop = Request::builder().method("POST").uri("/procs/p/stop?kill=true").body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(stop).await.unwrap().status(), StatusCode::OK);

    let delete_after_stop = Request::builder().method("DELETE").uri("/procs/p").body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(delete_after_stop).await.unwrap().status(), StatusCode::NO_CONTENT);
}

/// S5: api_key gating — missing header is 401, wrong header is 403, correct
/// header is 200.
#[tokio::test]
async fn api_key_gating() {
    let config = Config { api_key: Some("secret".to_string()), ..test_config() };
    let app = app(config);

    let missing = Request::builder().uri("/procs").body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(missing).await.unwrap().status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder().uri("/procs").header("X-API-Key", "nope").body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(wrong).await.unwrap().status(), StatusCode::FORBIDDEN);

    let correct = Request::builder().uri("/procs").header("X-API-Key", "secret").body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(correct).await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_process_name_is_unprocessable() {
    let app = app(test_config());
    let create = Request::builder()
        .method("POST")
        .uri("/procs?start=false")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "has a space", "command": ["true"]}).to_string()))
        .unwrap();
    let response = app.oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn tail_text_prefixes_timestamp_by_default() {
    let app = app(test_config());
    let create = Request::builder()
        .method("POST")
        .uri("/procs?start=true")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "echoer", "command": ["sh", "-c", "printf hi"]}).to_string()))
        .unwrap();
    assert_eq!(app.clone().oneshot(create).await.unwrap().status(), StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let tail = Request::builder().uri("/procs/echoer/tail-text?n=1").body(Body::empty()).unwrap();
    let response = app.oneshot(tail).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let lines: Vec<String> = serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(" | hi"));
}
