#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use catalog_api::config::{builtin_model, parse_model};
use catalog_api::{build_router, create_pool, prepare, resolve};

/// Body limit used by the test router.
pub const TEST_BODY_LIMIT: usize = 64 * 1024;

/// Build the full router for a built-in model over a fresh, seeded in-memory database.
///
/// Each call gets its own database, so tests never see each other's writes.
pub async fn build_test_app(model_name: &str) -> Router {
    let raw = builtin_model(model_name).expect("built-in model exists");
    let model = resolve(&parse_model(raw).expect("model parses")).expect("model resolves");
    let pool = create_pool("sqlite::memory:", 1)
        .await
        .expect("in-memory pool");
    let state = prepare(pool, model).await.expect("schema and seed");
    build_router(state, TEST_BODY_LIMIT)
}

/// Send a request and return the status with the parsed JSON body (`Null` when empty).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

/// Send a raw body with an optional content type, for requests JSON helpers cannot build.
pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    });
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn patch_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PATCH, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, None).await
}

/// Ids of the objects in a JSON array, in order.
pub fn ids(value: &Value) -> Vec<i64> {
    value
        .as_array()
        .expect("array body")
        .iter()
        .map(|v| v["id"].as_i64().expect("numeric id"))
        .collect()
}
