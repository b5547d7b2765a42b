mod common;

use axum::http::StatusCode;
use common::{build_test_app, get};

#[tokio::test]
async fn health_returns_ok() {
    let app = build_test_app("musicos").await;

    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn ready_checks_database() {
    let app = build_test_app("musicos").await;

    let (status, body) = get(&app, "/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn version_names_the_served_model() {
    let app = build_test_app("alumnos").await;

    let (status, body) = get(&app, "/version").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "catalog-api");
    assert_eq!(body["model"], "alumnos");
}
