//! Projects and programmers linked many-to-many.

mod common;

use axum::http::StatusCode;
use common::{build_test_app, delete, get, ids, post_json};
use serde_json::json;

#[tokio::test]
async fn detail_lists_linked_rows_in_both_directions() {
    let app = build_test_app("proyectos").await;

    let (status, proyecto) = get(&app, "/proyectos/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&proyecto["programadores"]), vec![1, 2]);
    assert_eq!(proyecto["programadores"][0]["nombre"], "Ada Lovelace");

    let (_, programador) = get(&app, "/programadores/3").await;
    assert_eq!(ids(&programador["proyectos"]), vec![2, 3]);
}

#[tokio::test]
async fn link_is_idempotent() {
    let app = build_test_app("proyectos").await;

    let (status, body) = post_json(&app, "/proyectos/3/programadores/4", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
    let (status, _) = post_json(&app, "/proyectos/3/programadores/4", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, proyecto) = get(&app, "/proyectos/3").await;
    assert_eq!(ids(&proyecto["programadores"]), vec![3, 4]);
}

#[tokio::test]
async fn link_from_the_other_side() {
    let app = build_test_app("proyectos").await;

    let (status, _) = post_json(&app, "/programadores/4/proyectos/1", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, proyecto) = get(&app, "/proyectos/1").await;
    assert_eq!(ids(&proyecto["programadores"]), vec![1, 2, 4]);
    let (_, programador) = get(&app, "/programadores/4").await;
    assert_eq!(ids(&programador["proyectos"]), vec![1]);
}

#[tokio::test]
async fn unlink_removes_only_that_pair() {
    let app = build_test_app("proyectos").await;

    let (status, body) = delete(&app, "/proyectos/1/programadores/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (_, programador) = get(&app, "/programadores/1").await;
    assert_eq!(ids(&programador["proyectos"]), vec![2]);

    let (status, _) = delete(&app, "/programadores/1/proyectos/1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn link_with_missing_side_is_not_found() {
    let app = build_test_app("proyectos").await;

    let (status, body) = post_json(&app, "/proyectos/99/programadores/1", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No se encontró el proyecto con ID 99.");

    let (status, body) = post_json(&app, "/proyectos/1/programadores/99", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No se encontró el programador con ID 99.");

    let (status, _) = post_json(&app, "/proyectos/1/clientes/1", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_project_drops_its_links() {
    let app = build_test_app("proyectos").await;

    let (status, _) = delete(&app, "/proyectos/1").await;
    assert_eq!(status, StatusCode::OK);

    let (_, programador) = get(&app, "/programadores/2").await;
    assert_eq!(programador["proyectos"], json!([]));
    let (_, programador) = get(&app, "/programadores/1").await;
    assert_eq!(ids(&programador["proyectos"]), vec![2]);
}

#[tokio::test]
async fn project_defaults_and_language_enum() {
    let app = build_test_app("proyectos").await;

    let (status, body) = post_json(&app, "/proyectos", json!({"titulo": "Compilador", "lenguaje": "C++"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 4}));
    let (_, proyecto) = get(&app, "/proyectos/4").await;
    assert_eq!(proyecto["activo"], true);
    assert!(proyecto["descripcion"].is_null());
    assert_eq!(proyecto["programadores"], json!([]));

    let (status, body) = post_json(&app, "/proyectos", json!({"titulo": "Kernel", "lenguaje": "RUST"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["errores"],
        json!(["El campo \"lenguaje\" debe ser una de las siguientes opciones: PHP, JAVASCRIPT, C++, JAVA"])
    );
}

#[tokio::test]
async fn programmer_seniority_range() {
    let app = build_test_app("proyectos").await;

    let (status, body) = post_json(
        &app,
        "/programadores",
        json!({"nombre": "Novato", "email": "novato@example.com", "seniority": 0}),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errores"], json!(["El campo \"seniority\" debe ser mayor o igual a 1"]));
}
