//! Entity routes. One parameterized set serves every entity in the model; handlers resolve
//! the entity from the first path segment.
//!
//! Three-segment paths are shared: POST is a nested create (`/{parent}/{id}/{child}`),
//! PATCH is a transition (`/{entity}/{action}/{id}`). Parameter names must agree per
//! position across routes.

use crate::handlers::{
    create, create_nested, delete as delete_handler, link, list, read, transition, unlink, update,
};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:path_segment", get(list).post(create))
        .route(
            "/:path_segment/:id",
            get(read).patch(update).delete(delete_handler),
        )
        .route("/:path_segment/:id/:sub", post(create_nested).patch(transition))
        .route(
            "/:path_segment/:id/:sub/:sub_id",
            post(link).delete(unlink),
        )
        .with_state(state)
}
