//! Response bodies shared by all handlers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Body returned by create, update and transition: only the row id.
#[derive(Serialize, Debug)]
pub struct CreatedId {
    pub id: i64,
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

/// 409 body: every failing field rule, in column order.
#[derive(Serialize, Debug)]
pub struct ValidationBody {
    pub errores: Vec<String>,
}

pub fn success_id(id: i64) -> (StatusCode, Json<CreatedId>) {
    (StatusCode::OK, Json(CreatedId { id }))
}

/// Literal acknowledgment for delete and association endpoints.
pub fn ack() -> (StatusCode, Json<&'static str>) {
    (StatusCode::OK, Json("ok"))
}

pub fn error_body(message: String) -> ErrorBody {
    ErrorBody { error: message }
}

pub fn validation_body(errores: Vec<String>) -> ValidationBody {
    ValidationBody { errores }
}
