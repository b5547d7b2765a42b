//! Entity CRUD handlers: list, read, create, update, delete, nested create, transitions.

use crate::config::ResolvedEntity;
use crate::error::{AppError, ConfigError};
use crate::extractors::JsonObject;
use crate::response::{ack, success_id};
use crate::service::{CrudService, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};

/// Entity answering to `segment`, or 404 for unknown routes.
pub(crate) fn lookup<'a>(state: &'a AppState, segment: &str) -> Result<&'a ResolvedEntity, AppError> {
    state
        .model
        .entity_by_path(segment)
        .ok_or_else(|| AppError::NotFound(format!("No existe la ruta /{}.", segment)))
}

fn lookup_allowing<'a>(
    state: &'a AppState,
    segment: &str,
    operation: &str,
) -> Result<&'a ResolvedEntity, AppError> {
    let entity = lookup(state, segment)?;
    if !entity.allows(operation) {
        return Err(AppError::NotAllowed(format!(
            "La operación '{}' no está permitida sobre /{}.",
            operation, segment
        )));
    }
    Ok(entity)
}

/// Ids that are not integers can never match a row, so they are "not found" as well.
pub(crate) fn parse_id(entity: &ResolvedEntity, id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::NotFound(entity.not_found(id_str)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(segment): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entity = lookup_allowing(&state, &segment, "list")?;
    let rows = CrudService::list(&state.pool, entity).await?;
    Ok(Json(rows))
}

pub async fn read(
    State(state): State<AppState>,
    Path((segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = lookup_allowing(&state, &segment, "read")?;
    let id = parse_id(entity, &id_str)?;
    let row = CrudService::read(&state.pool, &state.model, entity, id)
        .await?
        .ok_or_else(|| AppError::NotFound(entity.not_found(&id_str)))?;
    Ok(Json(row))
}

pub async fn create(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    JsonObject(body): JsonObject,
) -> Result<impl IntoResponse, AppError> {
    let entity = lookup_allowing(&state, &segment, "create")?;
    let record = RequestValidator::validate(&body, entity)?;
    CrudService::ensure_parents_exist(&state.pool, &state.model, entity, &record).await?;
    let id = CrudService::create(&state.pool, entity, &record).await?;
    tracing::info!(entity = %entity.id, id, "created");
    Ok(success_id(id))
}

pub async fn update(
    State(state): State<AppState>,
    Path((segment, id_str)): Path<(String, String)>,
    JsonObject(body): JsonObject,
) -> Result<impl IntoResponse, AppError> {
    let entity = lookup_allowing(&state, &segment, "update")?;
    let id = parse_id(entity, &id_str)?;
    let record = RequestValidator::validate_partial(&body, entity)?;
    CrudService::ensure_parents_exist(&state.pool, &state.model, entity, &record).await?;
    if !CrudService::update(&state.pool, entity, id, &record).await? {
        return Err(AppError::NotFound(entity.not_found(&id_str)));
    }
    tracing::info!(entity = %entity.id, id, fields = record.len(), "updated");
    Ok(success_id(id))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = lookup_allowing(&state, &segment, "delete")?;
    let id = parse_id(entity, &id_str)?;
    if !CrudService::delete(&state.pool, entity, id).await? {
        return Err(AppError::NotFound(entity.not_found(&id_str)));
    }
    tracing::info!(entity = %entity.id, id, "deleted");
    Ok(ack())
}

/// `POST /{parent}/{id}/{child}`: create a child row owned by the parent in the path.
pub async fn create_nested(
    State(state): State<AppState>,
    Path((segment, id_str, child_segment)): Path<(String, String, String)>,
    JsonObject(mut body): JsonObject,
) -> Result<impl IntoResponse, AppError> {
    let parent = lookup(&state, &segment)?;
    let (child_id, foreign_key) = parent.nested_child(&child_segment).ok_or_else(|| {
        AppError::NotFound(format!("No existe la ruta /{}/{}/{}.", segment, id_str, child_segment))
    })?;
    let child = state.model.entity(child_id).ok_or_else(|| {
        AppError::NotFound(format!("No existe la ruta /{}/{}/{}.", segment, id_str, child_segment))
    })?;
    let parent_id = parse_id(parent, &id_str)?;
    if !CrudService::exists(&state.pool, parent, parent_id).await? {
        return Err(AppError::NotFound(parent.not_found(&id_str)));
    }

    body.insert(foreign_key.to_string(), Value::from(parent_id));
    let record = RequestValidator::validate(&body, child)?;
    let id = CrudService::create(&state.pool, child, &record).await?;
    tracing::info!(entity = %child.id, id, parent = %parent.id, parent_id, "created nested");
    Ok(success_id(id))
}

/// `PATCH /{entity}/{action}/{id}`: write the transition's fixed value. The body is ignored.
pub async fn transition(
    State(state): State<AppState>,
    Path((segment, action, id_str)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = lookup(&state, &segment)?;
    let transition = entity.transition(&action).ok_or_else(|| {
        AppError::NotFound(format!("No existe la ruta /{}/{}/{}.", segment, action, id_str))
    })?;
    let id = parse_id(entity, &id_str)?;
    let column = entity.column(&transition.column).ok_or_else(|| {
        AppError::Config(ConfigError::MissingReference {
            kind: "column",
            id: transition.column.clone(),
        })
    })?;
    let value = RequestValidator::coerce(column, &transition.value).ok_or_else(|| {
        AppError::Config(ConfigError::Validation(format!(
            "transition '{}' value does not fit column '{}'",
            action, column.name
        )))
    })?;

    let mut record = Map::new();
    record.insert(column.name.clone(), value);
    if !CrudService::update(&state.pool, entity, id, &record).await? {
        return Err(AppError::NotFound(entity.not_found(&id_str)));
    }
    tracing::info!(entity = %entity.id, id, action = %action, "transition applied");
    Ok(success_id(id))
}
