//! Many-to-many link handlers: `/{entity}/{id}/{related}/{related_id}`.

use crate::config::{IncludeKind, JoinTable, ResolvedEntity};
use crate::error::AppError;
use crate::handlers::entity::{lookup, parse_id};
use crate::response::ack;
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

type LinkPath = (String, String, String, String);

/// Both ends resolved and verified to exist, ordered as the join table expects.
struct LinkTarget<'a> {
    join: &'a JoinTable,
    left_id: i64,
    right_id: i64,
}

async fn resolve_link<'a>(
    state: &'a AppState,
    (segment, id_str, related_segment, related_id_str): &LinkPath,
) -> Result<LinkTarget<'a>, AppError> {
    let entity = lookup(state, segment)?;
    let route_not_found = || {
        AppError::NotFound(format!(
            "No existe la ruta /{}/{}/{}/{}.",
            segment, id_str, related_segment, related_id_str
        ))
    };
    let (related_id, join_name) = match entity.include(related_segment).map(|i| &i.kind) {
        Some(IncludeKind::Linked {
            related, join_table, ..
        }) => (related.as_str(), join_table.as_str()),
        _ => return Err(route_not_found()),
    };
    let related: &ResolvedEntity = state.model.entity(related_id).ok_or_else(route_not_found)?;
    let join = state.model.join_table(join_name).ok_or_else(route_not_found)?;

    let id = parse_id(entity, id_str)?;
    if !CrudService::exists(&state.pool, entity, id).await? {
        return Err(AppError::NotFound(entity.not_found(id_str)));
    }
    let other_id = parse_id(related, related_id_str)?;
    if !CrudService::exists(&state.pool, related, other_id).await? {
        return Err(AppError::NotFound(related.not_found(related_id_str)));
    }

    let (left_id, right_id) = if join.left == entity.id {
        (id, other_id)
    } else {
        (other_id, id)
    };
    Ok(LinkTarget {
        join,
        left_id,
        right_id,
    })
}

pub async fn link(
    State(state): State<AppState>,
    Path(path): Path<LinkPath>,
) -> Result<impl IntoResponse, AppError> {
    let target = resolve_link(&state, &path).await?;
    CrudService::link(&state.pool, target.join, target.left_id, target.right_id).await?;
    tracing::info!(
        join_table = %target.join.name,
        left = target.left_id,
        right = target.right_id,
        "linked"
    );
    Ok(ack())
}

pub async fn unlink(
    State(state): State<AppState>,
    Path(path): Path<LinkPath>,
) -> Result<impl IntoResponse, AppError> {
    let target = resolve_link(&state, &path).await?;
    let removed = CrudService::unlink(&state.pool, target.join, target.left_id, target.right_id).await?;
    tracing::info!(
        join_table = %target.join.name,
        left = target.left_id,
        right = target.right_id,
        removed,
        "unlinked"
    );
    Ok(ack())
}
