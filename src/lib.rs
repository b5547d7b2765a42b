//! Catalog API: model-driven REST CRUD backend over SQLite.
//!
//! A JSON model declares entities, columns with validation rules, relationships and
//! state transitions. The library resolves it, syncs the SQLite schema, seeds it and
//! serves generic CRUD routes for every entity.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod seed;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{load_model, resolve, ModelConfig, ResolvedEntity, ResolvedModel, ServerConfig};
pub use error::{AppError, ConfigError};
pub use migration::sync_schema;
pub use routes::{build_router, common_routes, entity_routes};
pub use seed::seed_if_empty;
pub use service::{CrudService, RequestValidator};
pub use state::AppState;
pub use store::create_pool;

use sqlx::SqlitePool;

/// Sync the schema and seed an empty store, then wrap pool and model into shared state.
pub async fn prepare(pool: SqlitePool, model: ResolvedModel) -> Result<AppState, AppError> {
    sync_schema(&pool, &model).await?;
    if seed_if_empty(&pool, &model).await? {
        tracing::info!(model = %model.name, "seed data inserted");
    }
    Ok(AppState::new(pool, model))
}
