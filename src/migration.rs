//! Apply the model to the database: tables for every entity plus join tables.

use crate::config::{JoinTable, ResolvedEntity, ResolvedModel, PK_COLUMN};
use crate::error::AppError;
use crate::sql::quoted;
use sqlx::SqlitePool;

/// Create missing tables. With `reset_on_start`, every model table is dropped first.
pub async fn sync_schema(pool: &SqlitePool, model: &ResolvedModel) -> Result<(), AppError> {
    if model.reset_on_start {
        drop_tables(pool, model).await?;
    }
    for entity in &model.entities {
        sqlx::query(&create_table_sql(entity, model)).execute(pool).await?;
        for col in entity.columns.iter().filter(|c| c.references.is_some()) {
            let sql = format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quoted(&format!("idx_{}_{}", entity.table_name, col.name)),
                quoted(&entity.table_name),
                quoted(&col.name)
            );
            sqlx::query(&sql).execute(pool).await?;
        }
    }
    for join in &model.join_tables {
        sqlx::query(&create_join_table_sql(join, model)).execute(pool).await?;
    }
    tracing::info!(model = %model.name, reset = model.reset_on_start, "schema synchronized");
    Ok(())
}

async fn drop_tables(pool: &SqlitePool, model: &ResolvedModel) -> Result<(), AppError> {
    let tables = model
        .join_tables
        .iter()
        .map(|j| j.name.as_str())
        .chain(model.entities.iter().rev().map(|e| e.table_name.as_str()));
    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quoted(table)))
            .execute(pool)
            .await?;
    }
    tracing::info!(model = %model.name, "dropped existing tables");
    Ok(())
}

fn create_table_sql(entity: &ResolvedEntity, model: &ResolvedModel) -> String {
    let mut col_defs = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quoted(PK_COLUMN))];
    for c in &entity.columns {
        let mut def = format!("{} {}", quoted(&c.name), c.type_.sqlite_type());
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(parent) = c.references.as_deref().and_then(|p| model.entity(p)) {
            def.push_str(&format!(
                " REFERENCES {} ({}) ON DELETE SET NULL",
                quoted(&parent.table_name),
                quoted(PK_COLUMN)
            ));
        }
        col_defs.push(def);
    }
    for (name, def_suffix) in [
        ("created_at", "TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP"),
        ("updated_at", "TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP"),
    ] {
        col_defs.push(format!("{} {}", quoted(name), def_suffix));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(&entity.table_name),
        col_defs.join(",\n  ")
    )
}

fn create_join_table_sql(join: &JoinTable, model: &ResolvedModel) -> String {
    let reference = |entity_id: &str| {
        model
            .entity(entity_id)
            .map(|e| format!(" REFERENCES {} ({}) ON DELETE CASCADE", quoted(&e.table_name), quoted(PK_COLUMN)))
            .unwrap_or_default()
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n  {lk} INTEGER NOT NULL{lref},\n  {rk} INTEGER NOT NULL{rref},\n  {created} TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,\n  PRIMARY KEY ({lk}, {rk})\n)",
        table = quoted(&join.name),
        lk = quoted(&join.left_key),
        rk = quoted(&join.right_key),
        lref = reference(&join.left),
        rref = reference(&join.right),
        created = quoted("created_at"),
    )
}
