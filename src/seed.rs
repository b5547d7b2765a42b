//! Populate empty tables with the model's sample rows.
//!
//! Seed foreign keys and link ends are 1-based positions in the referenced
//! entity's seed rows. They are mapped to the ids the store actually assigns,
//! which differ from the positions once AUTOINCREMENT has handed out ids before.

use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::{AppError, ConfigError};
use crate::service::{CrudService, Record, RequestValidator};
use crate::sql;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Ids assigned to seed rows, per entity id, in seed order.
type SeededIds<'m> = HashMap<&'m str, Vec<i64>>;

/// Insert the seed rows and links when every entity table is empty.
/// Returns whether anything was inserted.
pub async fn seed_if_empty(pool: &SqlitePool, model: &ResolvedModel) -> Result<bool, AppError> {
    for entity in &model.entities {
        if CrudService::count(pool, &entity.table_name).await? > 0 {
            tracing::debug!(table = %entity.table_name, "table not empty, skipping seed");
            return Ok(false);
        }
    }
    if model.seed.tables.is_empty() && model.seed.links.is_empty() {
        return Ok(false);
    }

    let mut tx = pool.begin().await?;
    let mut seeded = SeededIds::new();
    let mut inserted = 0usize;
    for table in &model.seed.tables {
        let entity = model.entity(&table.entity).ok_or_else(|| ConfigError::MissingReference {
            kind: "entity",
            id: table.entity.clone(),
        })?;
        for row in &table.rows {
            let mut record = RequestValidator::validate(row, entity).map_err(|e| {
                ConfigError::Validation(format!("seed row for '{}': {}", entity.id, e))
            })?;
            remap_references(entity, &mut record, &seeded)?;
            let q = sql::insert(entity, &record);
            let id = sql::bind_all(sqlx::query(&q.sql), &q.params)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();
            seeded.entry(entity.id.as_str()).or_default().push(id);
            inserted += 1;
        }
    }
    for link in &model.seed.links {
        let join = model.join_table(&link.join_table).ok_or_else(|| ConfigError::MissingReference {
            kind: "join table",
            id: link.join_table.clone(),
        })?;
        let left = seeded_id(&seeded, &join.left, link.left)?;
        let right = seeded_id(&seeded, &join.right, link.right)?;
        let q = sql::insert_link(join, left, right);
        sql::bind_all(sqlx::query(&q.sql), &q.params)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!(
        model = %model.name,
        rows = inserted,
        links = model.seed.links.len(),
        "seeded empty database"
    );
    Ok(true)
}

/// Rewrite every foreign key in a seed record from seed position to stored id.
fn remap_references(
    entity: &ResolvedEntity,
    record: &mut Record,
    seeded: &SeededIds<'_>,
) -> Result<(), ConfigError> {
    for col in &entity.columns {
        let Some(parent) = col.references.as_deref() else { continue };
        let Some(position) = record.get(&col.name).and_then(Value::as_i64) else { continue };
        let id = seeded_id(seeded, parent, position)?;
        record.insert(col.name.clone(), Value::from(id));
    }
    Ok(())
}

fn seeded_id(seeded: &SeededIds<'_>, entity: &str, position: i64) -> Result<i64, ConfigError> {
    usize::try_from(position)
        .ok()
        .and_then(|p| p.checked_sub(1))
        .and_then(|i| seeded.get(entity)?.get(i).copied())
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "seed reference {} to '{}' does not name an earlier seed row",
                position, entity
            ))
        })
}
