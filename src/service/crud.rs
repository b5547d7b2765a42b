//! Generic CRUD execution against SQLite.

use crate::config::{ColumnType, IncludeKind, JoinTable, ResolvedEntity, ResolvedModel, PK_COLUMN};
use crate::error::AppError;
use crate::service::validation::Record;
use crate::sql::{self, bind_all, QueryBuf};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

pub struct CrudService;

impl CrudService {
    /// All rows of the entity ordered by id, without related collections.
    pub async fn list(pool: &SqlitePool, entity: &ResolvedEntity) -> Result<Vec<Value>, AppError> {
        let q = sql::select_list(entity);
        Self::query_many(pool, entity, &q).await
    }

    /// Fetch one row by id together with every related collection the entity declares.
    pub async fn read(
        pool: &SqlitePool,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        id: i64,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::select_by_id(entity, id);
        let Some(mut row) = Self::query_one(pool, entity, &q).await? else {
            return Ok(None);
        };
        if let Value::Object(ref mut map) = row {
            for inc in &entity.includes {
                let related = Self::load_include(pool, model, &inc.kind, id).await?;
                map.insert(inc.name.clone(), Value::Array(related));
            }
        }
        Ok(Some(row))
    }

    async fn load_include(
        pool: &SqlitePool,
        model: &ResolvedModel,
        kind: &IncludeKind,
        id: i64,
    ) -> Result<Vec<Value>, AppError> {
        match kind {
            IncludeKind::Children {
                child, foreign_key, ..
            } => {
                let child = Self::entity(model, child)?;
                let q = sql::select_by_column(child, foreign_key, Value::from(id));
                Self::query_many(pool, child, &q).await
            }
            IncludeKind::Linked {
                related,
                join_table,
                our_key,
                their_key,
            } => {
                let related = Self::entity(model, related)?;
                let q = sql::select_linked(related, join_table, our_key, their_key, id);
                Self::query_many(pool, related, &q).await
            }
        }
    }

    pub async fn exists(pool: &SqlitePool, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError> {
        let q = sql::exists(entity, id);
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn count(pool: &SqlitePool, table: &str) -> Result<i64, AppError> {
        let q = sql::count(table);
        let n: i64 = sqlx::query_scalar(&q.sql).fetch_one(pool).await?;
        Ok(n)
    }

    /// Every non-null foreign key in the record must point at an existing parent row.
    /// Returns the parent's not-found message for the first one that does not.
    pub async fn ensure_parents_exist(
        pool: &SqlitePool,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        record: &Record,
    ) -> Result<(), AppError> {
        for col in &entity.columns {
            let Some(parent_id) = col.references.as_deref() else { continue };
            let Some(value) = record.get(&col.name).and_then(Value::as_i64) else { continue };
            let parent = Self::entity(model, parent_id)?;
            if !Self::exists(pool, parent, value).await? {
                return Err(AppError::NotFound(parent.not_found(&value.to_string())));
            }
        }
        Ok(())
    }

    /// Insert one validated record. Returns the id assigned by the store.
    pub async fn create(pool: &SqlitePool, entity: &ResolvedEntity, record: &Record) -> Result<i64, AppError> {
        let q = sql::insert(entity, record);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let result = bind_all(sqlx::query(&q.sql), &q.params).execute(pool).await?;
        Ok(result.last_insert_rowid())
    }

    /// Update the given fields of one row. Returns whether a row matched.
    pub async fn update(
        pool: &SqlitePool,
        entity: &ResolvedEntity,
        id: i64,
        record: &Record,
    ) -> Result<bool, AppError> {
        if record.is_empty() {
            return Self::exists(pool, entity, id).await;
        }
        let q = sql::update(entity, id, record);
        Self::execute(pool, &q).await.map(|n| n > 0)
    }

    /// Hard delete by id. Returns whether a row was removed.
    pub async fn delete(pool: &SqlitePool, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError> {
        let q = sql::delete(entity, id);
        Self::execute(pool, &q).await.map(|n| n > 0)
    }

    /// Record a link in the join table. Linking twice keeps one row.
    pub async fn link(pool: &SqlitePool, join: &JoinTable, left_id: i64, right_id: i64) -> Result<(), AppError> {
        let q = sql::insert_link(join, left_id, right_id);
        Self::execute(pool, &q).await.map(|_| ())
    }

    /// Remove a link. Returns whether one existed.
    pub async fn unlink(pool: &SqlitePool, join: &JoinTable, left_id: i64, right_id: i64) -> Result<bool, AppError> {
        let q = sql::delete_link(join, left_id, right_id);
        Self::execute(pool, &q).await.map(|n| n > 0)
    }

    fn entity<'m>(model: &'m ResolvedModel, id: &str) -> Result<&'m ResolvedEntity, AppError> {
        model.entity(id).ok_or_else(|| {
            AppError::Config(crate::error::ConfigError::MissingReference {
                kind: "entity",
                id: id.to_string(),
            })
        })
    }

    async fn execute(pool: &SqlitePool, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let result = bind_all(sqlx::query(&q.sql), &q.params).execute(pool).await?;
        Ok(result.rows_affected())
    }

    async fn query_one(
        pool: &SqlitePool,
        entity: &ResolvedEntity,
        q: &QueryBuf,
    ) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(pool)
            .await?;
        row.map(|r| row_to_json(&r, entity)).transpose()
    }

    async fn query_many(
        pool: &SqlitePool,
        entity: &ResolvedEntity,
        q: &QueryBuf,
    ) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(pool)
            .await?;
        rows.iter().map(|r| row_to_json(r, entity)).collect()
    }
}

/// Decode a row by the entity's declared column types.
fn row_to_json(row: &SqliteRow, entity: &ResolvedEntity) -> Result<Value, AppError> {
    let mut map = serde_json::Map::new();
    let id: i64 = row.try_get(PK_COLUMN)?;
    map.insert(PK_COLUMN.to_string(), Value::from(id));
    for col in &entity.columns {
        let name = col.name.as_str();
        let v = match col.type_ {
            ColumnType::Integer => row.try_get::<Option<i64>, _>(name)?.map(Value::from),
            ColumnType::Boolean => row
                .try_get::<Option<i64>, _>(name)?
                .map(|n| Value::Bool(n != 0)),
            ColumnType::Text | ColumnType::Date => {
                row.try_get::<Option<String>, _>(name)?.map(Value::String)
            }
        };
        map.insert(name.to_string(), v.unwrap_or(Value::Null));
    }
    Ok(Value::Object(map))
}
