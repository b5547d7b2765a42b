//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from resolved entity.

use crate::config::{JoinTable, ResolvedEntity, PK_COLUMN};
use serde_json::{Map, Value};

/// Quote identifier for SQLite (safe: only from config).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) {
        self.params.push(v);
    }
}

/// SELECT list: primary key first, then columns in declaration order, optionally table-qualified.
fn select_column_list(entity: &ResolvedEntity, alias: Option<&str>) -> String {
    let prefix = alias.map(|a| format!("{}.", a)).unwrap_or_default();
    std::iter::once(PK_COLUMN)
        .chain(entity.columns.iter().map(|c| c.name.as_str()))
        .map(|c| format!("{}{}", prefix, quoted(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT every row ordered by primary key.
pub fn select_list(entity: &ResolvedEntity) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(entity, None),
        quoted(&entity.table_name),
        quoted(PK_COLUMN)
    );
    q
}

pub fn select_by_id(entity: &ResolvedEntity, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        select_column_list(entity, None),
        quoted(&entity.table_name),
        quoted(PK_COLUMN)
    );
    q
}

/// Rows where `column` equals `value`, ordered by primary key. Loads has-many children.
pub fn select_by_column(entity: &ResolvedEntity, column: &str, value: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(value);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ? ORDER BY {}",
        select_column_list(entity, None),
        quoted(&entity.table_name),
        quoted(column),
        quoted(PK_COLUMN)
    );
    q
}

/// Rows of `related` linked to `id` through a join table.
pub fn select_linked(
    related: &ResolvedEntity,
    join_table: &str,
    our_key: &str,
    their_key: &str,
    id: i64,
) -> QueryBuf {
    const REL: &str = "r";
    const JOIN: &str = "j";
    let mut q = QueryBuf::new();
    q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT {cols} FROM {rel_table} {REL} JOIN {join} {JOIN} ON {JOIN}.{their} = {REL}.{pk} WHERE {JOIN}.{our} = ? ORDER BY {REL}.{pk}",
        cols = select_column_list(related, Some(REL)),
        rel_table = quoted(&related.table_name),
        join = quoted(join_table),
        their = quoted(their_key),
        our = quoted(our_key),
        pk = quoted(PK_COLUMN),
    );
    q
}

pub fn exists(entity: &ResolvedEntity, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT 1 FROM {} WHERE {} = ?",
        quoted(&entity.table_name),
        quoted(PK_COLUMN)
    );
    q
}

pub fn count(table: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT COUNT(*) FROM {}", quoted(table));
    q
}

/// INSERT: only columns present in the record, in declaration order. The store assigns the id.
pub fn insert(entity: &ResolvedEntity, record: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = quoted(&entity.table_name);
    let mut cols = Vec::new();
    for c in &entity.columns {
        if let Some(v) = record.get(&c.name) {
            cols.push(quoted(&c.name));
            q.push_param(v.clone());
        }
    }
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", table)
    } else {
        let placeholders = vec!["?"; cols.len()].join(", ");
        format!("INSERT INTO {} ({}) VALUES ({})", table, cols.join(", "), placeholders)
    };
    q
}

/// UPDATE by id: SET only columns present in the record, plus the update timestamp.
pub fn update(entity: &ResolvedEntity, id: i64, record: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &entity.columns {
        if let Some(v) = record.get(&c.name) {
            sets.push(format!("{} = ?", quoted(&c.name)));
            q.push_param(v.clone());
        }
    }
    sets.push(format!("{} = CURRENT_TIMESTAMP", quoted("updated_at")));
    q.push_param(Value::from(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quoted(&entity.table_name),
        sets.join(", "),
        quoted(PK_COLUMN)
    );
    q
}

pub fn delete(entity: &ResolvedEntity, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(Value::from(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        quoted(&entity.table_name),
        quoted(PK_COLUMN)
    );
    q
}

/// Link two rows; an existing link is left untouched.
pub fn insert_link(join: &JoinTable, left_id: i64, right_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(Value::from(left_id));
    q.push_param(Value::from(right_id));
    q.sql = format!(
        "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?, ?)",
        quoted(&join.name),
        quoted(&join.left_key),
        quoted(&join.right_key)
    );
    q
}

pub fn delete_link(join: &JoinTable, left_id: i64, right_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(Value::from(left_id));
    q.push_param(Value::from(right_id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ? AND {} = ?",
        quoted(&join.name),
        quoted(&join.left_key),
        quoted(&join.right_key)
    );
    q
}
