//! Raw model types matching the JSON model files under `models/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    Boolean,
    Date,
}

impl ColumnType {
    pub fn sqlite_type(&self) -> &'static str {
        match self {
            ColumnType::Text | ColumnType::Date => "TEXT",
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
        }
    }
}

/// Field rules evaluated before persistence. Every rule is optional; `messages`
/// overrides the default text per rule name (`not_null`, `not_empty`, `allowed`,
/// `minimum`, `maximum`, `min_length`, `max_length`, `pattern`, `format`, `type`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub not_empty: bool,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ColumnType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub validation: ValidationRule,
}

fn default_true() -> bool {
    true
}

fn default_operations() -> Vec<String> {
    ["list", "read", "create", "update", "delete"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub id: String,
    pub table: String,
    pub path_segment: String,
    /// Extra path segments answering for this entity (e.g. "alumno" for "alumnos").
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Message for missing rows; `{id}` is replaced by the requested id.
    #[serde(default)]
    pub not_found: Option<String>,
    #[serde(default = "default_operations")]
    pub operations: Vec<String>,
    pub columns: Vec<ColumnConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipConfig {
    /// Parent owns many children through a foreign key column on the child.
    HasMany {
        parent: String,
        child: String,
        foreign_key: String,
        /// Name of the children collection in the parent's detail response.
        #[serde(rename = "as")]
        as_name: String,
        /// Extra segment for `POST /{parent}/{id}/{nested_path}`.
        #[serde(default)]
        nested_path: Option<String>,
    },
    /// Links recorded in a join table keyed by both ids.
    ManyToMany {
        join_table: String,
        left: String,
        right: String,
        left_key: String,
        right_key: String,
        /// Collection name of right rows when reading a left row.
        left_as: String,
        /// Collection name of left rows when reading a right row.
        right_as: String,
    },
}

/// A dedicated endpoint `PATCH /{entity}/{action}/{id}` writing a fixed value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub entity: String,
    pub action: String,
    pub column: String,
    pub value: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeedTable {
    pub entity: String,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeedLink {
    pub join_table: String,
    pub left: i64,
    pub right: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub tables: Vec<SeedTable>,
    #[serde(default)]
    pub links: Vec<SeedLink>,
}

/// One whole model: what a single server process exposes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    /// Default database URL when `DATABASE_URL` is unset.
    pub database_url: String,
    /// Drop and recreate every table at startup.
    #[serde(default)]
    pub reset_on_start: bool,
    pub entities: Vec<EntityConfig>,
    #[serde(default)]
    pub relationships: Vec<RelationshipConfig>,
    #[serde(default)]
    pub transitions: Vec<TransitionConfig>,
    #[serde(default)]
    pub seed: SeedConfig,
}
