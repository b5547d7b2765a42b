//! Resolved entity model: config validated and flattened for runtime use.

use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use serde_json::Value;
use std::collections::HashMap;

/// Name of the primary key column on every entity table.
pub const PK_COLUMN: &str = "id";

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub type_: ColumnType,
    pub nullable: bool,
    pub default: Option<Value>,
    pub validation: ValidationRule,
    /// Only written through a transition endpoint, never from request bodies.
    pub managed: bool,
    /// Entity id this column points at (has-many foreign key on the child).
    pub references: Option<String>,
}

/// How a related collection is loaded for the detail response.
#[derive(Clone, Debug)]
pub enum IncludeKind {
    /// Rows of `child` whose `foreign_key` equals our id.
    Children {
        child: String,
        foreign_key: String,
        nested_path: Option<String>,
    },
    /// Rows of `related` linked to us through `join_table`.
    Linked {
        related: String,
        join_table: String,
        our_key: String,
        their_key: String,
    },
}

#[derive(Clone, Debug)]
pub struct IncludeSpec {
    pub name: String,
    pub kind: IncludeKind,
}

#[derive(Clone, Debug)]
pub struct Transition {
    pub action: String,
    pub column: String,
    pub value: Value,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub id: String,
    pub table_name: String,
    pub path_segment: String,
    pub aliases: Vec<String>,
    pub not_found_template: String,
    pub operations: Vec<String>,
    pub columns: Vec<ColumnInfo>,
    pub includes: Vec<IncludeSpec>,
    pub transitions: Vec<Transition>,
}

impl ResolvedEntity {
    pub fn allows(&self, operation: &str) -> bool {
        self.operations.iter().any(|o| o == operation)
    }

    /// Not-found message with the raw requested id interpolated.
    pub fn not_found(&self, id: &str) -> String {
        self.not_found_template.replace("{id}", id)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns accepted from request bodies.
    pub fn writable_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| !c.managed)
    }

    pub fn include(&self, name: &str) -> Option<&IncludeSpec> {
        self.includes.iter().find(|i| i.name == name)
    }

    /// Has-many include reachable through `POST /{self}/{id}/{segment}`.
    /// Matches the declared nested path or the collection name.
    pub fn nested_child(&self, segment: &str) -> Option<(&str, &str)> {
        self.includes.iter().find_map(|inc| match &inc.kind {
            IncludeKind::Children {
                child,
                foreign_key,
                nested_path,
            } if inc.name == segment || nested_path.as_deref() == Some(segment) => {
                Some((child.as_str(), foreign_key.as_str()))
            }
            _ => None,
        })
    }

    pub fn transition(&self, action: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.action == action)
    }
}

#[derive(Clone, Debug)]
pub struct JoinTable {
    pub name: String,
    pub left: String,
    pub right: String,
    pub left_key: String,
    pub right_key: String,
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub name: String,
    pub database_url: String,
    pub reset_on_start: bool,
    pub entities: Vec<ResolvedEntity>,
    pub join_tables: Vec<JoinTable>,
    pub seed: SeedConfig,
    entity_by_path: HashMap<String, usize>,
    entity_by_id: HashMap<String, usize>,
}

impl ResolvedModel {
    /// Entity answering to a path segment or one of its aliases.
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path).map(|&i| &self.entities[i])
    }

    pub fn entity(&self, id: &str) -> Option<&ResolvedEntity> {
        self.entity_by_id.get(id).map(|&i| &self.entities[i])
    }

    pub fn join_table(&self, name: &str) -> Option<&JoinTable> {
        self.join_tables.iter().find(|j| j.name == name)
    }
}

/// Validate the config and build the runtime model.
pub fn resolve(config: &ModelConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let mut entities: Vec<ResolvedEntity> = config
        .entities
        .iter()
        .map(|e| ResolvedEntity {
            id: e.id.clone(),
            table_name: e.table.clone(),
            path_segment: e.path_segment.clone(),
            aliases: e.aliases.clone(),
            not_found_template: e
                .not_found
                .clone()
                .unwrap_or_else(|| format!("No se encontró {} con ID {{id}}.", e.id)),
            operations: e.operations.clone(),
            columns: e
                .columns
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name.clone(),
                    type_: c.type_,
                    nullable: c.nullable,
                    default: c.default.clone(),
                    validation: c.validation.clone(),
                    managed: false,
                    references: None,
                })
                .collect(),
            includes: Vec::new(),
            transitions: Vec::new(),
        })
        .collect();

    let index: HashMap<String, usize> = entities
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.clone(), i))
        .collect();
    let idx = |id: &str| -> Result<usize, ConfigError> {
        index.get(id).copied().ok_or_else(|| ConfigError::MissingReference {
            kind: "entity",
            id: id.to_string(),
        })
    };

    let mut join_tables = Vec::new();
    for rel in &config.relationships {
        match rel {
            RelationshipConfig::HasMany {
                parent,
                child,
                foreign_key,
                as_name,
                nested_path,
            } => {
                let child_entity = &mut entities[idx(child)?];
                match child_entity.columns.iter_mut().find(|c| &c.name == foreign_key) {
                    Some(col) => col.references = Some(parent.clone()),
                    None => child_entity.columns.push(ColumnInfo {
                        name: foreign_key.clone(),
                        type_: ColumnType::Integer,
                        nullable: true,
                        default: None,
                        validation: ValidationRule::default(),
                        managed: false,
                        references: Some(parent.clone()),
                    }),
                }
                entities[idx(parent)?].includes.push(IncludeSpec {
                    name: as_name.clone(),
                    kind: IncludeKind::Children {
                        child: child.clone(),
                        foreign_key: foreign_key.clone(),
                        nested_path: nested_path.clone(),
                    },
                });
            }
            RelationshipConfig::ManyToMany {
                join_table,
                left,
                right,
                left_key,
                right_key,
                left_as,
                right_as,
            } => {
                entities[idx(left)?].includes.push(IncludeSpec {
                    name: left_as.clone(),
                    kind: IncludeKind::Linked {
                        related: right.clone(),
                        join_table: join_table.clone(),
                        our_key: left_key.clone(),
                        their_key: right_key.clone(),
                    },
                });
                entities[idx(right)?].includes.push(IncludeSpec {
                    name: right_as.clone(),
                    kind: IncludeKind::Linked {
                        related: left.clone(),
                        join_table: join_table.clone(),
                        our_key: right_key.clone(),
                        their_key: left_key.clone(),
                    },
                });
                join_tables.push(JoinTable {
                    name: join_table.clone(),
                    left: left.clone(),
                    right: right.clone(),
                    left_key: left_key.clone(),
                    right_key: right_key.clone(),
                });
            }
        }
    }

    for t in &config.transitions {
        let entity = &mut entities[idx(&t.entity)?];
        if let Some(col) = entity.columns.iter_mut().find(|c| c.name == t.column) {
            col.managed = true;
        }
        entity.transitions.push(Transition {
            action: t.action.clone(),
            column: t.column.clone(),
            value: t.value.clone(),
        });
    }

    let mut entity_by_path = HashMap::new();
    for (i, e) in entities.iter().enumerate() {
        entity_by_path.insert(e.path_segment.clone(), i);
        for alias in &e.aliases {
            entity_by_path.insert(alias.clone(), i);
        }
    }

    Ok(ResolvedModel {
        name: config.name.clone(),
        database_url: config.database_url.clone(),
        reset_on_start: config.reset_on_start,
        entities,
        join_tables,
        seed: config.seed.clone(),
        entity_by_path,
        entity_by_id: index,
    })
}
