//! Model validation: referential integrity and API consistency.

use crate::config::{ModelConfig, RelationshipConfig};
use crate::config::resolved::PK_COLUMN;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

const KNOWN_OPERATIONS: [&str; 5] = ["list", "read", "create", "update", "delete"];
const RESERVED_COLUMNS: [&str; 3] = [PK_COLUMN, "created_at", "updated_at"];
const KNOWN_FORMATS: [&str; 2] = ["email", "date"];

pub fn validate(config: &ModelConfig) -> Result<(), ConfigError> {
    if config.entities.is_empty() {
        return Err(ConfigError::Validation("at least one entity required".into()));
    }

    let mut entity_ids = HashSet::new();
    let mut tables = HashSet::new();
    let mut segments = HashSet::new();
    for e in &config.entities {
        if !entity_ids.insert(e.id.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate entity id '{}'", e.id)));
        }
        if !tables.insert(e.table.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate table '{}'", e.table)));
        }
        for seg in std::iter::once(&e.path_segment).chain(e.aliases.iter()) {
            if !segments.insert(seg.as_str()) {
                return Err(ConfigError::DuplicatePathSegment(seg.clone()));
            }
        }
        for op in &e.operations {
            if !KNOWN_OPERATIONS.contains(&op.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "entity '{}': unknown operation '{}'",
                    e.id, op
                )));
            }
        }
        let mut columns = HashSet::new();
        for c in &e.columns {
            if RESERVED_COLUMNS.contains(&c.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "entity '{}': column name '{}' is reserved",
                    e.id, c.name
                )));
            }
            if !columns.insert(c.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "entity '{}': duplicate column '{}'",
                    e.id, c.name
                )));
            }
            if let Some(ref pattern) = c.validation.pattern {
                Regex::new(pattern).map_err(|err| {
                    ConfigError::Validation(format!("invalid pattern for {}.{}: {}", e.id, c.name, err))
                })?;
            }
            if let Some(ref format) = c.validation.format {
                if !KNOWN_FORMATS.contains(&format.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "entity '{}': unknown format '{}' on column '{}'",
                        e.id, format, c.name
                    )));
                }
            }
        }
    }

    let require_entity = |id: &str| -> Result<(), ConfigError> {
        if entity_ids.contains(id) {
            Ok(())
        } else {
            Err(ConfigError::MissingReference {
                kind: "entity",
                id: id.to_string(),
            })
        }
    };

    let mut join_tables = HashSet::new();
    for r in &config.relationships {
        match r {
            RelationshipConfig::HasMany {
                parent,
                child,
                nested_path,
                ..
            } => {
                require_entity(parent)?;
                require_entity(child)?;
                if let Some(path) = nested_path {
                    if path.is_empty() {
                        return Err(ConfigError::Validation(format!(
                            "empty nested path on '{}' -> '{}'",
                            parent, child
                        )));
                    }
                }
            }
            RelationshipConfig::ManyToMany {
                join_table,
                left,
                right,
                left_key,
                right_key,
                ..
            } => {
                require_entity(left)?;
                require_entity(right)?;
                if left_key == right_key {
                    return Err(ConfigError::Validation(format!(
                        "join table '{}' needs two distinct keys",
                        join_table
                    )));
                }
                if tables.contains(join_table.as_str()) || !join_tables.insert(join_table.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "join table name '{}' already in use",
                        join_table
                    )));
                }
            }
        }
    }

    for t in &config.transitions {
        require_entity(&t.entity)?;
        let entity = config
            .entities
            .iter()
            .find(|e| e.id == t.entity)
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "entity",
                id: t.entity.clone(),
            })?;
        if !entity.columns.iter().any(|c| c.name == t.column) {
            return Err(ConfigError::MissingReference {
                kind: "column",
                id: format!("{}.{}", t.entity, t.column),
            });
        }
    }

    for table in &config.seed.tables {
        require_entity(&table.entity)?;
    }
    for link in &config.seed.links {
        if !join_tables.contains(link.join_table.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "join table",
                id: link.join_table.clone(),
            });
        }
    }

    Ok(())
}
