//! Load a model from the built-in set or from a JSON file on disk.

use crate::config::ModelConfig;
use crate::error::ConfigError;
use std::path::Path;

/// Names accepted by `MODEL` without a file path.
pub const BUILTIN_MODELS: [&str; 3] = ["musicos", "alumnos", "proyectos"];

pub fn builtin_model(name: &str) -> Option<&'static str> {
    match name {
        "musicos" => Some(include_str!("../../models/musicos.json")),
        "alumnos" => Some(include_str!("../../models/alumnos.json")),
        "proyectos" => Some(include_str!("../../models/proyectos.json")),
        _ => None,
    }
}

pub fn parse_model(raw: &str) -> Result<ModelConfig, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Resolve `source` as a built-in model name first, then as a file path.
pub async fn load_model(source: &str) -> Result<ModelConfig, ConfigError> {
    if let Some(raw) = builtin_model(source) {
        return parse_model(raw);
    }
    let path = Path::new(source);
    if !path.is_file() {
        return Err(ConfigError::UnknownModel(source.to_string()));
    }
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_model(&raw)
}
