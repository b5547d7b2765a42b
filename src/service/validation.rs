//! Request validation from per-column rules.
//!
//! Every rule of every present field is evaluated and all failures are
//! reported together. A value that passes its rules is then coerced to the
//! column type, so the returned record is ready to bind.

use crate::config::{ColumnInfo, ColumnType, ResolvedEntity};
use crate::error::AppError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Coerced column values keyed by column name.
pub type Record = Map<String, Value>;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full record for insertion. Missing non-nullable columns are
    /// reported unless the column declares a default, which is filled in.
    pub fn validate(body: &Map<String, Value>, entity: &ResolvedEntity) -> Result<Record, AppError> {
        let mut record = Record::new();
        let mut errors = Vec::new();
        for col in entity.writable_columns() {
            match (body.get(&col.name), &col.default) {
                (Some(v), _) => check_present(col, v, &mut record, &mut errors),
                (None, Some(default)) => check_field(col, default, &mut record, &mut errors),
                (None, None) if col.nullable => {}
                (None, None) => errors.push(message(col, "not_null", || default_not_null(col))),
            }
        }
        finish(record, errors)
    }

    /// Validate only the fields present in body (for PATCH). Missing fields are not required.
    pub fn validate_partial(
        body: &Map<String, Value>,
        entity: &ResolvedEntity,
    ) -> Result<Record, AppError> {
        let mut record = Record::new();
        let mut errors = Vec::new();
        for col in entity.writable_columns() {
            if let Some(v) = body.get(&col.name) {
                check_present(col, v, &mut record, &mut errors);
            }
        }
        finish(record, errors)
    }

    /// Coerce a single value for a column without running its rules (transition values).
    pub fn coerce(col: &ColumnInfo, v: &Value) -> Option<Value> {
        coerce(col.type_, v)
    }
}

fn finish(record: Record, errors: Vec<String>) -> Result<Record, AppError> {
    if errors.is_empty() {
        Ok(record)
    } else {
        Err(AppError::Validation(errors))
    }
}

fn check_present(col: &ColumnInfo, v: &Value, record: &mut Record, errors: &mut Vec<String>) {
    if v.is_null() {
        if col.nullable {
            record.insert(col.name.clone(), Value::Null);
        } else {
            errors.push(message(col, "not_null", || default_not_null(col)));
        }
        return;
    }
    check_field(col, v, record, errors);
}

fn check_field(col: &ColumnInfo, v: &Value, record: &mut Record, errors: &mut Vec<String>) {
    let before = errors.len();
    apply_rules(col, v, errors);
    if errors.len() > before {
        return;
    }
    match coerce(col.type_, v) {
        Some(coerced) => {
            record.insert(col.name.clone(), coerced);
        }
        None => errors.push(message(col, "type", || {
            format!("El campo \"{}\" tiene un tipo de dato inválido", col.name)
        })),
    }
}

fn apply_rules(col: &ColumnInfo, v: &Value, errors: &mut Vec<String>) {
    let rule = &col.validation;
    let name = col.name.as_str();

    if rule.not_empty {
        if let Some(s) = v.as_str() {
            if s.trim().is_empty() {
                errors.push(message(col, "not_empty", || {
                    format!("El campo \"{}\" no puede estar vacío", name)
                }));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() < min as usize {
                errors.push(message(col, "min_length", || {
                    format!("El campo \"{}\" debe tener al menos {} caracteres", name, min)
                }));
            }
        }
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > max as usize {
                errors.push(message(col, "max_length", || {
                    format!("El campo \"{}\" debe tener como máximo {} caracteres", name, max)
                }));
            }
        }
    }
    if let Some(ref pattern) = rule.pattern {
        if let (Some(s), Ok(re)) = (v.as_str(), Regex::new(pattern)) {
            if !re.is_match(s) {
                errors.push(message(col, "pattern", || {
                    format!("El campo \"{}\" no tiene el formato requerido", name)
                }));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| allowed_matches(col, v, a)) {
            errors.push(message(col, "allowed", || {
                let options: Vec<String> = allowed.iter().map(display_value).collect();
                format!(
                    "El campo \"{}\" debe ser una de las siguientes opciones: {}",
                    name,
                    options.join(", ")
                )
            }));
        }
    }
    if let Some(min) = rule.minimum {
        if let Some(n) = as_number(v) {
            if n < min {
                errors.push(message(col, "minimum", || {
                    format!("El campo \"{}\" debe ser mayor o igual a {}", name, min)
                }));
            }
        }
    }
    if let Some(max) = rule.maximum {
        if let Some(n) = as_number(v) {
            if n > max {
                errors.push(message(col, "maximum", || {
                    format!("El campo \"{}\" debe ser menor o igual a {}", name, max)
                }));
            }
        }
    }
    if let Some(ref format) = rule.format {
        validate_format(col, v, format, errors);
    }
}

fn validate_format(col: &ColumnInfo, v: &Value, format: &str, errors: &mut Vec<String>) {
    let Some(s) = v.as_str() else { return };
    match format {
        "email" => {
            if !email_regex().is_match(s) {
                errors.push(message(col, "format", || {
                    format!("El campo \"{}\" debe ser un email válido", col.name)
                }));
            }
        }
        "date" => {
            if parse_date(s).is_none() {
                errors.push(message(col, "format", || {
                    format!("El campo \"{}\" debe ser una fecha válida", col.name)
                }));
            }
        }
        _ => {}
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn message(col: &ColumnInfo, rule: &str, fallback: impl FnOnce() -> String) -> String {
    col.validation
        .messages
        .get(rule)
        .cloned()
        .unwrap_or_else(fallback)
}

fn default_not_null(col: &ColumnInfo) -> String {
    format!("El campo \"{}\" no puede ser nulo", col.name)
}

/// Booleans match by meaning, so `"true"` and `1` count as `true`.
fn allowed_matches(col: &ColumnInfo, v: &Value, allowed: &Value) -> bool {
    match col.type_ {
        ColumnType::Boolean => match coerce(ColumnType::Boolean, v) {
            Some(b) => coerce(ColumnType::Boolean, allowed) == Some(b),
            None => false,
        },
        _ => value_eq(v, allowed),
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepted date inputs: ISO date, RFC 3339, ISO datetime, and US `MM/DD/YYYY`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|d| d.date())
        })
        .or_else(|| NaiveDate::parse_from_str(s, "%m/%d/%Y").ok())
}

/// Whole number inside i64. `as` would saturate anything larger.
fn is_integral_i64(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

fn coerce(type_: ColumnType, v: &Value) -> Option<Value> {
    match type_ {
        ColumnType::Text => match v {
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            _ => None,
        },
        ColumnType::Integer => match v {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| is_integral_i64(*f)).map(|f| f as i64))
                .map(Value::from),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        ColumnType::Boolean => match v {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            Value::String(s) => match s.trim() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        ColumnType::Date => v
            .as_str()
            .and_then(parse_date)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin_model, parse_model, resolve, ResolvedModel};
    use serde_json::json;

    fn model(name: &str) -> ResolvedModel {
        resolve(&parse_model(builtin_model(name).unwrap()).unwrap()).unwrap()
    }

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    fn errors_of(r: Result<Record, AppError>) -> Vec<String> {
        match r {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_musician_fills_default_and_coerces() {
        let m = model("musicos");
        let musico = m.entity("musico").unwrap();
        let record =
            RequestValidator::validate(&body(json!({"nombre": "Flea", "instrumento": "bajo"})), musico)
                .unwrap();
        assert_eq!(record["en_actividad"], json!(true));
        assert_eq!(record["nombre"], json!("Flea"));

        let record = RequestValidator::validate(
            &body(json!({"nombre": "Flea", "instrumento": "bajo", "en_actividad": 0})),
            musico,
        )
        .unwrap();
        assert_eq!(record["en_actividad"], json!(false));
    }

    #[test]
    fn collects_every_failing_field() {
        let m = model("musicos");
        let errors = errors_of(RequestValidator::validate(
            &body(json!({"nombre": "", "instrumento": "flauta"})),
            m.entity("musico").unwrap(),
        ));
        assert_eq!(
            errors,
            vec![
                "El campo \"nombre\" no puede estar vacío".to_string(),
                "El campo \"instrumento\" debe ser una de las siguientes opciones: guitarra, batería, bajo, voz o teclado"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn missing_required_fields_report_not_null() {
        let m = model("musicos");
        let errors = errors_of(RequestValidator::validate(&body(json!({})), m.entity("musico").unwrap()));
        assert_eq!(
            errors,
            vec![
                "El campo \"nombre\" no puede ser nulo".to_string(),
                "El campo \"instrumento\" no puede ser nulo".to_string(),
            ]
        );
    }

    #[test]
    fn explicit_null_on_defaulted_column_is_rejected() {
        let m = model("musicos");
        let errors = errors_of(RequestValidator::validate(
            &body(json!({"nombre": "X", "instrumento": "voz", "en_actividad": null})),
            m.entity("musico").unwrap(),
        ));
        assert_eq!(errors, vec!["El campo \"en_actividad\" no puede ser nulo".to_string()]);
    }

    #[test]
    fn boolean_outside_allowed_set_uses_configured_message() {
        let m = model("musicos");
        let errors = errors_of(RequestValidator::validate_partial(
            &body(json!({"en_actividad": "quizas"})),
            m.entity("musico").unwrap(),
        ));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("El campo \"en_actividad\" debe ser una de las siguientes opciones"));
    }

    #[test]
    fn numeric_range_and_type() {
        let m = model("musicos");
        let cancion = m.entity("cancion").unwrap();
        let errors = errors_of(RequestValidator::validate(
            &body(json!({"titulo": "X", "anio": 2101})),
            cancion,
        ));
        assert_eq!(errors, vec!["El campo \"anio\" debe ser menor o igual a 2100".to_string()]);

        let errors = errors_of(RequestValidator::validate(
            &body(json!({"titulo": "X", "anio": "abc"})),
            cancion,
        ));
        assert_eq!(errors, vec!["El campo \"anio\" tiene un tipo de dato inválido".to_string()]);

        let record =
            RequestValidator::validate(&body(json!({"titulo": "X", "anio": "1999"})), cancion).unwrap();
        assert_eq!(record["anio"], json!(1999));
    }

    #[test]
    fn partial_ignores_missing_unknown_and_managed_fields() {
        let m = model("alumnos");
        let cursada = m.entity("cursada").unwrap();
        let record = RequestValidator::validate_partial(
            &body(json!({"materia": "Algebra", "aprobada": true, "id": 99, "otro": 1})),
            cursada,
        )
        .unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record["materia"], json!("Algebra"));
    }

    #[test]
    fn email_and_date_formats() {
        let m = model("alumnos");
        let alumno = m.entity("alumno").unwrap();
        let errors = errors_of(RequestValidator::validate(
            &body(json!({"nombre": "A", "email": "no-es-email", "fecha_nacimiento": "ayer"})),
            alumno,
        ));
        assert_eq!(
            errors,
            vec![
                "El campo \"email\" debe ser un email válido".to_string(),
                "El campo \"fecha_nacimiento\" debe ser una fecha válida".to_string(),
            ]
        );

        let record = RequestValidator::validate(
            &body(json!({"nombre": "A", "email": "a@b.com", "fecha_nacimiento": "02/03/1996"})),
            alumno,
        )
        .unwrap();
        assert_eq!(record["fecha_nacimiento"], json!("1996-02-03"));
    }

    #[test]
    fn enum_language_rejects_unknown_value() {
        let m = model("proyectos");
        let errors = errors_of(RequestValidator::validate(
            &body(json!({"titulo": "X", "lenguaje": "RUST"})),
            m.entity("proyecto").unwrap(),
        ));
        assert_eq!(
            errors,
            vec!["El campo \"lenguaje\" debe ser una de las siguientes opciones: PHP, JAVASCRIPT, C++, JAVA".to_string()]
        );
    }

    #[test]
    fn parse_date_accepts_known_formats() {
        let expected = NaiveDate::from_ymd_opt(1996, 2, 3);
        assert_eq!(parse_date("1996-02-03"), expected);
        assert_eq!(parse_date("1996-02-03T10:00:00Z"), expected);
        assert_eq!(parse_date("1996-02-03T10:00:00"), expected);
        assert_eq!(parse_date("02/03/1996"), expected);
        assert_eq!(parse_date("31/31/1996"), None);
    }

    #[test]
    fn integral_float_outside_i64_is_a_type_error() {
        let m = model("alumnos");
        let cursada = m.entity("cursada").unwrap();
        let errors = errors_of(RequestValidator::validate(
            &body(json!({"materia": "X", "anio": 1e30, "cuatrimestre": 1})),
            cursada,
        ));
        assert_eq!(errors, vec!["El campo \"anio\" tiene un tipo de dato inválido".to_string()]);

        let record = RequestValidator::validate(
            &body(json!({"materia": "X", "anio": 2019.0, "cuatrimestre": 1})),
            cursada,
        )
        .unwrap();
        assert_eq!(record["anio"], json!(2019));
    }

    #[test]
    fn boolean_allowed_set_accepts_string_forms() {
        let m = model("musicos");
        let musico = m.entity("musico").unwrap();
        for (raw, expected) in [("true", true), ("1", true), ("false", false), ("0", false)] {
            let record = RequestValidator::validate(
                &body(json!({"nombre": "Flea", "instrumento": "bajo", "en_actividad": raw})),
                musico,
            )
            .unwrap();
            assert_eq!(record["en_actividad"], json!(expected), "input {:?}", raw);
        }
        let errors = errors_of(RequestValidator::validate(
            &body(json!({"nombre": "Flea", "instrumento": "bajo", "en_actividad": 2})),
            musico,
        ));
        assert!(errors[0].starts_with("El campo \"en_actividad\" debe ser una de las siguientes opciones"));
    }
}
