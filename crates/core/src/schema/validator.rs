//! Schema interpreter: pure logic, no database access.

use chrono::NaiveDate;
use serde_json::Value;
use validator::ValidateEmail;

use super::rules::{FieldKind, FieldViolation, Schema};
use crate::error::CoreError;
use crate::types::JsonMap;

pub const MSG_REQUIRED: &str = "Missing data for required field.";
pub const MSG_NULL: &str = "Field may not be null.";
pub const MSG_UNKNOWN: &str = "Unknown field.";

/// Validate `data` against `schema`, returning the normalized mapping.
///
/// Every violation is collected; the error lists all of them in schema
/// order followed by unknown keys in input order.
pub fn validate(schema: &Schema, data: &JsonMap) -> Result<JsonMap, CoreError> {
    let mut violations = Vec::new();
    let normalized = validate_object(schema, data, "", &mut violations);
    if violations.is_empty() {
        Ok(normalized)
    } else {
        Err(CoreError::Schema(violations))
    }
}

/// Project a stored document onto the keys `schema` declares, recursing
/// into nested objects. Used when serializing, so it never fails.
pub fn dump(schema: &Schema, data: &JsonMap) -> JsonMap {
    let mut out = JsonMap::new();
    for rule in &schema.fields {
        if let Some(value) = data.get(rule.name) {
            out.insert(rule.name.to_string(), dump_value(&rule.kind, value));
        }
    }
    out
}

/// Trim surrounding whitespace and drop control characters other than
/// newlines and tabs.
pub fn sanitize_text(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn dump_value(kind: &FieldKind, value: &Value) -> Value {
    match (kind, value) {
        (FieldKind::Nested(schema), Value::Object(map)) => Value::Object(dump(schema, map)),
        (FieldKind::List(inner), Value::Array(items)) => {
            Value::Array(items.iter().map(|v| dump_value(inner, v)).collect())
        }
        _ => value.clone(),
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn validate_object(
    schema: &Schema,
    data: &JsonMap,
    prefix: &str,
    violations: &mut Vec<FieldViolation>,
) -> JsonMap {
    let mut out = JsonMap::new();

    for rule in &schema.fields {
        let path = join(prefix, rule.name);
        match data.get(rule.name) {
            None => {
                if rule.required {
                    violations.push(FieldViolation::new(path, MSG_REQUIRED));
                }
            }
            Some(Value::Null) => violations.push(FieldViolation::new(path, MSG_NULL)),
            Some(value) => {
                if let Some(v) = validate_value(&rule.kind, value, &path, violations) {
                    out.insert(rule.name.to_string(), v);
                }
            }
        }
    }

    for key in data.keys() {
        if schema.field(key).is_none() {
            violations.push(FieldViolation::new(join(prefix, key), MSG_UNKNOWN));
        }
    }

    out
}

fn validate_value(
    kind: &FieldKind,
    value: &Value,
    path: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<Value> {
    let result = match kind {
        FieldKind::Text { min_length } => check_text(value, *min_length),
        FieldKind::Integer => check_integer(value),
        FieldKind::Email => check_email(value),
        FieldKind::Date => check_date(value),
        FieldKind::PersistentIdentifier => check_pid(value),
        FieldKind::List(inner) => {
            let items = match value.as_array() {
                Some(items) => items,
                None => {
                    violations.push(FieldViolation::new(path, "Not a valid list."));
                    return None;
                }
            };
            let before = violations.len();
            let out: Vec<Value> = items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    let item_path = join(path, &i.to_string());
                    if item.is_null() {
                        violations.push(FieldViolation::new(item_path, MSG_NULL));
                        return None;
                    }
                    validate_value(inner, item, &item_path, violations)
                })
                .collect();
            return (violations.len() == before).then_some(Value::Array(out));
        }
        FieldKind::Nested(schema) => {
            let map = match value.as_object() {
                Some(map) => map,
                None => {
                    violations.push(FieldViolation::new(path, "Invalid input type."));
                    return None;
                }
            };
            let before = violations.len();
            let out = validate_object(schema, map, path, violations);
            return (violations.len() == before).then_some(Value::Object(out));
        }
    };

    match result {
        Ok(v) => Some(v),
        Err(message) => {
            violations.push(FieldViolation::new(path, message));
            None
        }
    }
}

fn check_text(value: &Value, min_length: Option<usize>) -> Result<Value, String> {
    let s = value.as_str().ok_or_else(|| "Not a valid string.".to_string())?;
    let clean = sanitize_text(s);
    if let Some(min) = min_length {
        if clean.chars().count() < min {
            return Err(format!("Shorter than minimum length {min}."));
        }
    }
    Ok(Value::String(clean))
}

fn check_integer(value: &Value) -> Result<Value, String> {
    let invalid = || "Not a valid integer.".to_string();
    match value {
        Value::Number(n) => n.as_i64().map(Value::from).ok_or_else(invalid),
        Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn check_email(value: &Value) -> Result<Value, String> {
    let s = value.as_str().ok_or_else(|| "Not a valid string.".to_string())?;
    let s = s.trim();
    if s.validate_email() {
        Ok(Value::String(s.to_string()))
    } else {
        Err("Not a valid email address.".to_string())
    }
}

fn check_date(value: &Value) -> Result<Value, String> {
    let s = value.as_str().ok_or_else(|| "Not a valid date.".to_string())?;
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .map_err(|_| "Not a valid date.".to_string())
}

fn check_pid(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(Value::String(s.trim().to_string())),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
        _ => Err("Not a valid persistent identifier.".to_string()),
    }
}
