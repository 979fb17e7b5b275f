//! Type coercion: cast raw values into a field's declared [`FieldType`].
//!
//! Every source other than the CLI hands out untyped strings (`.env`, the INI
//! file, env vars, decrypted secrets), so each value goes through [`coerce`]
//! before it reaches the resolved config. Coercion is shallow: containers hold
//! whatever element values they were given.
//!
//! Scalars headed for a container type are wrapped into a one-element array
//! first. A string is never split into its characters: `"aa"` into a list
//! gives `["aa"]`.

use toml::Value;

use crate::error::ClapschemaError;
use crate::types::FieldType;

/// A value that could not be cast to the requested type.
#[derive(Debug, Clone, PartialEq)]
pub struct CoerceError {
    pub expected: FieldType,
    pub value: String,
    pub reason: String,
}

impl CoerceError {
    fn new(expected: FieldType, value: &Value, reason: impl Into<String>) -> Self {
        Self {
            expected,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Attach the field name, producing the user-facing error.
    pub fn for_field(self, field: &str) -> ClapschemaError {
        ClapschemaError::TypeMismatch {
            field: field.to_string(),
            expected: self.expected,
            value: self.value,
            reason: self.reason,
        }
    }
}

/// Whether `value` must be wrapped in a one-element array before it can be
/// turned into `target`.
fn should_wrap(value: &Value, target: FieldType) -> bool {
    target.is_container() && !matches!(value, Value::Array(_) | Value::Table(_))
}

/// Cast `value` to `target`.
pub fn coerce(value: &Value, target: FieldType) -> Result<Value, CoerceError> {
    match target {
        FieldType::String => to_string(value).map(Value::String),
        FieldType::Integer => to_integer(value).map(Value::Integer),
        FieldType::Float => to_float(value).map(Value::Float),
        FieldType::Boolean => to_boolean(value).map(Value::Boolean),
        FieldType::Path => to_path(value).map(Value::String),
        FieldType::List | FieldType::Tuple => to_items(value, target).map(Value::Array),
        FieldType::Set => to_items(value, target).map(|items| Value::Array(dedup(items))),
    }
}

/// The type an untyped field takes from its current value.
pub fn infer_type(value: &Value) -> Option<FieldType> {
    match value {
        Value::String(_) | Value::Datetime(_) => Some(FieldType::String),
        Value::Integer(_) => Some(FieldType::Integer),
        Value::Float(_) => Some(FieldType::Float),
        Value::Boolean(_) => Some(FieldType::Boolean),
        Value::Array(_) => Some(FieldType::List),
        Value::Table(_) => None,
    }
}

fn to_string(value: &Value) -> Result<String, CoerceError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(d) => Ok(d.to_string()),
        Value::Array(_) | Value::Table(_) => Err(CoerceError::new(
            FieldType::String,
            value,
            "containers cannot be used as a string",
        )),
    }
}

fn to_integer(value: &Value) -> Result<i64, CoerceError> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| CoerceError::new(FieldType::Integer, value, e.to_string())),
        Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
        Value::Boolean(b) => Ok(i64::from(*b)),
        _ => Err(CoerceError::new(
            FieldType::Integer,
            value,
            "not convertible to an integer",
        )),
    }
}

fn to_float(value: &Value) -> Result<f64, CoerceError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Integer(i) => Ok(*i as f64),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| CoerceError::new(FieldType::Float, value, e.to_string())),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        _ => Err(CoerceError::new(
            FieldType::Float,
            value,
            "not convertible to a float",
        )),
    }
}

/// Strings are matched against known spellings, never judged by truthiness:
/// `"false"` must not become `true`.
fn to_boolean(value: &Value) -> Result<bool, CoerceError> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Integer(i) => Ok(*i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(CoerceError::new(
                FieldType::Boolean,
                value,
                "expected one of true/false, yes/no, on/off, 1/0",
            )),
        },
        _ => Err(CoerceError::new(
            FieldType::Boolean,
            value,
            "not convertible to a boolean",
        )),
    }
}

fn to_path(value: &Value) -> Result<String, CoerceError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(CoerceError::new(
            FieldType::Path,
            value,
            "paths must be given as strings",
        )),
    }
}

fn to_items(value: &Value, target: FieldType) -> Result<Vec<Value>, CoerceError> {
    if should_wrap(value, target) {
        return Ok(vec![value.clone()]);
    }
    match value {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(CoerceError::new(
            target,
            value,
            "tables cannot be used as a sequence",
        )),
    }
}

fn dedup(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
