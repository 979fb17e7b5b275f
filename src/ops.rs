//! Config inspection: key lookup, listing, and result types.
//!
//! Provides the logic behind `config list` and `config get`, and the
//! `ConfigResult` enum that callers use to display results.

use std::fmt;

use toml::Value;

use crate::error::ClapschemaError;
use crate::resolved::ResolvedConfig;
use crate::types::Layer;

/// Result of a config operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// A key's resolved value, where it came from and its doc string.
    KeyValue {
        key: String,
        value: String,
        doc: String,
        layer: Option<Layer>,
    },
    /// All resolved configuration values with their source layer.
    Listing {
        entries: Vec<(String, String, Option<Layer>)>,
    },
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::KeyValue {
                key,
                value,
                doc,
                layer,
            } => {
                for line in doc.lines() {
                    writeln!(f, "# {line}")?;
                }
                write_line(f, key, value, *layer)
            }
            ConfigResult::Listing { entries } => {
                for (i, (key, value, layer)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write_line(f, key, value, *layer)?;
                }
                Ok(())
            }
        }
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, key: &str, value: &str, layer: Option<Layer>) -> fmt::Result {
    match layer {
        Some(layer) => write!(f, "{key} = {value}  ({layer})"),
        None => write!(f, "{key} = {value}"),
    }
}

/// Get a resolved value by key, including its doc string and source layer.
///
/// Unset required fields are shown as `<not set>` rather than failing.
pub fn get_value(config: &ResolvedConfig, key: &str) -> Result<ConfigResult, ClapschemaError> {
    let entry = config.entry(key)?;
    Ok(ConfigResult::KeyValue {
        key: key.into(),
        value: display(entry.value.as_ref()),
        doc: entry.doc.clone(),
        layer: entry.layer,
    })
}

/// List every resolved value in schema order.
pub fn list_values(config: &ResolvedConfig) -> ConfigResult {
    let entries = config
        .entries()
        .iter()
        .map(|e| (e.name.clone(), display(e.value.as_ref()), e.layer))
        .collect();
    ConfigResult::Listing { entries }
}

fn display(value: Option<&Value>) -> String {
    match value {
        Some(v) => format_value(v),
        None => "<not set>".to_string(),
    }
}

/// Format a TOML value for display.
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Array(a) => {
            let items: Vec<String> = a.iter().map(|v| v.to_string()).collect();
            format!("[{}]", items.join(", "))
        }
        other => other.to_string(),
    }
}
