//! The merged configuration for one invocation.

use std::fmt;
use std::path::PathBuf;

use confique::Config;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use toml::{Table, Value};

use crate::error::ClapschemaError;
use crate::ops::format_value;
use crate::types::Layer;

/// One field of a [`ResolvedConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    /// `None` for a required field that no layer supplied.
    pub value: Option<Value>,
    /// The layer the value came from.
    pub layer: Option<Layer>,
    pub doc: String,
}

/// Flat, ordered key/value mapping with per-entry source attribution.
///
/// Every schema field has an entry. Required fields nobody supplied are kept
/// as unset entries and only fail when read.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    entries: Vec<Entry>,
    version: String,
}

impl ResolvedConfig {
    pub(crate) fn new(entries: Vec<Entry>, version: String) -> Self {
        Self { entries, version }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, key: &str) -> Result<&Entry, ClapschemaError> {
        self.entries
            .iter()
            .find(|e| e.name == key)
            .ok_or_else(|| ClapschemaError::KeyNotFound(key.into()))
    }

    /// The resolved value of `key`.
    ///
    /// Fails with `KeyNotFound` for names outside the schema and with
    /// `RequiredParameterMissing` for a required field nobody supplied.
    pub fn get(&self, key: &str) -> Result<&Value, ClapschemaError> {
        self.entry(key)?
            .value
            .as_ref()
            .ok_or_else(|| ClapschemaError::RequiredParameterMissing(key.into()))
    }

    /// Deserialize one value into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, ClapschemaError> {
        self.get(key)?
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| ClapschemaError::Deserialize {
                key: key.into(),
                reason: e.to_string(),
            })
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ClapschemaError> {
        let value = self.get(key)?;
        value.as_str().ok_or_else(|| ClapschemaError::Deserialize {
            key: key.into(),
            reason: format!("expected a string, got {value}"),
        })
    }

    pub fn get_path(&self, key: &str) -> Result<PathBuf, ClapschemaError> {
        self.get_str(key).map(PathBuf::from)
    }

    /// Which layer supplied `key`. `None` when the field is unset.
    pub fn layer(&self, key: &str) -> Result<Option<Layer>, ClapschemaError> {
        Ok(self.entry(key)?.layer)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.entry(key).is_ok_and(|e| e.value.is_some())
    }

    /// All set values as a table. Unset fields are left out.
    pub fn to_table(&self) -> Table {
        self.entries
            .iter()
            .filter_map(|e| e.value.clone().map(|v| (e.name.clone(), v)))
            .collect()
    }

    /// Deserialize the whole configuration into a serde struct.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, ClapschemaError> {
        Value::Table(self.to_table())
            .try_into()
            .map_err(|e: toml::de::Error| ClapschemaError::Deserialize {
                key: "<config>".into(),
                reason: e.to_string(),
            })
    }

    /// Load a confique struct from the resolved values.
    ///
    /// confique fills struct-level defaults and reports required fields that
    /// are still missing.
    pub fn extract_config<C: Config>(&self) -> Result<C, ClapschemaError>
    where
        C::Layer: for<'de> Deserialize<'de>,
    {
        let layer: C::Layer = Value::Table(self.to_table()).try_into().map_err(
            |e: toml::de::Error| ClapschemaError::Deserialize {
                key: "<config>".into(),
                reason: e.to_string(),
            },
        )?;
        C::builder()
            .preloaded(layer)
            .load()
            .map_err(ClapschemaError::from)
    }
}

impl fmt::Display for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match (&entry.value, entry.layer) {
                (Some(value), Some(layer)) => {
                    write!(f, "{} = {}  ({layer})", entry.name, format_value(value))?
                }
                _ => write!(f, "{} = <not set>", entry.name)?,
            }
        }
        Ok(())
    }
}
