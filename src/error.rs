use std::path::PathBuf;
use thiserror::Error;

use crate::types::FieldType;

#[derive(Debug, Error)]
pub enum ClapschemaError {
    #[error("Field '{field}' expects {expected}, got {value}: {reason}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        value: String,
        reason: String,
    },

    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),

    #[error("Field '{field}' is not supported: {reason}")]
    UnsupportedField { field: String, reason: String },

    #[error("Config file {path} could not be read: {reason}")]
    ConfigFileUnreadable { path: PathBuf, reason: String },

    #[error("Config file found at {path}, but it is missing a [{section}] section")]
    MissingSection { path: PathBuf, section: String },

    #[error("Secret store unavailable: {0}")]
    SecretStoreUnavailable(String),

    #[error("Required parameter '{0}' was not provided by any source")]
    RequiredParameterMissing(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid value for '{key}': {reason}")]
    Deserialize { key: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] confique::Error),

    #[cfg(feature = "clap")]
    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("Command '{name}' failed: {source}")]
    Command {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_names_field_and_type() {
        let err = ClapschemaError::TypeMismatch {
            field: "age".into(),
            expected: FieldType::Integer,
            value: "\"old\"".into(),
            reason: "invalid digit found in string".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("age"));
        assert!(msg.contains("int"));
        assert!(msg.contains("old"));
    }

    #[test]
    fn missing_section_formats() {
        let err = ClapschemaError::MissingSection {
            path: "/project/app.cfg".into(),
            section: "clapschema".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("app.cfg"));
        assert!(msg.contains("[clapschema]"));
    }

    #[test]
    fn required_parameter_formats() {
        let err = ClapschemaError::RequiredParameterMissing("name".into());
        assert!(err.to_string().contains("'name'"));
    }
}
