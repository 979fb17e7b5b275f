//! Core resolution pipeline: look every field up across the layers and cast it.
//!
//! Operates on pre-loaded tables (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. For each schema field:
//!
//! 1. Search CLI, env, dotenv, config file, secrets, then defaults
//! 2. Take the first layer that defines the field
//! 3. Cast the raw value to the field's type (fatal on failure)
//! 4. Record which layer supplied it, or leave the field unset
//! 5. Run the schema's post-init hook over the merged values; whatever it
//!    changes is recorded as a default

use toml::Table;

use crate::error::ClapschemaError;
use crate::merge::{LayerStack, filter_fields};
use crate::resolved::{Entry, ResolvedConfig};
use crate::schema::Schema;
use crate::types::Layer;

/// All pre-loaded layer tables. No I/O happens here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveInput {
    pub cli: Table,
    pub env: Table,
    pub dotenv: Table,
    pub file: Table,
    pub secrets: Table,
}

impl ResolveInput {
    fn table(&self, layer: Layer) -> Option<&Table> {
        match layer {
            Layer::Cli => Some(&self.cli),
            Layer::Env => Some(&self.env),
            Layer::Dotenv => Some(&self.dotenv),
            Layer::ConfigFile => Some(&self.file),
            Layer::Secrets => Some(&self.secrets),
            Layer::Default => None,
        }
    }
}

/// Resolve every schema field from pre-loaded layers.
pub fn resolve(schema: &Schema, input: ResolveInput) -> Result<ResolvedConfig, ClapschemaError> {
    let known = |key: &str| schema.contains(key);
    let input = ResolveInput {
        cli: filter_fields(input.cli, known),
        env: filter_fields(input.env, known),
        dotenv: filter_fields(input.dotenv, known),
        file: filter_fields(input.file, known),
        secrets: filter_fields(input.secrets, known),
    };
    let defaults = schema.defaults_table();

    let stack = Layer::PRECEDENCE
        .iter()
        .fold(LayerStack::new(), |stack, &layer| match input.table(layer) {
            Some(table) => stack.push(layer, table),
            None => stack.push(layer, &defaults),
        });

    let mut entries = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let entry = match stack.lookup(field.name()) {
            Some((layer, raw)) => {
                let value = field.cast(raw)?;
                tracing::debug!(field = field.name(), %layer, "resolved");
                Entry {
                    name: field.name().to_string(),
                    value: Some(value),
                    layer: Some(layer),
                    doc: field.doc_text().to_string(),
                }
            }
            None => Entry {
                name: field.name().to_string(),
                value: None,
                layer: None,
                doc: field.doc_text().to_string(),
            },
        };
        entries.push(entry);
    }

    apply_post_init(schema, &mut entries)?;
    Ok(ResolvedConfig::new(entries, schema.version().to_string()))
}

fn apply_post_init(schema: &Schema, entries: &mut Vec<Entry>) -> Result<(), ClapschemaError> {
    let values: Table = entries
        .iter()
        .filter_map(|e| e.value.clone().map(|v| (e.name.clone(), v)))
        .collect();
    let Some(fields) = schema.rerun_post_init(&values)? else {
        return Ok(());
    };

    for field in fields {
        let Some(value) = field.default_value() else {
            continue;
        };
        match entries.iter_mut().find(|e| e.name == field.name()) {
            Some(entry) if entry.value.as_ref() == Some(value) => {}
            Some(entry) => {
                tracing::debug!(field = field.name(), "set by post-init hook");
                entry.value = Some(value.clone());
                entry.layer = Some(Layer::Default);
            }
            None => entries.push(Entry {
                name: field.name().to_string(),
                value: Some(value.clone()),
                layer: Some(Layer::Default),
                doc: field.doc_text().to_string(),
            }),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{person_schema, typed_schema};
    use crate::schema::Field;
    use crate::types::FieldType;
    use toml::Value;

    fn table(toml_str: &str) -> Table {
        toml_str.parse::<Table>().unwrap()
    }

    #[test]
    fn defaults_only() {
        let config = resolve(&person_schema(), ResolveInput::default()).unwrap();
        assert_eq!(config.get_str("name").unwrap(), "Klimenko");
        assert_eq!(config.get("age").unwrap(), &Value::Integer(132));
        assert_eq!(config.layer("age").unwrap(), Some(Layer::Default));
    }

    #[test]
    fn every_field_has_an_entry() {
        let schema = typed_schema();
        let config = resolve(&schema, ResolveInput::default()).unwrap();
        assert_eq!(config.entries().len(), schema.fields().len());
        for name in schema.field_names() {
            assert!(config.entry(name).is_ok(), "{name} missing");
        }
    }

    #[test]
    fn config_file_beats_default() {
        let input = ResolveInput {
            file: table(r#"bar = "42""#),
            ..ResolveInput::default()
        };
        let config = resolve(&typed_schema(), input).unwrap();
        assert_eq!(config.get("bar").unwrap(), &Value::Integer(42));
        assert_eq!(config.layer("bar").unwrap(), Some(Layer::ConfigFile));
    }

    #[test]
    fn cli_beats_config_file() {
        let input = ResolveInput {
            cli: table("bar = 7"),
            file: table(r#"bar = "42""#),
            ..ResolveInput::default()
        };
        let config = resolve(&typed_schema(), input).unwrap();
        assert_eq!(config.get("bar").unwrap(), &Value::Integer(7));
    }

    #[test]
    fn full_precedence_order() {
        let all = ResolveInput {
            cli: table(r#"name = "cli""#),
            env: table(r#"name = "env""#),
            dotenv: table(r#"name = "dotenv""#),
            file: table(r#"name = "file""#),
            secrets: table(r#"name = "secret""#),
        };
        let schema = person_schema();

        let mut input = all.clone();
        for expected in ["cli", "env", "dotenv", "file", "secret"] {
            let config = resolve(&schema, input.clone()).unwrap();
            assert_eq!(config.get_str("name").unwrap(), expected);
            match expected {
                "cli" => input.cli.clear(),
                "env" => input.env.clear(),
                "dotenv" => input.dotenv.clear(),
                "file" => input.file.clear(),
                _ => input.secrets.clear(),
            }
        }
        let config = resolve(&schema, input).unwrap();
        assert_eq!(config.get_str("name").unwrap(), "Klimenko");
    }

    #[test]
    fn ini_true_becomes_boolean() {
        let input = ResolveInput {
            file: table(r#"debug = "true""#),
            ..ResolveInput::default()
        };
        let config = resolve(&typed_schema(), input).unwrap();
        assert_eq!(config.get("debug").unwrap(), &Value::Boolean(true));
    }

    #[test]
    fn list_default_is_wrapped() {
        let config = resolve(&typed_schema(), ResolveInput::default()).unwrap();
        assert_eq!(
            config.get("tags").unwrap(),
            &Value::Array(vec![Value::String("aa".into())])
        );
    }

    #[test]
    fn env_string_wrapped_for_list() {
        let input = ResolveInput {
            env: table(r#"tags = "bb""#),
            ..ResolveInput::default()
        };
        let config = resolve(&typed_schema(), input).unwrap();
        assert_eq!(
            config.get("tags").unwrap(),
            &Value::Array(vec![Value::String("bb".into())])
        );
    }

    #[test]
    fn bad_layer_value_is_fatal() {
        let input = ResolveInput {
            env: table(r#"bar = "lots""#),
            ..ResolveInput::default()
        };
        match resolve(&typed_schema(), input) {
            Err(ClapschemaError::TypeMismatch { field, .. }) => assert_eq!(field, "bar"),
            other => panic!("Expected TypeMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn required_field_unset_until_read() {
        let config = resolve(&typed_schema(), ResolveInput::default()).unwrap();
        assert!(!config.is_set("token"));
        assert!(matches!(
            config.get("token"),
            Err(ClapschemaError::RequiredParameterMissing(_))
        ));
    }

    #[test]
    fn required_field_supplied_by_secrets() {
        let input = ResolveInput {
            secrets: table(r#"token = "s3cret""#),
            ..ResolveInput::default()
        };
        let config = resolve(&typed_schema(), input).unwrap();
        assert_eq!(config.get_str("token").unwrap(), "s3cret");
        assert_eq!(config.layer("token").unwrap(), Some(Layer::Secrets));
    }

    #[test]
    fn unknown_keys_dropped() {
        let input = ResolveInput {
            file: table(r#"unrelated = "x""#),
            ..ResolveInput::default()
        };
        let config = resolve(&person_schema(), input).unwrap();
        assert!(config.entry("unrelated").is_err());
    }

    fn greeting_schema() -> Schema {
        Schema::declare("t")
            .field(Field::new("name").default("Klimenko"))
            .field(Field::new("age").ty(FieldType::Integer).default(1))
            .version("1.0.0")
            .post_init(|init| {
                let name = init.get("name").and_then(Value::as_str).unwrap_or("").to_string();
                init.set("greeting", format!("hi {name}"))?;
                if name == "Yo" {
                    init.set("age", "99")?;
                }
                Ok(())
            })
            .validate_and_cast()
            .unwrap()
    }

    #[test]
    fn post_init_sees_merged_values() {
        let schema = greeting_schema();
        let config = resolve(&schema, ResolveInput::default()).unwrap();
        assert_eq!(config.get_str("greeting").unwrap(), "hi Klimenko");

        let input = ResolveInput {
            cli: table(r#"name = "Yo""#),
            ..ResolveInput::default()
        };
        let config = resolve(&schema, input).unwrap();
        assert_eq!(config.get_str("name").unwrap(), "Yo");
        assert_eq!(config.layer("name").unwrap(), Some(Layer::Cli));
        assert_eq!(config.get_str("greeting").unwrap(), "hi Yo");
        assert_eq!(config.layer("greeting").unwrap(), Some(Layer::Default));
    }

    #[test]
    fn post_init_overrides_are_cast() {
        let input = ResolveInput {
            env: table(r#"name = "Yo""#),
            ..ResolveInput::default()
        };
        let config = resolve(&greeting_schema(), input).unwrap();
        assert_eq!(config.get("age").unwrap(), &Value::Integer(99));
    }

    #[test]
    fn post_init_failure_fails_resolution() {
        let schema = Schema::declare("t")
            .field(Field::new("n").ty(FieldType::Integer).default(1))
            .version("1.0.0")
            .post_init(|init| {
                if init.get("n") == Some(&Value::Integer(2)) {
                    init.set("n", "two")?;
                }
                Ok(())
            })
            .validate_and_cast()
            .unwrap();
        let input = ResolveInput {
            cli: table("n = 2"),
            ..ResolveInput::default()
        };
        assert!(matches!(
            resolve(&schema, input),
            Err(ClapschemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn version_carried_over() {
        let config = resolve(&person_schema(), ResolveInput::default()).unwrap();
        assert_eq!(config.version(), "1.0.0");
        assert_eq!(config.get_str("version").unwrap(), "1.0.0");
    }
}
