use toml::{Table, Value};

use crate::schema::Schema;

/// Build a `toml::Table` from environment variables named like schema fields.
///
/// With a prefix, `{PREFIX}{field}` is matched instead of the bare field name.
/// Names are compared exactly. Values stay strings; coercion happens during
/// resolution.
///
/// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
pub fn env_to_table(
    schema: &Schema,
    prefix: Option<&str>,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Table {
    let mut table = Table::new();

    for (key, value) in vars {
        let name = match prefix {
            Some(prefix) => match key.strip_prefix(prefix) {
                Some(rest) => rest,
                None => continue,
            },
            None => key.as_str(),
        };
        if schema.contains(name) {
            table.insert(name.to_string(), Value::String(value));
        }
    }

    table
}
