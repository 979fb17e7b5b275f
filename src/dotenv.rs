//! `.env` reader.
//!
//! Reads `{dir}/.env` without touching the process environment. A missing
//! file is normal and yields an empty table; an unreadable or malformed one is
//! logged and also yields an empty table.

use std::path::Path;

use toml::{Table, Value};

use crate::schema::Schema;

pub const DOTENV_FILE: &str = ".env";

pub fn read_dotenv(dir: &Path, schema: &Schema) -> Table {
    let path = dir.join(DOTENV_FILE);
    let iter = match dotenvy::from_path_iter(&path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Table::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read .env file");
            return Table::new();
        }
    };

    let mut table = Table::new();
    for item in iter {
        match item {
            Ok((key, value)) => {
                if schema.contains(&key) {
                    table.insert(key, Value::String(value));
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed .env file");
                return Table::new();
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::person_schema;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn absent_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read_dotenv(dir.path(), &person_schema()).is_empty());
    }

    #[test]
    fn known_keys_are_read() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".env"),
            "name=Yo\n# a comment\nsurname=\"Ma Ma\"\nUNRELATED=1\n",
        )
        .unwrap();
        let table = read_dotenv(dir.path(), &person_schema());
        assert_eq!(table.len(), 2);
        assert_eq!(table["name"].as_str().unwrap(), "Yo");
        assert_eq!(table["surname"].as_str().unwrap(), "Ma Ma");
    }

    #[test]
    fn values_stay_strings() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "age=50\n").unwrap();
        let table = read_dotenv(dir.path(), &person_schema());
        assert_eq!(table["age"].as_str().unwrap(), "50");
    }

    #[test]
    fn malformed_file_is_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "name=Yo\nthis is not a pair\n").unwrap();
        assert!(read_dotenv(dir.path(), &person_schema()).is_empty());
    }
}
