use std::path::{Path, PathBuf};

use serde::Serialize;
use toml::{Table, Value};

use crate::dotenv;
use crate::env;
use crate::error::ClapschemaError;
use crate::file::{self, DEFAULT_SECTION, Discovery};
use crate::ops::{self, ConfigResult};
use crate::resolve::{self, ResolveInput};
use crate::resolved::ResolvedConfig;
use crate::schema::Schema;
use crate::secrets::{self, Decrypt, Gpg, SecretStore};
use crate::types::ConfigAction;

/// The process environment, skipping pairs that aren't valid UTF-8.
fn process_env() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// Field holding the config file override.
pub const DEFAULT_CONFIG_FIELD: &str = "cfg";
/// Field holding the working directory used for `.env` and config discovery.
pub const DEFAULT_CWD_FIELD: &str = "cwd";

/// Loads every layer for one invocation and resolves it against a schema.
///
/// The loader owns all I/O: it reads the environment, `.env`, the config file
/// and the secret store, then hands plain tables to the pure
/// [`resolve`](crate::resolve::resolve) pipeline. Each source can be switched
/// off or fed synthetic data, which is how the tests drive it.
pub struct Loader<'s> {
    schema: &'s Schema,
    cli: Table,
    cli_error: Option<String>,
    cwd: Option<PathBuf>,
    env_enabled: bool,
    env_prefix: Option<String>,
    env_vars: Option<Vec<(String, String)>>,
    dotenv_enabled: bool,
    config_file_enabled: bool,
    section: String,
    config_field: String,
    cwd_field: String,
    discovery: Discovery,
    secrets_enabled: bool,
    secret_store: Option<SecretStore>,
    decryptor: Box<dyn Decrypt>,
}

impl<'s> Loader<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            cli: Table::new(),
            cli_error: None,
            cwd: None,
            env_enabled: true,
            env_prefix: None,
            env_vars: None,
            dotenv_enabled: true,
            config_file_enabled: true,
            section: DEFAULT_SECTION.to_string(),
            config_field: DEFAULT_CONFIG_FIELD.to_string(),
            cwd_field: DEFAULT_CWD_FIELD.to_string(),
            discovery: Discovery::default(),
            secrets_enabled: true,
            secret_store: None,
            decryptor: Box::new(Gpg::new()),
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Add a CLI value. `None` values are ignored (useful for optional clap args).
    pub fn cli_override<V: Into<Value>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.cli.insert(key.to_string(), v.into());
        }
        self
    }

    /// Add several CLI values at once. Later calls win on conflicts.
    pub fn cli_overrides(mut self, values: Table) -> Self {
        self.cli.extend(values);
        self
    }

    /// Add CLI values from any serializable source, auto-matching by field name.
    ///
    /// `None` fields are skipped by the serializer and keys that aren't schema
    /// fields are dropped, so clap-only fields like `verbose` are excluded.
    /// A source that doesn't serialize to a table is reported by
    /// [`load`](Self::load).
    pub fn cli_overrides_from<S: Serialize>(mut self, source: &S) -> Self {
        match Value::try_from(source) {
            Ok(Value::Table(table)) => {
                for (key, value) in table {
                    if self.schema.contains(&key) {
                        self.cli.insert(key, value);
                    }
                }
            }
            Ok(other) => {
                self.cli_error = Some(format!("expected a struct or map, got {}", other.type_str()))
            }
            Err(e) => self.cli_error = Some(e.to_string()),
        }
        self
    }

    /// Use this directory for `.env` and config discovery, ignoring the
    /// `cwd` field.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Only consider environment variables named `{prefix}{field}`.
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Disable environment variable loading entirely.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Read these pairs instead of the process environment.
    pub fn env_vars(mut self, vars: Vec<(String, String)>) -> Self {
        self.env_vars = Some(vars);
        self
    }

    pub fn no_dotenv(mut self) -> Self {
        self.dotenv_enabled = false;
        self
    }

    /// INI section holding the values (default: `clapschema`).
    pub fn config_section(mut self, section: &str) -> Self {
        self.section = section.to_string();
        self
    }

    /// Field whose value overrides config file discovery (default: `cfg`).
    pub fn config_field(mut self, name: &str) -> Self {
        self.config_field = name.to_string();
        self
    }

    /// Field whose value names the working directory (default: `cwd`).
    pub fn cwd_field(mut self, name: &str) -> Self {
        self.cwd_field = name.to_string();
        self
    }

    pub fn discovery(mut self, discovery: Discovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn no_config_file(mut self) -> Self {
        self.config_file_enabled = false;
        self
    }

    /// Read secrets from this store instead of the default location.
    pub fn secret_store(mut self, store: SecretStore) -> Self {
        self.secret_store = Some(store);
        self
    }

    pub fn no_secrets(mut self) -> Self {
        self.secrets_enabled = false;
        self
    }

    /// Replace the `gpg` subprocess with another decryptor.
    pub fn decryptor(mut self, decryptor: Box<dyn Decrypt>) -> Self {
        self.decryptor = decryptor;
        self
    }

    /// First non-empty string value of `field` in the given layers, falling
    /// back to the schema default.
    fn field_str<'a>(&'a self, field: &str, layers: &[&'a Table]) -> Option<&'a str> {
        layers
            .iter()
            .filter_map(|t| t.get(field))
            .chain(self.schema.field(field).and_then(|f| f.default_value()))
            .filter_map(Value::as_str)
            .find(|s| !s.is_empty())
    }

    /// Resolve the effective working directory.
    ///
    /// Explicit [`cwd`](Self::cwd), then the `cwd` field from CLI, env and
    /// its default, then the process working directory.
    fn effective_cwd(&self, env: &Table) -> PathBuf {
        if let Some(dir) = &self.cwd {
            return dir.clone();
        }
        if let Some(dir) = self.field_str(&self.cwd_field, &[&self.cli, env]) {
            return PathBuf::from(dir);
        }
        std::env::current_dir().unwrap_or_default()
    }

    /// Resolve the effective config file override (may be empty).
    fn effective_config_override(&self, env: &Table, dotenv: &Table) -> PathBuf {
        self.field_str(&self.config_field, &[&self.cli, env, dotenv])
            .map(PathBuf::from)
            .unwrap_or_default()
    }

    fn effective_secret_store(&self) -> Option<SecretStore> {
        self.secret_store
            .clone()
            .or_else(SecretStore::default_location)
    }

    fn load_env(&self) -> Table {
        if !self.env_enabled {
            return Table::new();
        }
        let prefix = self.env_prefix.as_deref();
        match &self.env_vars {
            Some(vars) => env::env_to_table(self.schema, prefix, vars.iter().cloned()),
            None => env::env_to_table(self.schema, prefix, process_env()),
        }
    }

    fn load_config_file(&self, cwd: &Path, env: &Table, dotenv: &Table) -> Table {
        if !self.config_file_enabled {
            return Table::new();
        }
        let override_path = self.effective_config_override(env, dotenv);
        let Some(path) = file::locate(&override_path, cwd, &self.discovery) else {
            tracing::debug!(cwd = %cwd.display(), "no config file found");
            return Table::new();
        };
        match file::read_config(&path, &self.section) {
            Ok(table) => {
                tracing::debug!(path = %path.display(), keys = table.len(), "loaded config file");
                table
            }
            Err(e) => {
                tracing::warn!("{e}");
                Table::new()
            }
        }
    }

    fn load_secrets(&self) -> Table {
        if !self.secrets_enabled {
            return Table::new();
        }
        match self.effective_secret_store() {
            Some(store) => secrets::read_secrets(&store, self.schema, self.decryptor.as_ref()),
            None => {
                tracing::debug!("no secret store location");
                Table::new()
            }
        }
    }

    /// Read every enabled source into a `ResolveInput`.
    pub fn build_input(&self) -> Result<ResolveInput, ClapschemaError> {
        if let Some(reason) = &self.cli_error {
            return Err(ClapschemaError::Deserialize {
                key: "<cli>".into(),
                reason: reason.clone(),
            });
        }

        let env = self.load_env();
        let cwd = self.effective_cwd(&env);
        let dotenv = if self.dotenv_enabled {
            dotenv::read_dotenv(&cwd, self.schema)
        } else {
            Table::new()
        };
        let file = self.load_config_file(&cwd, &env, &dotenv);
        let secrets = self.load_secrets();

        Ok(ResolveInput {
            cli: self.cli.clone(),
            env,
            dotenv,
            file,
            secrets,
        })
    }

    /// Load and resolve the configuration through all layers.
    pub fn load(self) -> Result<ResolvedConfig, ClapschemaError> {
        let input = self.build_input()?;
        resolve::resolve(self.schema, input)
    }

    /// Handle a `ConfigAction` (list / get).
    pub fn handle(self, action: &ConfigAction) -> Result<ConfigResult, ClapschemaError> {
        let config = self.load()?;
        match action {
            ConfigAction::List => Ok(ops::list_values(&config)),
            ConfigAction::Get { key } => ops::get_value(&config, key),
        }
    }

    /// Handle a `ConfigAction` and print the result to stdout.
    pub fn handle_and_print(self, action: &ConfigAction) -> Result<(), ClapschemaError> {
        let result = self.handle(action)?;
        println!("{result}");
        Ok(())
    }
}
