use std::fmt;

/// The declared type of a schema field.
///
/// Scalars map onto `toml::Value` variants directly. `Path` values are kept as
/// strings and handed out as `PathBuf` by the accessors. The three container
/// types are all stored as arrays; `Set` additionally drops duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Path,
    List,
    Set,
    Tuple,
}

impl FieldType {
    pub fn is_container(self) -> bool {
        matches!(self, FieldType::List | FieldType::Set | FieldType::Tuple)
    }

    /// Short name used in help output and error messages.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::String => "str",
            FieldType::Integer => "int",
            FieldType::Float => "float",
            FieldType::Boolean => "bool",
            FieldType::Path => "path",
            FieldType::List => "list",
            FieldType::Set => "set",
            FieldType::Tuple => "tuple",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A configuration source, listed from highest to lowest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Values passed on the command line.
    Cli,
    /// Process environment variables named like a field.
    Env,
    /// `KEY=VALUE` pairs from `{cwd}/.env`.
    Dotenv,
    /// The discovered INI config file.
    ConfigFile,
    /// Secrets decrypted from the password store.
    Secrets,
    /// Schema defaults. Always present.
    Default,
}

impl Layer {
    /// All layers in lookup order.
    pub const PRECEDENCE: [Layer; 6] = [
        Layer::Cli,
        Layer::Env,
        Layer::Dotenv,
        Layer::ConfigFile,
        Layer::Secrets,
        Layer::Default,
    ];
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Cli => "cli",
            Layer::Env => "env",
            Layer::Dotenv => "dotenv",
            Layer::ConfigFile => "config file",
            Layer::Secrets => "secrets",
            Layer::Default => "default",
        };
        f.write_str(name)
    }
}

/// How a field entered the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrigin {
    /// Declared by the user. Only these take part in positional argument mapping.
    Declared,
    /// Added by the post-init hook.
    Hook,
    /// Installed by the library (the `version` field).
    Computed,
}

/// A config inspection operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    List,
    Get { key: String },
}
