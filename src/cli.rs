//! Clap adapter for clapschema.
//!
//! This module is the **optional integration layer** between the
//! framework-agnostic core and the [clap](https://docs.rs/clap) CLI parser.
//! It is compiled only when the `clap` Cargo feature is enabled (on by
//! default).
//!
//! [`App`] builds a clap [`Command`] at runtime from a [`Schema`]: every
//! registered subcommand accepts every field as `--field <VALUE>`, with the
//! field's doc and default in the help text. [`App::run`] then
//!
//! 1. prints the version if the last token is `version` or `--version`,
//! 2. rewrites leading positional tokens into field flags
//!    (see [`argv`](crate::argv)),
//! 3. parses with clap and casts each supplied value to its field's type,
//! 4. loads the remaining layers through a [`Loader`] and calls the handler.
//!
//! [`ConfigArgs`] and [`ConfigSubcommand`] provide `config list|get`. They are
//! mounted automatically by [`App::with_config_command`] and can also be
//! embedded into a hand-written clap derive.

use clap::{Arg, ArgAction, ArgMatches, Args, Command, FromArgMatches, Subcommand};
use toml::{Table, Value};

use crate::argv;
use crate::builder::Loader;
use crate::error::ClapschemaError;
use crate::ops::{ConfigResult, format_value};
use crate::resolved::ResolvedConfig;
use crate::schema::{Field, Schema};
use crate::types::{ConfigAction, FieldOrigin, FieldType};

/// Name of the built-in config subcommand.
pub const CONFIG_COMMAND: &str = "config";

/// What a command handler returns.
pub type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type Handler = Box<dyn Fn(&ResolvedConfig) -> CommandResult>;
type Configure<'s> = Box<dyn Fn(Loader<'s>) -> Loader<'s> + 's>;

/// Clap-derived args for the `config` subcommand group.
///
/// Embed this into your app's clap derive:
/// ```ignore
/// #[derive(Subcommand)]
/// enum Commands {
///     Config(ConfigArgs),
/// }
/// ```
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigSubcommand>,
}

/// Available config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show every resolved value and where it came from.
    List,
    /// Show the resolved value, source and documentation for one field.
    Get {
        /// Field name.
        key: String,
    },
}

impl ConfigArgs {
    /// Convert clap-parsed args into a framework-agnostic `ConfigAction`.
    ///
    /// Bare `config` (no subcommand) and explicit `config list` both map to
    /// `ConfigAction::List`.
    pub fn into_action(self) -> ConfigAction {
        match self.action {
            None | Some(ConfigSubcommand::List) => ConfigAction::List,
            Some(ConfigSubcommand::Get { key }) => ConfigAction::Get { key },
        }
    }
}

/// What [`App::run_from`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The named command's handler ran successfully.
    Ran(String),
    /// A version request was answered; carries the version string.
    Version(String),
    /// The built-in config subcommand produced this result.
    Config(ConfigResult),
}

struct UserCommand {
    name: String,
    about: String,
    handler: Handler,
}

/// Schema-driven command-line application.
pub struct App<'s> {
    schema: &'s Schema,
    name: String,
    about: Option<String>,
    commands: Vec<UserCommand>,
    config_command: bool,
    configure: Option<Configure<'s>>,
}

impl<'s> App<'s> {
    /// Start an app named after the schema.
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            name: schema.name().to_string(),
            about: None,
            commands: Vec::new(),
            config_command: false,
            configure: None,
        }
    }

    /// Program name shown in usage and help.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn about(mut self, about: &str) -> Self {
        self.about = Some(about.to_string());
        self
    }

    /// Register a subcommand. The handler receives the resolved configuration.
    ///
    /// `version` is reserved as a final token and `config` is taken when
    /// [`with_config_command`](Self::with_config_command) is on.
    pub fn command<F>(mut self, name: &str, about: &str, handler: F) -> Self
    where
        F: Fn(&ResolvedConfig) -> CommandResult + 'static,
    {
        self.commands.push(UserCommand {
            name: name.to_string(),
            about: about.to_string(),
            handler: Box::new(handler),
        });
        self
    }

    /// Mount the built-in `config list|get` subcommand.
    pub fn with_config_command(mut self) -> Self {
        self.config_command = true;
        self
    }

    /// Adjust the [`Loader`] used for every invocation (env prefix, config
    /// section, secret store, ...).
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: Fn(Loader<'s>) -> Loader<'s> + 's,
    {
        self.configure = Some(Box::new(f));
        self
    }

    /// The clap command tree for this app.
    pub fn command_line(&self) -> Command {
        let mut cmd = Command::new(self.name.clone())
            .version(self.schema.version().to_string())
            .subcommand_required(true)
            .arg_required_else_help(true);
        if let Some(about) = &self.about {
            cmd = cmd.about(about.clone());
        }
        for user in &self.commands {
            cmd = cmd.subcommand(
                Command::new(user.name.clone())
                    .about(user.about.clone())
                    .args(self.field_args()),
            );
        }
        if self.config_command {
            let config = Command::new(CONFIG_COMMAND)
                .about("Inspect the resolved configuration")
                .args(self.field_args());
            cmd = cmd.subcommand(ConfigArgs::augment_args(config));
        }
        cmd
    }

    fn field_args(&self) -> Vec<Arg> {
        self.schema
            .fields()
            .iter()
            .filter(|f| f.origin() != FieldOrigin::Computed)
            .map(field_arg)
            .collect()
    }

    /// Parse `std::env::args()`, dispatch and print the outcome.
    ///
    /// Clap errors (including `--help`) are rendered by clap and exit the
    /// process; everything else is returned.
    pub fn run(&self) -> Result<(), ClapschemaError> {
        match self.run_from(std::env::args()) {
            Ok(Outcome::Version(version)) => println!("{version}"),
            Ok(Outcome::Config(result)) => println!("{result}"),
            Ok(Outcome::Ran(_)) => {}
            Err(ClapschemaError::Cli(e)) => e.exit(),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Parse `args` (program name first) and dispatch.
    pub fn run_from<I, T>(&self, args: I) -> Result<Outcome, ClapschemaError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
        if argv::is_version_request(&tokens[..]) {
            return Ok(Outcome::Version(self.schema.version().to_string()));
        }

        let is_user_command = tokens
            .get(1)
            .is_some_and(|cmd| self.commands.iter().any(|c| &c.name == cmd));
        let tokens = if is_user_command {
            argv::preparse(&tokens[..], &self.schema.positional_fields())
        } else {
            tokens
        };
        tracing::debug!(?tokens, "parsing command line");

        let mut cmd = self.command_line();
        let matches = cmd.try_get_matches_from_mut(&tokens)?;
        let Some((name, sub)) = matches.subcommand() else {
            return Err(cmd
                .error(clap::error::ErrorKind::MissingSubcommand, "a subcommand is required")
                .into());
        };

        let cli = self.cli_table(sub)?;
        let mut loader = Loader::new(self.schema).cli_overrides(cli);
        if let Some(configure) = &self.configure {
            loader = configure(loader);
        }

        if self.config_command && name == CONFIG_COMMAND {
            let args = ConfigArgs::from_arg_matches(sub)?;
            let result = loader.handle(&args.into_action())?;
            return Ok(Outcome::Config(result));
        }

        let Some(user) = self.commands.iter().find(|c| c.name == name) else {
            return Err(cmd
                .error(
                    clap::error::ErrorKind::InvalidSubcommand,
                    format!("unknown command '{name}'"),
                )
                .into());
        };
        let config = loader.load()?;
        (user.handler)(&config).map_err(|source| ClapschemaError::Command {
            name: name.to_string(),
            source,
        })?;
        Ok(Outcome::Ran(name.to_string()))
    }

    /// Values given on the command line, cast to their field types.
    fn cli_table(&self, matches: &ArgMatches) -> Result<Table, ClapschemaError> {
        let mut table = Table::new();
        for field in self.schema.fields() {
            if field.origin() == FieldOrigin::Computed {
                continue;
            }
            let Some(values) = matches.try_get_many::<String>(field.name()).ok().flatten() else {
                continue;
            };
            let mut values: Vec<Value> = values.cloned().map(Value::String).collect();
            let raw = if is_container(field) {
                Value::Array(values)
            } else {
                match values.pop() {
                    Some(v) => v,
                    None => continue,
                }
            };
            table.insert(field.name().to_string(), field.cast(&raw)?);
        }
        Ok(table)
    }
}

fn is_container(field: &Field) -> bool {
    field.effective_type().is_some_and(FieldType::is_container)
}

fn field_arg(field: &Field) -> Arg {
    let ty = field.effective_type();
    let default = match field.default_value() {
        Some(v) => format!("Default is {}", format_value(v)),
        None => "required".to_string(),
    };
    let help = if field.doc_text().is_empty() {
        format!("({default})")
    } else {
        format!("{} ({default})", field.doc_text())
    };

    let arg = Arg::new(field.name().to_string())
        .long(field.name().to_string())
        .value_name(ty.map(|t| t.name()).unwrap_or("value").to_uppercase())
        .value_parser(clap::value_parser!(String))
        .help(help);

    match ty {
        Some(FieldType::Boolean) => arg
            .action(ArgAction::Set)
            .num_args(0..=1)
            .default_missing_value("true"),
        Some(t) if t.is_container() => arg.action(ArgAction::Append),
        _ => arg.action(ArgAction::Set),
    }
}
