//! Schema-driven, layered configuration for command-line tools. Declare your
//! fields once, and get a merged, typed configuration plus a clap front end.
//!
//! ```ignore
//! let schema = Schema::declare("greeter")
//!     .field(Field::new("name").ty(FieldType::String).default("world").doc("Who to greet"))
//!     .field(Field::new("times").ty(FieldType::Integer).default(1))
//!     .build_or_exit();
//!
//! let config = Loader::new(&schema).load()?;
//! let name = config.get_str("name")?;
//! ```
//!
//! That call reads the environment, `{cwd}/.env`, the nearest `*.conf` /
//! `*.cfg` file and the password store, falls back to the declared defaults,
//! and casts every value to its field's type.
//!
//! # The schema
//!
//! A [`Schema`] is an ordered list of [`Field`]s. Each field has a name, an
//! optional [`FieldType`], an optional default and a doc string:
//!
//! - **No default** means *required*. Loading still succeeds; reading the
//!   field fails with
//!   [`RequiredParameterMissing`](ClapschemaError::RequiredParameterMissing)
//!   unless some layer supplied it.
//! - **No type** means the field takes the type of its default.
//! - **Names starting with `_`** are not fields, and `help` is rejected.
//! - **Declaration order** is positional-argument order on the command line.
//!
//! Declaring is two-phase. [`Schema::declare`] returns a [`RawSchema`];
//! [`RawSchema::validate_and_cast`] rejects duplicates, casts every default,
//! installs a computed `version` field and runs the optional
//! [`post_init`](RawSchema::post_init) hook. The hook runs again on every
//! load over the merged values, so derived fields follow the command line.
//! A default that can't be cast is a startup error; [`build_or_exit`](RawSchema::build_or_exit) prints it and
//! exits with status 1.
//!
//! Schemas can also be read from a confique struct with
//! [`Schema::from_config`], taking names, `///` docs and
//! `#[config(default = ...)]` values from its metadata.
//!
//! There is no global registry: the schema is a value you own and pass to a
//! [`Loader`] or an [`App`].
//!
//! # Layer precedence
//!
//! ```text
//! Schema defaults       Field::default(...)
//!        ↑ overridden by
//! Secret store          ~/.password-store/**/<field>.gpg
//!        ↑ overridden by
//! Config file           [clapschema] section of the discovered INI file
//!        ↑ overridden by
//! .env file             {cwd}/.env
//!        ↑ overridden by
//! Environment vars      <field> or <PREFIX><field>
//!        ↑ overridden by
//! Command line          --field value, or positionals
//! ```
//!
//! Every layer is **sparse**: a field absent from one layer falls through to
//! the next. The first layer that defines a field wins, and its value is then
//! cast to the field's type, so an INI `debug = true` becomes a boolean and a
//! single env value for a `list` field becomes a one-element list. A value
//! that can't be cast fails the load with
//! [`TypeMismatch`](ClapschemaError::TypeMismatch).
//!
//! [`ResolvedConfig`] remembers which [`Layer`] supplied each value.
//!
//! # Config file discovery
//!
//! The `cfg` field (if the schema has one) may name a file. An absolute path
//! is used as-is; a relative one is joined onto the working directory (the
//! `cwd` field, else the process working directory). Otherwise the directory
//! is searched for `*.conf`, then `*.cfg`. If nothing is there and the
//! directory sits inside a package (its parent holds a `Cargo.toml`), the
//! search climbs, at most two levels. Tune this with [`Discovery`].
//!
//! A broken file, or one without the `[clapschema]` section, is logged with
//! `tracing::warn!` and ignored. Config files never stop a program from
//! starting.
//!
//! # Secrets
//!
//! For each field the secret store is searched for `<field>.gpg`; the key id
//! comes from the nearest `.gpg-id` above it, and `gpg` decrypts it. This
//! layer is best-effort: with no store, no `gpg` or a failed decryption it
//! contributes nothing and only logs at `debug` level. Swap the subprocess
//! out through the [`Decrypt`] trait.
//!
//! # Clap front end
//!
//! [`App`] (behind the `clap` feature, on by default) turns the schema into a
//! clap command tree. Every registered subcommand takes every field as a
//! `--field` flag, and bare values after the subcommand bind to fields in
//! declaration order:
//!
//! ```text
//! greeter hello Ada 3        # same as: greeter hello --name Ada --times 3
//! greeter version            # prints the schema version
//! greeter config list        # with App::with_config_command()
//! ```
//!
//! To use clapschema without clap:
//!
//! ```toml
//! clapschema = { version = "...", default-features = false }
//! ```
//!
//! # Error handling
//!
//! All fallible operations return [`ClapschemaError`]. See the [`error`]
//! module for the full set.

pub mod argv;
pub mod error;
pub mod types;

mod builder;
#[cfg(feature = "clap")]
mod cli;
mod coerce;
mod dotenv;
mod env;
mod file;
pub(crate) mod merge;
mod ops;
mod resolve;
mod resolved;
mod schema;
mod secrets;
mod version;

#[cfg(test)]
mod fixtures;

pub use builder::{DEFAULT_CONFIG_FIELD, DEFAULT_CWD_FIELD, Loader};
#[cfg(feature = "clap")]
pub use cli::{App, CommandResult, ConfigArgs, ConfigSubcommand, Outcome};
pub use coerce::{CoerceError, coerce};
pub use error::ClapschemaError;
pub use file::{DEFAULT_SECTION, Discovery, locate, read_config};
pub use ops::ConfigResult;
pub use resolve::{ResolveInput, resolve};
pub use resolved::{Entry, ResolvedConfig};
pub use schema::{Field, RawSchema, Schema, SchemaInit};
pub use secrets::{Decrypt, Gpg, SecretStore};
pub use types::{ConfigAction, FieldOrigin, FieldType, Layer};
pub use version::FALLBACK_VERSION;
