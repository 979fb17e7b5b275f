//! Schema declaration and validation.
//!
//! A schema is built in two phases:
//!
//! 1. [`Schema::declare`] returns a [`RawSchema`] that collects [`Field`]
//!    declarations, an optional post-init hook and an optional explicit version.
//!    Nothing is checked yet.
//! 2. [`RawSchema::validate_and_cast`] drops reserved names, rejects duplicates,
//!    casts every typed default to its declared type, installs the computed
//!    `version` field and runs the post-init hook. The result is an immutable
//!    [`Schema`].
//!
//! There is no process-wide registry. The caller owns the `Schema` and passes
//! it to a [`Loader`](crate::Loader) or the CLI adapter.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use confique::Config;
use confique::meta::{FieldKind, LeafKind};
use toml::{Table, Value};

use crate::coerce::{coerce, infer_type};
use crate::error::ClapschemaError;
use crate::types::{FieldOrigin, FieldType};
use crate::version;

/// Names starting with this prefix are not fields.
pub const RESERVED_PREFIX: &str = "_";

/// Name of the computed version field.
pub const VERSION_FIELD: &str = "version";

/// Names taken by the command line itself.
pub const RESERVED_NAMES: &[&str] = &["help"];

type HookFn = dyn Fn(&mut SchemaInit<'_>) -> Result<(), ClapschemaError> + Send + Sync;

/// The post-init hook, kept on the schema so it can run again over loaded
/// values.
#[derive(Clone)]
struct PostInit(Arc<HookFn>);

impl fmt::Debug for PostInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PostInit(..)")
    }
}

impl PartialEq for PostInit {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn check_name(name: &str) -> Result<(), ClapschemaError> {
    if name.is_empty() {
        return Err(ClapschemaError::UnsupportedField {
            field: name.to_string(),
            reason: "field names cannot be empty".into(),
        });
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(ClapschemaError::UnsupportedField {
            field: name.to_string(),
            reason: format!("'{name}' is reserved for the command line"),
        });
    }
    Ok(())
}

/// A single configuration field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    ty: Option<FieldType>,
    default: Option<Value>,
    doc: String,
    origin: FieldOrigin,
}

impl Field {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: None,
            default: None,
            doc: String::new(),
            origin: FieldOrigin::Declared,
        }
    }

    /// Declare the field's type. Untyped fields take the type of their default.
    pub fn ty(mut self, ty: FieldType) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Set the default. A field without a default is required: reading it
    /// fails unless some layer supplies a value.
    pub fn default<V: Into<Value>>(mut self, value: V) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Human-readable description, shown in `--help` and `config get`.
    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = doc.trim().to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> Option<FieldType> {
        self.ty
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn doc_text(&self) -> &str {
        &self.doc
    }

    pub fn origin(&self) -> FieldOrigin {
        self.origin
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// The declared type, or the runtime type of the current default.
    pub fn effective_type(&self) -> Option<FieldType> {
        self.ty
            .or_else(|| self.default.as_ref().and_then(infer_type))
    }

    /// Cast a raw value to this field's effective type.
    ///
    /// Fields with no type and no default accept any value unchanged.
    pub fn cast(&self, value: &Value) -> Result<Value, ClapschemaError> {
        match self.effective_type() {
            Some(ty) => coerce(value, ty).map_err(|e| e.for_field(&self.name)),
            None => Ok(value.clone()),
        }
    }

    fn with_origin(mut self, origin: FieldOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Cast the default against the declared type. `None` stays `None`.
    fn validated(mut self) -> Result<Self, ClapschemaError> {
        if let (Some(ty), Some(default)) = (self.ty, &self.default) {
            let cast = coerce(default, ty).map_err(|e| e.for_field(&self.name))?;
            self.default = Some(cast);
        }
        Ok(self)
    }
}

/// A schema whose declarations have not been checked yet.
pub struct RawSchema {
    name: String,
    fields: Vec<Field>,
    version: Option<String>,
    version_dir: Option<PathBuf>,
    post_init: Option<PostInit>,
}

impl RawSchema {
    /// Add a field. Declaration order is positional-argument order.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Register a hook that runs after defaults are cast.
    ///
    /// The hook can read fields, override their values (the new value is cast
    /// to the field's type) and add new fields. It runs once here over the
    /// defaults, and again on every load over the merged values, so derived
    /// fields follow the command line.
    pub fn post_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut SchemaInit<'_>) -> Result<(), ClapschemaError> + Send + Sync + 'static,
    {
        self.post_init = Some(PostInit(Arc::new(hook)));
        self
    }

    /// Use an explicit version string instead of detecting one.
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Directory whose `Cargo.toml` is read when no explicit version is given
    /// (default: the working directory).
    pub fn version_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.version_dir = Some(dir.into());
        self
    }

    /// Validate the declarations and produce the registered [`Schema`].
    pub fn validate_and_cast(self) -> Result<Schema, ClapschemaError> {
        let mut fields: Vec<Field> = Vec::with_capacity(self.fields.len() + 1);
        for field in self.fields {
            if field.name.starts_with(RESERVED_PREFIX) {
                tracing::debug!(field = %field.name, "skipping reserved field name");
                continue;
            }
            check_name(&field.name)?;
            if fields.iter().any(|f| f.name == field.name) {
                return Err(ClapschemaError::DuplicateField(field.name));
            }
            fields.push(field.validated()?);
        }

        let version_dir = match self.version_dir {
            Some(dir) => dir,
            None => std::env::current_dir().unwrap_or_default(),
        };
        let version = version::resolve_version(self.version.as_deref(), &version_dir);
        if !fields.iter().any(|f| f.name == VERSION_FIELD) {
            fields.push(
                Field::new(VERSION_FIELD)
                    .ty(FieldType::String)
                    .default(version.as_str())
                    .doc("Version of this program")
                    .with_origin(FieldOrigin::Computed),
            );
        }

        if let Some(hook) = &self.post_init {
            let mut init = SchemaInit {
                fields: &mut fields,
            };
            (hook.0)(&mut init)?;
        }

        tracing::debug!(schema = %self.name, fields = fields.len(), "schema registered");
        Ok(Schema {
            name: self.name,
            fields,
            version,
            post_init: self.post_init,
        })
    }

    /// Like [`validate_and_cast`](Self::validate_and_cast), but a broken schema
    /// prints the error and exits the process with status 1.
    pub fn build_or_exit(self) -> Schema {
        let name = self.name.clone();
        self.validate_and_cast().unwrap_or_else(|e| {
            eprintln!("given parameters or defined defaults were of incorrect type:");
            eprintln!("{name}: {e}");
            std::process::exit(1);
        })
    }
}

/// Mutable view of the schema handed to the post-init hook.
pub struct SchemaInit<'a> {
    fields: &'a mut Vec<Field>,
}

impl SchemaInit<'_> {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.default.as_ref())
    }

    pub fn fields(&self) -> &[Field] {
        self.fields
    }

    /// Override a field's value, or add an untyped field if it doesn't exist.
    ///
    /// Existing fields cast the value against their declared type, falling
    /// back to the type of their current value.
    pub fn set<V: Into<Value>>(&mut self, name: &str, value: V) -> Result<(), ClapschemaError> {
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => {
                let cast = field.cast(&value)?;
                field.default = Some(cast);
                Ok(())
            }
            None => self.add(Field::new(name).default(value)),
        }
    }

    /// Add a new field from the hook.
    pub fn add(&mut self, field: Field) -> Result<(), ClapschemaError> {
        if field.name.starts_with(RESERVED_PREFIX) {
            return Err(ClapschemaError::UnsupportedField {
                field: field.name,
                reason: format!("names starting with '{RESERVED_PREFIX}' are reserved"),
            });
        }
        check_name(&field.name)?;
        if self.fields.iter().any(|f| f.name == field.name) {
            return Err(ClapschemaError::DuplicateField(field.name));
        }
        self.fields
            .push(field.with_origin(FieldOrigin::Hook).validated()?);
        Ok(())
    }
}

/// A validated, registered configuration schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    version: String,
    post_init: Option<PostInit>,
}

impl Schema {
    /// Start declaring a schema.
    pub fn declare(name: &str) -> RawSchema {
        RawSchema {
            name: name.to_string(),
            fields: Vec::new(),
            version: None,
            version_dir: None,
            post_init: None,
        }
    }

    /// Declare a schema from a confique config struct.
    ///
    /// Field names, `///` doc comments and `#[config(default = ...)]` values
    /// are read from `C::META`. Types are inferred from the defaults; fields
    /// without a default are required and untyped. Nested sections are
    /// rejected: schemas are flat.
    pub fn from_config<C: Config>() -> Result<RawSchema, ClapschemaError> {
        let meta = &C::META;
        let mut raw = Schema::declare(meta.name);
        for field in meta.fields {
            let doc = field
                .doc
                .iter()
                .map(|line| line.trim())
                .collect::<Vec<_>>()
                .join(" ");
            let declared = Field::new(field.name).doc(&doc);
            let declared = match &field.kind {
                FieldKind::Leaf {
                    kind: LeafKind::Required {
                        default: Some(expr), ..
                    },
                    ..
                } => {
                    let value =
                        Value::try_from(expr).map_err(|e| ClapschemaError::UnsupportedField {
                            field: field.name.to_string(),
                            reason: e.to_string(),
                        })?;
                    declared.default(value)
                }
                FieldKind::Leaf { .. } => declared,
                FieldKind::Nested { .. } => {
                    return Err(ClapschemaError::UnsupportedField {
                        field: field.name.to_string(),
                        reason: "nested sections are not supported".into(),
                    });
                }
            };
            raw = raw.field(declared);
        }
        Ok(raw)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// User-declared field names, in declaration order.
    pub fn positional_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.origin == FieldOrigin::Declared)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Run the post-init hook again, this time over `values` instead of the
    /// defaults.
    ///
    /// Declared fields start out holding their entry in `values` and
    /// hook-added fields start out absent, as they did at declaration. The
    /// returned fields carry whatever the hook left in each value slot.
    /// `None` when there is no hook.
    pub(crate) fn rerun_post_init(
        &self,
        values: &Table,
    ) -> Result<Option<Vec<Field>>, ClapschemaError> {
        let Some(hook) = &self.post_init else {
            return Ok(None);
        };
        let mut fields: Vec<Field> = self
            .fields
            .iter()
            .filter(|f| f.origin != FieldOrigin::Hook)
            .map(|f| Field {
                default: values.get(&f.name).cloned(),
                ..f.clone()
            })
            .collect();
        (hook.0)(&mut SchemaInit {
            fields: &mut fields,
        })?;
        Ok(Some(fields))
    }

    /// The lowest layer: every field that has a default.
    pub fn defaults_table(&self) -> Table {
        self.fields
            .iter()
            .filter_map(|f| f.default.clone().map(|v| (f.name.clone(), v)))
            .collect()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.version)?;
        for field in &self.fields {
            let ty = field.effective_type().map(FieldType::name).unwrap_or("");
            let default = match &field.default {
                Some(v) => v.to_string(),
                None => "required".to_string(),
            };
            writeln!(f, "    --{} ({ty}): {} (Default is {default})", field.name, field.doc)?;
        }
        Ok(())
    }
}
