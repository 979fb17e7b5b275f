//! Best-effort secret store layer.
//!
//! The store follows the `pass` layout: every secret is a separate
//! `<name>.gpg` file somewhere below the store root, and a `.gpg-id` file in a
//! directory names the key used for everything beneath it. For each schema
//! field a same-named secret is looked up and decrypted.
//!
//! Nothing in here is allowed to block startup. A missing store, a secret
//! without a key id, a missing `gpg` binary or a failed decryption all end up
//! as a `debug!` line and an absent value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use directories::UserDirs;
use toml::{Table, Value};

use crate::error::ClapschemaError;
use crate::schema::Schema;

pub const STORE_DIR_ENV: &str = "PASSWORD_STORE_DIR";
pub const KEY_ID_FILE: &str = ".gpg-id";
const SECRET_EXT: &str = "gpg";

/// Turns an encrypted file into plaintext.
pub trait Decrypt {
    fn decrypt(&self, key_id: &str, file: &Path) -> Result<String, ClapschemaError>;
}

/// Decrypts by running `gpg --quiet --recipient <id> --decrypt <file>`.
#[derive(Debug, Clone)]
pub struct Gpg {
    program: String,
}

impl Gpg {
    pub fn new() -> Self {
        Self {
            program: "gpg".into(),
        }
    }

    /// Use a different executable, e.g. `gpg2`.
    pub fn program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }
}

impl Default for Gpg {
    fn default() -> Self {
        Self::new()
    }
}

impl Decrypt for Gpg {
    fn decrypt(&self, key_id: &str, file: &Path) -> Result<String, ClapschemaError> {
        let output = Command::new(&self.program)
            .arg("--quiet")
            .arg("--recipient")
            .arg(key_id)
            .arg("--decrypt")
            .arg(file)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| {
                ClapschemaError::SecretStoreUnavailable(format!("{}: {e}", self.program))
            })?;

        if !output.status.success() {
            return Err(ClapschemaError::SecretStoreUnavailable(format!(
                "{} exited with {} for {}",
                self.program,
                output.status,
                file.display()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// A password-store directory tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretStore {
    root: PathBuf,
}

impl SecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$PASSWORD_STORE_DIR`, else `~/.password-store`.
    pub fn default_location() -> Option<Self> {
        if let Some(dir) = std::env::var_os(STORE_DIR_ENV)
            && !dir.is_empty()
        {
            return Some(Self::new(dir));
        }
        UserDirs::new().map(|dirs| Self::new(dirs.home_dir().join(".password-store")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Key ids by directory, relative to the store root.
    pub fn key_ids(&self) -> Result<BTreeMap<PathBuf, String>, ClapschemaError> {
        let mut ids = BTreeMap::new();
        for marker in self.glob(&format!("**/{KEY_ID_FILE}"))? {
            let Some(dir) = marker.parent() else {
                continue;
            };
            let Ok(rel) = dir.strip_prefix(&self.root) else {
                continue;
            };
            match std::fs::read_to_string(&marker) {
                Ok(id) => {
                    ids.insert(rel.to_path_buf(), id.trim().to_string());
                }
                Err(e) => {
                    tracing::debug!(path = %marker.display(), error = %e, "unreadable key id file");
                }
            }
        }
        Ok(ids)
    }

    /// The first `<name>.gpg` file in the store, searching the whole tree.
    pub fn find_secret(&self, name: &str) -> Result<Option<PathBuf>, ClapschemaError> {
        let pattern = format!("**/{}.{SECRET_EXT}", glob::Pattern::escape(name));
        Ok(self.glob(&pattern)?.into_iter().next())
    }

    /// Key id covering `secret`: the nearest `.gpg-id` walking up to the root.
    pub fn key_id_for<'a>(
        &self,
        secret: &Path,
        ids: &'a BTreeMap<PathBuf, String>,
    ) -> Option<&'a str> {
        let rel = secret.strip_prefix(&self.root).ok()?;
        rel.ancestors()
            .skip(1)
            .find_map(|dir| ids.get(dir))
            .map(String::as_str)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>, ClapschemaError> {
        if !self.root.is_dir() {
            return Err(ClapschemaError::SecretStoreUnavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        let root = self.root.to_str().ok_or_else(|| {
            ClapschemaError::SecretStoreUnavailable("store path is not valid UTF-8".into())
        })?;
        let full = format!("{}/{pattern}", glob::Pattern::escape(root));
        let paths = glob::glob(&full)
            .map_err(|e| ClapschemaError::SecretStoreUnavailable(e.to_string()))?;
        Ok(paths.flatten().filter(|p| p.is_file()).collect())
    }
}

/// Decrypt a same-named secret for every schema field.
///
/// Failures are logged at `debug` level and skipped. Empty plaintext is not a
/// value.
pub fn read_secrets(store: &SecretStore, schema: &Schema, decryptor: &dyn Decrypt) -> Table {
    let ids = match store.key_ids() {
        Ok(ids) => ids,
        Err(e) => {
            tracing::debug!(error = %e, "secret store skipped");
            return Table::new();
        }
    };

    let mut table = Table::new();
    for name in schema.field_names() {
        match read_one(store, &ids, name, decryptor) {
            Ok(Some(secret)) => {
                table.insert(name.to_string(), Value::String(secret));
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(field = name, error = %e, "secret not available"),
        }
    }
    table
}

fn read_one(
    store: &SecretStore,
    ids: &BTreeMap<PathBuf, String>,
    name: &str,
    decryptor: &dyn Decrypt,
) -> Result<Option<String>, ClapschemaError> {
    let Some(file) = store.find_secret(name)? else {
        return Ok(None);
    };
    let key_id = store.key_id_for(&file, ids).ok_or_else(|| {
        ClapschemaError::SecretStoreUnavailable(format!("no key id covers {}", file.display()))
    })?;
    let plaintext = decryptor.decrypt(key_id, &file)?;
    Ok((!plaintext.is_empty()).then_some(plaintext))
}
