//! Config file discovery and loading.
//!
//! # Discovery
//!
//! [`locate`] picks at most one config file:
//!
//! 1. An absolute override path is used as-is.
//! 2. Otherwise the override is joined onto the working directory. If that
//!    names an existing file, it is used.
//! 3. Otherwise the joined path is treated as a directory and searched for
//!    `*.conf`, then `*.cfg` (see [`Discovery`]). When nothing matches and the
//!    directory sits inside a package (its parent holds the package marker),
//!    the search moves one level up, at most [`Discovery::depth`] times.
//!
//! The first match wins; several candidate files are never merged.
//!
//! # Loading
//!
//! [`read_config`] parses the INI file and returns the single recognised
//! section as a table of strings. Problems come back as
//! [`ConfigFileUnreadable`](ClapschemaError::ConfigFileUnreadable) or
//! [`MissingSection`](ClapschemaError::MissingSection); the loader logs them
//! and carries on without the file.

use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption};
use toml::{Table, Value};

use crate::error::ClapschemaError;

/// Default INI section holding the configuration.
pub const DEFAULT_SECTION: &str = "clapschema";

/// How to search a directory tree for a config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    /// File extensions tried in order, without the dot.
    pub extensions: Vec<String>,
    /// A file whose presence in the parent directory marks "inside a package".
    pub marker: String,
    /// How many levels the search may climb.
    pub depth: usize,
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            extensions: vec!["conf".into(), "cfg".into()],
            marker: "Cargo.toml".into(),
            depth: 2,
        }
    }
}

/// Resolve the config file for an override path and a working directory.
///
/// `override_path` may be empty. Returns `None` when nothing is found.
pub fn locate(override_path: &Path, cwd: &Path, discovery: &Discovery) -> Option<PathBuf> {
    if override_path.is_absolute() {
        return Some(override_path.to_path_buf());
    }

    let candidate = cwd.join(override_path);
    if candidate.is_file() {
        return Some(candidate);
    }

    find_config(&candidate, discovery, discovery.depth)
}

/// Search `dir` for a config file, climbing while inside a package.
pub fn find_config(dir: &Path, discovery: &Discovery, budget: usize) -> Option<PathBuf> {
    if let Some(found) = discovery
        .extensions
        .iter()
        .find_map(|ext| candidates(dir, ext).into_iter().next())
    {
        return Some(found);
    }

    if budget > 0
        && is_in_package(dir, &discovery.marker)
        && let Some(parent) = dir.parent()
    {
        return find_config(parent, discovery, budget - 1);
    }

    None
}

/// Files in `dir` ending in `.{ext}`, sorted by name.
fn candidates(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let Some(dir_str) = dir.to_str() else {
        return vec![];
    };
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(dir_str),
        glob::Pattern::escape(ext)
    );
    match glob::glob(&pattern) {
        Ok(paths) => paths.flatten().filter(|p| p.is_file()).collect(),
        Err(_) => vec![],
    }
}

fn is_in_package(dir: &Path, marker: &str) -> bool {
    dir.parent()
        .is_some_and(|parent| parent.join(marker).is_file())
}

/// Read `section` from the INI file at `path`.
///
/// A path that doesn't exist yields an empty table. Keys are lower-cased.
/// Values are kept verbatim: backslashes and quotes are not interpreted.
pub fn read_config(path: &Path, section: &str) -> Result<Table, ClapschemaError> {
    if !path.exists() {
        return Ok(Table::new());
    }

    let raw = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_file_opt(path, raw).map_err(|e| ClapschemaError::ConfigFileUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let props = ini
        .section(Some(section))
        .ok_or_else(|| ClapschemaError::MissingSection {
            path: path.to_path_buf(),
            section: section.to_string(),
        })?;

    Ok(props
        .iter()
        .map(|(key, value)| (key.to_lowercase(), Value::String(value.to_string())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_climb() -> Discovery {
        Discovery {
            depth: 0,
            ..Discovery::default()
        }
    }

    // --- locate ---

    #[test]
    fn absolute_override_returned_as_is() {
        let p = PathBuf::from("/etc/myapp/app.cfg");
        let cwd = TempDir::new().unwrap();
        assert_eq!(locate(&p, cwd.path(), &Discovery::default()), Some(p));
    }

    #[test]
    fn relative_override_joined_with_cwd() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("my.ini"), "[clapschema]\n").unwrap();
        let found = locate(Path::new("my.ini"), dir.path(), &Discovery::default());
        assert_eq!(found, Some(dir.path().join("my.ini")));
    }

    #[test]
    fn empty_override_searches_cwd() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo.cfg"), "[clapschema]\n").unwrap();
        let found = locate(Path::new(""), dir.path(), &Discovery::default());
        assert_eq!(found, Some(dir.path().join("foo.cfg")));
    }

    #[test]
    fn override_directory_is_searched() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("conf.d");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("app.conf"), "[clapschema]\n").unwrap();
        let found = locate(Path::new("conf.d"), dir.path(), &Discovery::default());
        assert_eq!(found, Some(sub.join("app.conf")));
    }

    #[test]
    fn conf_preferred_over_cfg() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.cfg"), "").unwrap();
        fs::write(dir.path().join("b.conf"), "").unwrap();
        let found = find_config(dir.path(), &no_climb(), 0);
        assert_eq!(found, Some(dir.path().join("b.conf")));
    }

    #[test]
    fn first_match_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.cfg"), "").unwrap();
        fs::write(dir.path().join("a.cfg"), "").unwrap();
        let found = find_config(dir.path(), &no_climb(), 0);
        assert_eq!(found, Some(dir.path().join("a.cfg")));
    }

    #[test]
    fn climbs_into_parent_package() {
        let root = TempDir::new().unwrap();
        let pkg = root.path().join("pkg");
        let src = pkg.join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(pkg.join("Cargo.toml"), "[package]\n").unwrap();
        fs::write(pkg.join("app.cfg"), "[clapschema]\n").unwrap();

        let found = locate(Path::new(""), &src, &Discovery::default());
        assert_eq!(found, Some(pkg.join("app.cfg")));
    }

    #[test]
    fn does_not_climb_outside_package() {
        let root = TempDir::new().unwrap();
        let child = root.path().join("child");
        fs::create_dir(&child).unwrap();
        fs::write(root.path().join("app.cfg"), "[clapschema]\n").unwrap();

        // No marker next to `child`, so the parent is never searched.
        assert_eq!(locate(Path::new(""), &child, &Discovery::default()), None);
    }

    #[test]
    fn climb_is_bounded_by_depth() {
        let root = TempDir::new().unwrap();
        let a = root.path().join("a");
        let b = a.join("b");
        let c = b.join("c");
        fs::create_dir_all(&c).unwrap();
        fs::write(root.path().join("Cargo.toml"), "").unwrap();
        fs::write(a.join("Cargo.toml"), "").unwrap();
        fs::write(b.join("Cargo.toml"), "").unwrap();
        fs::write(root.path().join("app.cfg"), "").unwrap();

        let shallow = Discovery {
            depth: 2,
            ..Discovery::default()
        };
        assert_eq!(find_config(&c, &shallow, shallow.depth), None);

        let deep = Discovery {
            depth: 3,
            ..Discovery::default()
        };
        assert_eq!(
            find_config(&c, &deep, deep.depth),
            Some(root.path().join("app.cfg"))
        );
    }

    #[test]
    fn nothing_found_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(locate(Path::new(""), dir.path(), &Discovery::default()), None);
    }

    #[test]
    fn custom_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.ini"), "").unwrap();
        fs::write(dir.path().join("y.cfg"), "").unwrap();
        let discovery = Discovery {
            extensions: vec!["ini".into()],
            ..no_climb()
        };
        assert_eq!(
            find_config(dir.path(), &discovery, 0),
            Some(dir.path().join("x.ini"))
        );
    }

    #[test]
    fn directories_named_like_configs_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("weird.cfg")).unwrap();
        assert_eq!(find_config(dir.path(), &no_climb(), 0), None);
    }

    // --- read_config ---

    #[test]
    fn reads_section_values_as_strings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.cfg");
        fs::write(&path, "[clapschema]\nbar = 42\nurl = https://example.com\n").unwrap();
        let table = read_config(&path, DEFAULT_SECTION).unwrap();
        assert_eq!(table["bar"].as_str().unwrap(), "42");
        assert_eq!(table["url"].as_str().unwrap(), "https://example.com");
    }

    #[test]
    fn keys_are_lowercased() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.cfg");
        fs::write(&path, "[clapschema]\nBar = 1\n").unwrap();
        let table = read_config(&path, DEFAULT_SECTION).unwrap();
        assert!(table.contains_key("bar"));
    }

    #[test]
    fn other_sections_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.cfg");
        fs::write(&path, "[other]\nbar = 1\n\n[clapschema]\nbaz = 2\n").unwrap();
        let table = read_config(&path, DEFAULT_SECTION).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains_key("baz"));
    }

    #[test]
    fn missing_section_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.cfg");
        fs::write(&path, "[Default]\nbar = 42\n").unwrap();
        let err = read_config(&path, DEFAULT_SECTION).unwrap_err();
        assert!(matches!(err, ClapschemaError::MissingSection { .. }));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let table = read_config(&dir.path().join("nope.cfg"), DEFAULT_SECTION).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn values_are_kept_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.cfg");
        fs::write(
            &path,
            "[clapschema]\nwin = C:\\temp\\new\nq = \"quoted\"\nre = ^\\d+\\s*$\n",
        )
        .unwrap();
        let table = read_config(&path, DEFAULT_SECTION).unwrap();
        assert_eq!(table["win"].as_str().unwrap(), r"C:\temp\new");
        assert_eq!(table["q"].as_str().unwrap(), r#""quoted""#);
        assert_eq!(table["re"].as_str().unwrap(), r"^\d+\s*$");
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.cfg");
        fs::write(&path, "[clapschema\nbar = 1\n").unwrap();
        match read_config(&path, DEFAULT_SECTION) {
            Err(ClapschemaError::ConfigFileUnreadable { path: reported, .. }) => {
                assert_eq!(reported, path)
            }
            other => panic!("Expected ConfigFileUnreadable, got: {other:?}"),
        }
    }

    #[test]
    fn unreadable_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.cfg");
        fs::create_dir(&path).unwrap();
        let err = read_config(&path, DEFAULT_SECTION).unwrap_err();
        assert!(matches!(err, ClapschemaError::ConfigFileUnreadable { .. }));
    }
}
