//! Version detection for the computed `version` field.
//!
//! An explicit version (usually `env!("CARGO_PKG_VERSION")`) always wins.
//! Otherwise the `Cargo.toml` in the given directory is read, following
//! `version.workspace = true` to `[workspace.package]`. Falls back to
//! [`FALLBACK_VERSION`].

use std::path::Path;

use toml::Table;

pub const FALLBACK_VERSION: &str = "0.0.1";

pub fn resolve_version(explicit: Option<&str>, dir: &Path) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| version_from_manifest(dir))
        .unwrap_or_else(|| FALLBACK_VERSION.to_string())
}

/// Read the package version from `{dir}/Cargo.toml`, if there is one.
pub fn version_from_manifest(dir: &Path) -> Option<String> {
    let content = std::fs::read_to_string(dir.join("Cargo.toml")).ok()?;
    let manifest: Table = content.parse().ok()?;

    let package_version = manifest.get("package").and_then(|p| p.get("version"));
    match package_version {
        Some(toml::Value::String(v)) => Some(v.clone()),
        _ => manifest
            .get("workspace")
            .and_then(|w| w.get("package"))
            .and_then(|p| p.get("version"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
    }
}
