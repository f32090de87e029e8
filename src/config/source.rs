//! Reading configuration sources.
//!
//! A source is a TOML document whose top-level `config` table holds the
//! settings. Other top-level keys are ignored, which leaves room for
//! tooling-specific sections in the same file.
//!
//! A source that cannot be loaded is reported as absent rather than as an
//! error; whether absence is fatal is decided by the loader. Only a `config`
//! binding of the wrong shape is an error on its own.

use std::fmt;

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::serde_json::Value;
use tracing::{debug, warn};

use super::merge::ConfigMapping;
use crate::error::{ConfigError, Result};

/// The top-level key every source exposes its settings under.
pub const CONFIG_BINDING: &str = "config";

/// Which layer a source provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    /// The base configuration.
    Primary,
    /// The local override configuration.
    Secondary,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary configuration"),
            Self::Secondary => f.write_str("local override configuration"),
        }
    }
}

/// Loads the `config` table of the TOML file at `path`.
///
/// Uses `cap_std::fs_utf8`: the parent directory is opened with ambient
/// authority and the file is read relative to it.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when the file parses but its
/// `config` binding is not a table. Every other failure yields `Ok(None)`.
pub fn load_source(path: &Utf8Path, role: SourceRole) -> Result<Option<ConfigMapping>> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let Some(file_name) = path.file_name() else {
        report_absent(role, path.as_str(), "path does not name a file");
        return Ok(None);
    };

    let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(e) => {
            report_absent(
                role,
                path.as_str(),
                &format!("failed to open directory {parent}: {e}"),
            );
            return Ok(None);
        }
    };

    let content = match dir.read_to_string(file_name) {
        Ok(content) => content,
        Err(e) => {
            report_absent(role, path.as_str(), &format!("failed to read file: {e}"));
            return Ok(None);
        }
    };

    load_source_str(&content, path.as_str(), role)
}

/// Loads the `config` table from TOML text. `origin` names the text in logs
/// and errors.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when the `config` binding is not a
/// table.
pub fn load_source_str(
    content: &str,
    origin: &str,
    role: SourceRole,
) -> Result<Option<ConfigMapping>> {
    let document = match toml::from_str::<Value>(content) {
        Ok(document) => document,
        Err(e) => {
            report_absent(role, origin, &format!("failed to parse TOML: {e}"));
            return Ok(None);
        }
    };

    match document.get(CONFIG_BINDING) {
        Some(Value::Object(mapping)) => {
            debug!(%role, origin, keys = mapping.len(), "configuration source loaded");
            Ok(Some(mapping.clone()))
        }
        Some(other) => Err(ConfigError::InvalidValue {
            field: String::from(CONFIG_BINDING),
            reason: format!("{role} '{origin}' must bind a table, found {}", kind(other)),
        }
        .into()),
        None => {
            report_absent(role, origin, "no top-level 'config' table");
            Ok(None)
        }
    }
}

fn report_absent(role: SourceRole, origin: &str, reason: &str) {
    match role {
        SourceRole::Primary => warn!(%role, origin, reason, "configuration source unavailable"),
        SourceRole::Secondary => debug!(%role, origin, reason, "configuration source skipped"),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}
