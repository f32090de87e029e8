//! The resolved, immutable configuration handed to the rest of the bot.

use std::fmt;

use ortho_config::serde_json::{self, Value};
use tracing::info;

use super::merge::ConfigMapping;
use super::types::{PrefixRule, Settings};
use crate::database::{DatabaseDescriptor, DatabaseRegistry};
use crate::error::{ConfigError, Result};
use crate::extensions::{ExtensionDescriptor, ExtensionResolver};

/// Final result of configuration resolution.
///
/// Built once by [`load_runtime_config`](super::load_runtime_config) and
/// only read afterwards. Keys the schema does not know, such as settings for
/// individual extensions, remain reachable through [`get`](Self::get). Keys
/// the schema knows hold their validated form there, so `intents` is always
/// a number and `log_level` is upper case.
#[derive(Clone)]
pub struct RuntimeConfig {
    mapping: ConfigMapping,
    settings: Settings,
    extensions: Vec<ExtensionDescriptor>,
    databases: DatabaseRegistry,
}

impl RuntimeConfig {
    /// Validates a fully merged mapping and resolves the extension and
    /// database plans.
    ///
    /// `token_env_var` names the variable that could have supplied the
    /// token and is reported when it is missing.
    ///
    /// # Errors
    ///
    /// Returns schema, credential, extension, and database errors. Nothing is
    /// returned unless every check passes.
    pub fn from_merged(merged: ConfigMapping, token_env_var: &str) -> Result<Self> {
        let settings = Settings::from_mapping(&merged)?;
        settings.validate()?;

        if settings
            .authentication
            .token
            .as_deref()
            .is_none_or(|token| token.trim().is_empty())
        {
            return Err(ConfigError::MissingCredential {
                key: String::from("token"),
                env_var: token_env_var.to_owned(),
            }
            .into());
        }

        let extensions = ExtensionResolver::new(settings.extension_namespace.clone())
            .resolve(&settings.declared_extensions(), &settings.extension_filter())?;
        let databases =
            DatabaseRegistry::resolve(&settings.databases, settings.main_database_name.as_deref())?;
        let mapping = normalised(merged, &settings)?;

        info!(
            extensions = extensions.len(),
            databases = databases.len(),
            "runtime configuration resolved"
        );

        Ok(Self {
            mapping,
            settings,
            extensions,
            databases,
        })
    }

    /// The merged mapping, unknown keys included.
    #[must_use]
    pub fn mapping(&self) -> &ConfigMapping {
        &self.mapping
    }

    /// The typed settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Extensions to load, in order.
    #[must_use]
    pub fn extensions(&self) -> &[ExtensionDescriptor] {
        &self.extensions
    }

    /// The database registry.
    #[must_use]
    pub fn databases(&self) -> &DatabaseRegistry {
        &self.databases
    }

    /// The main database, if one was selected.
    #[must_use]
    pub fn main_database(&self) -> Option<&DatabaseDescriptor> {
        self.databases.main()
    }

    /// Returns the value stored under the top-level `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.mapping.get(key)
    }

    /// How commands are recognised.
    ///
    /// # Errors
    ///
    /// Never fails for a configuration built by `from_merged`, which has
    /// already validated the rule.
    pub fn prefix_rule(&self) -> Result<PrefixRule> {
        self.settings.prefix_rule()
    }
}

/// Writes the typed form of every schema key back over the merged mapping.
fn normalised(mut mapping: ConfigMapping, settings: &Settings) -> Result<ConfigMapping> {
    match serde_json::to_value(settings) {
        Ok(Value::Object(typed)) => {
            mapping.extend(typed);
            Ok(mapping)
        }
        Ok(other) => Err(ConfigError::ParseError {
            message: format!("settings serialised to a non-table value: {other}"),
        }
        .into()),
        Err(e) => Err(ConfigError::ParseError {
            message: format!("failed to serialise settings: {e}"),
        }
        .into()),
    }
}

// The mapping holds credentials; only the resolved plan is shown.
impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("settings", &self.settings)
            .field("extensions", &self.extensions)
            .field("databases", &self.databases)
            .finish_non_exhaustive()
    }
}
