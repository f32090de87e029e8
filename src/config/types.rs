//! Configuration data types for botconf.
//!
//! [`Settings`] is the schema the merged mapping is validated against. Every
//! recognised key is enumerated with its expected shape; keys the schema does
//! not know stay available in the raw mapping held by the runtime
//! configuration so extensions can read their own settings.

use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use ortho_config::serde_json::{self, Map, Value};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use smart_default::SmartDefault;

use super::merge::ConfigMapping;
use crate::database::DatabaseDescriptor;
use crate::error::{ConfigError, Result};
use crate::extensions::{
    DEFAULT_EXTENSION_NAMESPACE, ExtensionDescriptor, ExtensionFilter, bundled_extensions,
};

/// Gateway intents used when no layer sets `intents`: every non-privileged intent.
pub const DEFAULT_INTENTS: u64 = 3_243_773;

/// Command prefix used when no layer sets `command_prefix`.
pub const DEFAULT_COMMAND_PREFIX: &str = "!";

/// A log level name accepted in configuration and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    /// `CRITICAL`
    Critical,
    /// `FATAL`, an alias of `CRITICAL`.
    Fatal,
    /// `ERROR`
    Error,
    /// `WARN`, an alias of `WARNING`.
    Warn,
    /// `WARNING`
    Warning,
    /// `INFO`
    Info,
    /// `DEBUG`
    Debug,
    /// `NOTSET`: log everything.
    NotSet,
}

impl LogLevel {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::NotSet => "NOTSET",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "CRITICAL" => Ok(Self::Critical),
            "FATAL" => Ok(Self::Fatal),
            "ERROR" => Ok(Self::Error),
            "WARN" => Ok(Self::Warn),
            "WARNING" => Ok(Self::Warning),
            "INFO" => Ok(Self::Info),
            "DEBUG" => Ok(Self::Debug),
            "NOTSET" => Ok(Self::NotSet),
            _ => Err(ConfigError::InvalidValue {
                field: String::from("log_level"),
                reason: format!("unknown log level '{value}'"),
            }),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ConfigError;

    fn try_from(value: String) -> std::result::Result<Self, ConfigError> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_owned()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prefix or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandPrefix {
    /// A single prefix string.
    Single(String),
    /// Several prefix strings, any of which triggers a command.
    Many(Vec<String>),
}

impl CommandPrefix {
    /// Returns the prefixes as a list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Single(prefix) => vec![prefix.clone()],
            Self::Many(prefixes) => prefixes.clone(),
        }
    }
}

/// How the bot recognises commands once configuration is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRule {
    /// Literal prefixes.
    pub prefixes: Vec<String>,
    /// Whether mentioning the bot also works as a prefix.
    pub mention: bool,
}

/// The credentials section.
///
/// `token` is required by the time resolution completes; it may come from a
/// file layer or from `<PREFIX>_TOKEN`. Other keys are kept as-is.
#[derive(Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AuthenticationConfig {
    /// Bot token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Application client id. Accepts an integer or a numeric string.
    #[serde(
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_id: Option<u64>,

    /// Any other credential keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for AuthenticationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extra_keys: Vec<&String> = self.extra.keys().collect();
        f.debug_struct("AuthenticationConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("extra", &extra_keys)
            .finish()
    }
}

/// Root bot configuration schema.
///
/// The `SmartDefault` values form the lowest-precedence layer. A key removed
/// by an `Omit` marker is treated as never specified and falls back to the
/// field type's empty value (or, for `intents`, [`DEFAULT_INTENTS`]).
#[derive(Debug, Clone, PartialEq, SmartDefault, Deserialize, Serialize)]
pub struct Settings {
    /// Credentials.
    #[serde(default)]
    pub authentication: AuthenticationConfig,

    /// Gateway intents bit flags.
    #[default(DEFAULT_INTENTS)]
    #[serde(default = "default_intents", deserialize_with = "deserialize_intents")]
    pub intents: u64,

    /// Command prefix or prefixes.
    #[default(Some(CommandPrefix::Single(DEFAULT_COMMAND_PREFIX.to_owned())))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_prefix: Option<CommandPrefix>,

    /// Whether mentioning the bot works as a command prefix.
    #[serde(default)]
    pub mention_as_command_prefix: bool,

    /// Namespace identifying bundled extensions.
    #[default(DEFAULT_EXTENSION_NAMESPACE.to_owned())]
    #[serde(default = "default_extension_namespace")]
    pub extension_namespace: String,

    /// Extensions bundled with the bot, loaded before extras.
    #[default(bundled_extensions())]
    #[serde(default)]
    pub default_extensions: Vec<ExtensionDescriptor>,

    /// Operator-declared extensions.
    #[serde(default)]
    pub extensions: Vec<ExtensionDescriptor>,

    /// Extension names to skip.
    #[serde(default)]
    pub ignore_extensions: Vec<String>,

    /// Skip every extension.
    #[serde(default)]
    pub ignore_all_extensions: bool,

    /// Skip bundled extensions.
    #[serde(default)]
    pub ignore_default_extensions: bool,

    /// Skip operator-declared extensions.
    #[serde(default)]
    pub ignore_extra_extensions: bool,

    /// Declared databases.
    #[serde(default)]
    pub databases: Vec<DatabaseDescriptor>,

    /// Name of the main database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_database_name: Option<String>,

    /// Apply pending extension data migrations at startup.
    #[serde(default)]
    pub auto_migrate: bool,

    /// Log level. No level means only warnings and errors are shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    /// Directory for log files. Must exist when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_directory: Option<Utf8PathBuf>,

    /// Base name for log files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filename: Option<String>,

    /// Log file extension, without leading dots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_extension: Option<String>,

    /// Single bot owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<u64>,

    /// Several bot owners. Mutually exclusive with `owner_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_ids: Option<Vec<u64>>,

    /// Roles whose members count as owners.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_role_ids: Option<Vec<u64>>,

    /// Roles whose members may manage the bot.
    #[serde(default)]
    pub manager_role_ids: Vec<u64>,

    /// Guild used for development.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_guild_id: Option<u64>,

    /// Sync application commands at startup.
    #[serde(default)]
    pub sync_app_commands: bool,

    /// Copy global application commands to the development guild.
    #[serde(default)]
    pub copy_global_app_commands_to_dev_guild: bool,

    /// Clear global application commands.
    #[serde(default)]
    pub clear_global_app_commands: bool,

    /// Clear application commands of the development guild.
    #[serde(default)]
    pub clear_dev_guild_app_commands: bool,
}

const fn default_intents() -> u64 {
    DEFAULT_INTENTS
}

fn default_extension_namespace() -> String {
    DEFAULT_EXTENSION_NAMESPACE.to_owned()
}

impl Settings {
    /// Serialises the defaults into the lowest-precedence mapping.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` if the defaults cannot be serialised.
    pub fn defaults_mapping() -> Result<ConfigMapping> {
        match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ConfigError::ParseError {
                message: format!("defaults serialised to a non-table value: {other}"),
            }
            .into()),
            Err(e) => Err(ConfigError::ParseError {
                message: format!("failed to serialise defaults: {e}"),
            }
            .into()),
        }
    }

    /// Validates a merged mapping against the schema.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` when a recognised key has the wrong
    /// shape, naming the offending key where serde reports it.
    pub fn from_mapping(mapping: &ConfigMapping) -> Result<Self> {
        let mut settings: Self = serde_json::from_value(Value::Object(mapping.clone()))
            .map_err(|e| ConfigError::ParseError {
                message: format!("configuration does not match the expected schema: {e}"),
            })?;
        settings.normalise();
        Ok(settings)
    }

    fn normalise(&mut self) {
        if let Some(extension) = self.log_file_extension.as_mut() {
            let trimmed = extension.trim_matches('.').to_owned();
            *extension = trimmed;
        }
    }

    /// Checks rules spanning several keys.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        self.prefix_rule()?;

        if self.owner_id.is_some() && self.owner_ids.is_some() {
            return Err(invalid("owner_ids", "cannot be specified together with 'owner_id'"));
        }
        if self.owner_ids.as_ref().is_some_and(Vec::is_empty) {
            return Err(invalid("owner_ids", "must contain at least one user id"));
        }
        if self.owner_role_ids.as_ref().is_some_and(Vec::is_empty) {
            return Err(invalid("owner_role_ids", "must contain at least one role id"));
        }
        if let Some(directory) = self.log_directory.as_ref()
            && !directory.is_dir()
        {
            return Err(invalid(
                "log_directory",
                &format!("'{directory}' is not an existing directory"),
            ));
        }
        if self.log_filename.as_ref().is_some_and(|name| name.trim().is_empty()) {
            return Err(invalid("log_filename", "must not be empty"));
        }
        if self.extension_namespace.trim().is_empty() {
            return Err(invalid("extension_namespace", "must not be empty"));
        }
        Ok(())
    }

    /// Computes how commands are recognised.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when there is no prefix and mention
    /// prefixes are disabled, or when a prefix is empty.
    pub fn prefix_rule(&self) -> Result<PrefixRule> {
        let prefixes = self
            .command_prefix
            .as_ref()
            .map(CommandPrefix::to_vec)
            .unwrap_or_default();
        if prefixes.iter().any(String::is_empty) {
            return Err(invalid("command_prefix", "prefixes must not be empty strings"));
        }
        if prefixes.is_empty() && !self.mention_as_command_prefix {
            return Err(invalid(
                "mention_as_command_prefix",
                "must be true when no 'command_prefix' is set",
            ));
        }
        Ok(PrefixRule {
            prefixes,
            mention: self.mention_as_command_prefix,
        })
    }

    /// Returns bundled extensions followed by operator-declared ones.
    #[must_use]
    pub fn declared_extensions(&self) -> Vec<ExtensionDescriptor> {
        self.default_extensions
            .iter()
            .chain(&self.extensions)
            .cloned()
            .collect()
    }

    /// Returns the ignore settings for extension resolution.
    #[must_use]
    pub fn extension_filter(&self) -> ExtensionFilter {
        ExtensionFilter {
            ignore_names: self.ignore_extensions.iter().cloned().collect(),
            ignore_all: self.ignore_all_extensions,
            ignore_default: self.ignore_default_extensions,
            ignore_extra: self.ignore_extra_extensions,
        }
    }
}

fn invalid(field: &str, reason: &str) -> crate::error::BotconfError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
    .into()
}

/// An integer written either as a number or as a string literal.
#[derive(Deserialize)]
#[serde(untagged)]
enum IntegerLiteral {
    Number(u64),
    Text(String),
}

/// Parses an integer literal in base 2, 8, 10 or 16 (`0b`, `0o`, `0x` prefixes).
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for `field` if the text is not an
/// unsigned integer literal.
pub fn parse_integer_literal(field: &str, text: &str) -> std::result::Result<u64, ConfigError> {
    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();
    let (digits, radix) = if let Some(rest) = lowered.strip_prefix("0b") {
        (rest, 2)
    } else if let Some(rest) = lowered.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lowered.strip_prefix("0x") {
        (rest, 16)
    } else {
        (lowered.as_str(), 10)
    };
    u64::from_str_radix(&digits.replace('_', ""), radix).map_err(|_| ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: format!("'{trimmed}' is not an integer literal in base 2, 8, 10 or 16"),
    })
}

fn deserialize_intents<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match IntegerLiteral::deserialize(deserializer)? {
        IntegerLiteral::Number(value) => Ok(value),
        IntegerLiteral::Text(text) => {
            parse_integer_literal("intents", &text).map_err(D::Error::custom)
        }
    }
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntegerLiteral>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntegerLiteral::Number(value)) => Ok(Some(value)),
        Some(IntegerLiteral::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a numeric id, got '{text}'"))),
    }
}
