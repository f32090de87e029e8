//! Configuration system for botconf.
//!
//! Configuration is resolved once at startup from, lowest precedence first:
//! built-in defaults, the primary TOML source, credential environment
//! variables, the local override TOML source, and command-line flags. The
//! result is an immutable [`RuntimeConfig`].
//!
//! Both sources keep their settings under a top-level `config` table. A key
//! can be deleted from the layers below with the `{ "$omit" = true }` marker.
//!
//! # Example Configuration
//!
//! ```toml
//! [config]
//! intents = "0b1100011000000111111101"
//! command_prefix = ["!", "?"]
//! mention_as_command_prefix = true
//! log_level = "info"
//! owner_ids = [123456789012345678]
//!
//! [config.authentication]
//! client_id = 987654321098765432
//! # token comes from AUTH_TOKEN
//!
//! [[config.extensions]]
//! name = ".music"
//! package = "thirdparty"
//! config = { volume = 30 }
//!
//! [[config.databases]]
//! name = "main"
//! url = "postgresql://bot@db.internal/bot"
//! ```
//!
//! And a local override that drops the bundled polls and help:
//!
//! ```toml
//! [config]
//! ignore_extensions = ["bot.exts.polls", "bot.exts.help"]
//! owner_ids = { "$omit" = true }
//! owner_id = 123456789012345678
//! ```

mod cli;
mod credentials;
mod loader;
mod merge;
mod runtime;
mod source;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{Cli, Commands};
pub use credentials::{
    CREDENTIALS_KEY, CredentialResolver, DEFAULT_ENV_PREFIX, KNOWN_CREDENTIAL_KEYS,
};
pub use loader::{
    CONFIG_PATH_ENV, CONFIG_SOURCE_ENV, DEFAULT_CONFIG_FILE, DEFAULT_LOCALCONFIG_FILE,
    ENV_PREFIX_ENV, LOCALCONFIG_SOURCE_ENV, env_var_names, load_runtime_config,
};
pub use merge::{
    ConfigMapping, OMIT_MARKER, Overlay, OverlayEntry, compose, is_omit_marker, merge, merge_all,
};
pub use runtime::RuntimeConfig;
pub use source::{CONFIG_BINDING, SourceRole, load_source, load_source_str};
pub use types::{
    AuthenticationConfig, CommandPrefix, DEFAULT_COMMAND_PREFIX, DEFAULT_INTENTS, LogLevel,
    PrefixRule, Settings, parse_integer_literal,
};
