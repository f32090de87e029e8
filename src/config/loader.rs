//! Configuration loading with layered precedence.
//!
//! Layers are applied lowest first:
//!
//! 1. Defaults serialised from [`Settings::default`]
//! 2. The primary source
//! 3. Credential environment variables, over the result so far
//! 4. The local override source, after its own credentials entry has been
//!    resolved from the environment
//! 5. Command-line flags
//!
//! Credentials are re-resolved at each file boundary, so an environment value
//! wins over every file layer. The command line has no credential flags.
//!
//! # Locating sources
//!
//! The primary source is the `--config` path, else TOML text in
//! `BOTCONF_CONFIG_SOURCE`, else the file named by `BOTCONF_CONFIG_PATH`,
//! else `config.toml` in the working directory, else the first file found by
//! `ortho_config` discovery (`.botconf.toml`, XDG `botconf/config.toml`).
//!
//! The local override source is the `--localconfig` path, else TOML text in
//! `BOTCONF_LOCALCONFIG_SOURCE`, else `localconfig.toml` in the working
//! directory.
//!
//! A missing primary source is tolerated when the local override supplies
//! data; if neither does, loading fails with
//! `ConfigError::MissingMandatorySource`.

use camino::Utf8PathBuf;
use ortho_config::discovery::ConfigDiscovery;
use tracing::{debug, info, warn};

use super::cli::Cli;
use super::credentials::{CredentialResolver, DEFAULT_ENV_PREFIX};
use super::merge::{ConfigMapping, Overlay, merge};
use super::runtime::RuntimeConfig;
use super::source::{SourceRole, load_source, load_source_str};
use super::types::Settings;
use crate::error::{ConfigError, Result};

/// Names the primary configuration file.
pub const CONFIG_PATH_ENV: &str = "BOTCONF_CONFIG_PATH";

/// Holds the primary configuration as TOML text.
pub const CONFIG_SOURCE_ENV: &str = "BOTCONF_CONFIG_SOURCE";

/// Holds the local override configuration as TOML text.
pub const LOCALCONFIG_SOURCE_ENV: &str = "BOTCONF_LOCALCONFIG_SOURCE";

/// Overrides the credential variable prefix.
pub const ENV_PREFIX_ENV: &str = "BOTCONF_ENV_PREFIX";

/// Primary source file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Local override file name looked up in the working directory.
pub const DEFAULT_LOCALCONFIG_FILE: &str = "localconfig.toml";

/// Returns the `BOTCONF_*` environment variable names read by the loader.
///
/// Tests use this to clear the environment without hard-coding the list.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    vec![
        CONFIG_PATH_ENV,
        CONFIG_SOURCE_ENV,
        LOCALCONFIG_SOURCE_ENV,
        ENV_PREFIX_ENV,
    ]
}

/// A source that was looked for, and what it yielded.
struct LoadedSource {
    origin: String,
    mapping: Option<ConfigMapping>,
}

/// Resolves the runtime configuration.
///
/// # Errors
///
/// Returns the first fatal condition met:
/// - `ConfigError::MissingMandatorySource` when neither source supplies data
/// - `ConfigError::InvalidValue` or `ConfigError::ParseError` when the merged
///   configuration does not match the schema
/// - `ConfigError::MissingCredential` when no layer supplies the token
/// - `ExtensionError` and `DatabaseError` variants from plan resolution
pub fn load_runtime_config<E: mockable::Env>(cli: &Cli, env: &E) -> Result<RuntimeConfig> {
    let prefix = cli
        .env_prefix
        .clone()
        .or_else(|| non_empty(env, ENV_PREFIX_ENV))
        .unwrap_or_else(|| DEFAULT_ENV_PREFIX.to_owned());
    let resolver = CredentialResolver::new(env, prefix);

    let primary = load_primary(cli, env)?;
    let secondary = load_secondary(cli, env)?;

    let primary_overlay = match (&primary.mapping, &secondary.mapping) {
        (Some(mapping), _) => {
            info!(origin = %primary.origin, "primary configuration loaded");
            Overlay::from_mapping(mapping)
        }
        (None, Some(_)) => {
            warn!(
                primary = %primary.origin,
                secondary = %secondary.origin,
                "primary configuration missing, continuing with the local override only"
            );
            Overlay::new()
        }
        (None, None) => {
            return Err(ConfigError::MissingMandatorySource {
                primary: primary.origin,
                secondary: secondary.origin,
            }
            .into());
        }
    };

    let mut mapping = merge(Settings::defaults_mapping()?, &primary_overlay);
    mapping = resolver.resolve_in(mapping);

    if let Some(ref local) = secondary.mapping {
        info!(origin = %secondary.origin, "local override configuration loaded");
        let overlay = resolver.resolve_overlay(&Overlay::from_mapping(local));
        mapping = merge(mapping, &overlay);
    }

    let cli_overlay = cli.overlay();
    debug!(keys = cli_overlay.len(), "applying command-line overrides");
    mapping = merge(mapping, &cli_overlay);

    RuntimeConfig::from_merged(mapping, &resolver.env_var_name("token"))
}

fn load_primary<E: mockable::Env>(cli: &Cli, env: &E) -> Result<LoadedSource> {
    if let Some(ref path) = cli.config {
        return Ok(LoadedSource {
            origin: path.to_string(),
            mapping: load_source(path, SourceRole::Primary)?,
        });
    }

    if let Some(text) = non_empty(env, CONFIG_SOURCE_ENV) {
        return Ok(LoadedSource {
            origin: CONFIG_SOURCE_ENV.to_owned(),
            mapping: load_source_str(&text, CONFIG_SOURCE_ENV, SourceRole::Primary)?,
        });
    }

    let path = discover_primary(env);
    Ok(LoadedSource {
        origin: path.to_string(),
        mapping: load_source(&path, SourceRole::Primary)?,
    })
}

fn discover_primary<E: mockable::Env>(env: &E) -> Utf8PathBuf {
    if let Some(path) = non_empty(env, CONFIG_PATH_ENV) {
        return Utf8PathBuf::from(path);
    }

    let local = Utf8PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    let discovery = ConfigDiscovery::builder("botconf")
        .env_var(CONFIG_PATH_ENV)
        .config_file_name(DEFAULT_CONFIG_FILE)
        .dotfile_name(".botconf.toml")
        .build();
    discovery
        .candidates()
        .into_iter()
        .filter(|p| p.exists())
        .find_map(|p| Utf8PathBuf::try_from(p).ok())
        .unwrap_or(local)
}

fn load_secondary<E: mockable::Env>(cli: &Cli, env: &E) -> Result<LoadedSource> {
    if let Some(ref path) = cli.localconfig {
        return Ok(LoadedSource {
            origin: path.to_string(),
            mapping: load_source(path, SourceRole::Secondary)?,
        });
    }

    if let Some(text) = non_empty(env, LOCALCONFIG_SOURCE_ENV) {
        return Ok(LoadedSource {
            origin: LOCALCONFIG_SOURCE_ENV.to_owned(),
            mapping: load_source_str(&text, LOCALCONFIG_SOURCE_ENV, SourceRole::Secondary)?,
        });
    }

    let path = Utf8PathBuf::from(DEFAULT_LOCALCONFIG_FILE);
    Ok(LoadedSource {
        origin: path.to_string(),
        mapping: load_source(&path, SourceRole::Secondary)?,
    })
}

fn non_empty<E: mockable::Env>(env: &E, key: &str) -> Option<String> {
    env.string(key).filter(|value| !value.trim().is_empty())
}
