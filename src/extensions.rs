//! Extension selection and load ordering.
//!
//! Extensions are declared by dotted module name, optionally relative to a
//! `package`, with an optional mapping of keyword arguments. The resolver
//! splits the declared list into bundled defaults (names inside the
//! configured namespace) and operator extras, applies the ignore settings,
//! and returns defaults followed by extras in declaration order. Later
//! extensions may depend on earlier ones, so the order is part of the
//! contract.

use std::collections::{BTreeSet, HashSet};

use ortho_config::serde_json::{Map, Value, json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExtensionError, Result};

/// Namespace of the extensions bundled with the bot.
pub const DEFAULT_EXTENSION_NAMESPACE: &str = "bot.exts";

/// Embed colour passed to bundled extensions that render embeds.
pub const DEFAULT_EMBED_COLOR: u64 = 0x00FF_D868;

/// A declared extension.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionDescriptor {
    /// Dotted module name, absolute or relative (leading dots).
    pub name: String,

    /// Package a relative `name` is resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// Keyword arguments passed to the extension when it is set up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
}

impl ExtensionDescriptor {
    /// Creates a descriptor for an absolute module name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: None,
            config: None,
        }
    }

    /// Sets the package a relative name is resolved against.
    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Sets the keyword arguments.
    #[must_use]
    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = Some(config);
        self
    }

    /// Returns the absolute module name, the identity of the extension.
    ///
    /// # Errors
    ///
    /// Returns `ExtensionError::InvalidName` if the name is malformed, or
    /// relative without a package, or climbs above its package.
    pub fn qualified_name(&self) -> Result<String> {
        resolve_name(&self.name, self.package.as_deref())
    }
}

/// Resolves a possibly relative module name against `package`.
///
/// A name with `n` leading dots is resolved against `package` with `n - 1`
/// trailing components removed, so `.help` in `bot.exts` is `bot.exts.help`
/// and `..tools` in `bot.exts` is `bot.tools`.
///
/// # Errors
///
/// Returns `ExtensionError::InvalidName` if the result is not a dotted
/// identifier or cannot be resolved.
pub fn resolve_name(name: &str, package: Option<&str>) -> Result<String> {
    let level = name.chars().take_while(|c| *c == '.').count();
    let qualified = if level == 0 {
        name.to_owned()
    } else {
        let Some(package) = package.filter(|p| !p.is_empty()) else {
            return Err(invalid_name(name, "relative names require a 'package'"));
        };
        let mut base = package;
        for _ in 1..level {
            base = match base.rsplit_once('.') {
                Some((head, _)) => head,
                None => {
                    return Err(invalid_name(
                        name,
                        &format!("relative import beyond top-level package '{package}'"),
                    ));
                }
            };
        }
        let rest = name.trim_start_matches('.');
        if rest.is_empty() {
            base.to_owned()
        } else {
            format!("{base}.{rest}")
        }
    };

    if !is_dotted_identifier(&qualified) {
        return Err(invalid_name(name, "expected a dotted identifier"));
    }
    Ok(qualified)
}

fn is_dotted_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|first| first.is_alphabetic() || first == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
}

fn invalid_name(name: &str, reason: &str) -> crate::error::BotconfError {
    ExtensionError::InvalidName {
        name: name.to_owned(),
        reason: reason.to_owned(),
    }
    .into()
}

/// Ignore settings applied during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    /// Names to skip, matched against declared and qualified names.
    pub ignore_names: BTreeSet<String>,
    /// Skip everything.
    pub ignore_all: bool,
    /// Skip bundled extensions.
    pub ignore_default: bool,
    /// Skip operator-declared extensions.
    pub ignore_extra: bool,
}

/// Computes the ordered list of extensions to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionResolver {
    namespace: String,
}

impl Default for ExtensionResolver {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION_NAMESPACE)
    }
}

impl ExtensionResolver {
    /// Creates a resolver treating names inside `namespace` as defaults.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Returns `true` if `qualified_name` lies inside the default namespace.
    #[must_use]
    pub fn is_default(&self, qualified_name: &str) -> bool {
        qualified_name == self.namespace
            || qualified_name
                .strip_prefix(self.namespace.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Resolves the load order.
    ///
    /// Returned descriptors carry their qualified name in `name`. A name
    /// that cannot be resolved is treated as an extra, and is only an error
    /// if it survives the ignore settings.
    ///
    /// # Errors
    ///
    /// Returns `ExtensionError::InvalidName` for an unresolvable name that is
    /// not ignored, and `ExtensionError::Ambiguous` when two surviving
    /// descriptors share a qualified name. Neither is checked when
    /// `ignore_all` is set.
    pub fn resolve(
        &self,
        declared: &[ExtensionDescriptor],
        filter: &ExtensionFilter,
    ) -> Result<Vec<ExtensionDescriptor>> {
        if filter.ignore_all {
            debug!(declared = declared.len(), "all extensions ignored");
            return Ok(Vec::new());
        }

        let mut defaults = Vec::new();
        let mut extras = Vec::new();
        for descriptor in declared {
            if filter.ignore_names.contains(&descriptor.name) {
                debug!(extension = %descriptor.name, "extension ignored by name");
                continue;
            }
            let qualified = descriptor.qualified_name();
            if qualified.as_ref().is_ok_and(|name| self.is_default(name)) {
                defaults.push((qualified, descriptor));
            } else {
                extras.push((qualified, descriptor));
            }
        }

        if filter.ignore_default {
            defaults.clear();
        }
        if filter.ignore_extra {
            extras.clear();
        }

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for (resolution, descriptor) in defaults.into_iter().chain(extras) {
            let qualified = resolution?;
            if filter.ignore_names.contains(&qualified) {
                debug!(extension = %qualified, "extension ignored by name");
                continue;
            }
            if !seen.insert(qualified.clone()) {
                return Err(ExtensionError::Ambiguous { name: qualified }.into());
            }
            resolved.push(ExtensionDescriptor {
                name: qualified,
                package: descriptor.package.clone(),
                config: descriptor.config.clone(),
            });
        }

        debug!(
            declared = declared.len(),
            resolved = resolved.len(),
            "extension load order resolved"
        );
        Ok(resolved)
    }
}

/// Extensions shipped with the bot.
#[must_use]
pub fn bundled_extensions() -> Vec<ExtensionDescriptor> {
    let with_color = |module: &str| {
        let mut config = Map::new();
        config.insert(String::from("color"), json!(DEFAULT_EMBED_COLOR));
        ExtensionDescriptor::new(format!("{DEFAULT_EXTENSION_NAMESPACE}.{module}"))
            .with_config(config)
    };
    let plain =
        |module: &str| ExtensionDescriptor::new(format!("{DEFAULT_EXTENSION_NAMESPACE}.{module}"));

    vec![
        with_color("bot_management"),
        with_color("docs"),
        with_color("help"),
        plain("messaging"),
        plain("polls"),
        with_color("text_command_manager"),
        with_color("channel_manager"),
    ]
}
