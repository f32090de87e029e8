//! Environment overrides for the credentials section.
//!
//! Secrets are kept out of configuration files by satisfying the leaf keys of
//! the `authentication` table from environment variables named
//! `<PREFIX>_<UPPERCASED_KEY>` (for example `AUTH_TOKEN`). An environment value
//! always wins over the inline value of the layer it is applied to, and the
//! resolver is re-applied after every file layer is merged.

use ortho_config::serde_json::{Map, Value};
use tracing::debug;

use super::merge::{ConfigMapping, Overlay, OverlayEntry};

/// Default prefix for credential environment variables.
pub const DEFAULT_ENV_PREFIX: &str = "AUTH";

/// The top-level key holding the credentials section.
pub const CREDENTIALS_KEY: &str = "authentication";

/// Credential keys looked up in the environment even when no layer declares them.
pub const KNOWN_CREDENTIAL_KEYS: &[&str] = &["token", "client_id"];

/// Resolves credential values from the environment.
///
/// # Type Parameters
///
/// * `E` - An environment provider implementing the `mockable::Env` trait,
///   allowing for testable environment variable access.
///
/// # Example
///
/// ```ignore
/// use mockable::DefaultEnv;
/// use botconf::config::CredentialResolver;
///
/// let env = DefaultEnv::new();
/// let resolver = CredentialResolver::new(&env, "AUTH");
/// let merged = resolver.resolve_in(merged);
/// ```
pub struct CredentialResolver<'a, E: mockable::Env> {
    env: &'a E,
    prefix: String,
    known_keys: Vec<String>,
}

impl<'a, E: mockable::Env> CredentialResolver<'a, E> {
    /// Creates a resolver reading `<prefix>_<KEY>` variables from `env`.
    #[must_use]
    pub fn new(env: &'a E, prefix: impl Into<String>) -> Self {
        Self {
            env,
            prefix: prefix.into(),
            known_keys: KNOWN_CREDENTIAL_KEYS
                .iter()
                .map(|key| (*key).to_owned())
                .collect(),
        }
    }

    /// Replaces the list of keys looked up even when absent from the section.
    #[must_use]
    pub fn with_known_keys(mut self, keys: &[&str]) -> Self {
        self.known_keys = keys.iter().map(|key| (*key).to_owned()).collect();
        self
    }

    /// Returns the environment variable consulted for `key`.
    #[must_use]
    pub fn env_var_name(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, key.to_uppercase())
    }

    /// Returns the non-empty environment value for `key`, if any.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.env
            .string(&self.env_var_name(key))
            .filter(|value| !value.is_empty())
    }

    /// Applies environment values to a credentials section.
    ///
    /// Every leaf key of `section`, and every known key, is replaced by its
    /// environment value when one is set. Values stay strings; nested tables
    /// are not credential keys and are left untouched.
    #[must_use]
    pub fn resolve(&self, section: &ConfigMapping) -> ConfigMapping {
        let mut resolved = section.clone();

        let leaf_keys = section
            .iter()
            .filter(|(_, value)| !value.is_object())
            .map(|(key, _)| key.clone());
        let absent_known = self
            .known_keys
            .iter()
            .filter(|key| !section.contains_key(key.as_str()))
            .cloned();

        for key in leaf_keys.chain(absent_known) {
            if let Some(value) = self.lookup(&key) {
                debug!(
                    key = %key,
                    env_var = %self.env_var_name(&key),
                    "credential supplied by environment"
                );
                resolved.insert(key, Value::String(value));
            }
        }
        resolved
    }

    /// Applies [`resolve`](Self::resolve) to the credentials section of a
    /// full configuration mapping.
    ///
    /// A missing section is created when the environment supplies any known
    /// key. A section that is not a table is left for schema validation to
    /// report.
    #[must_use]
    pub fn resolve_in(&self, mut mapping: ConfigMapping) -> ConfigMapping {
        let section = match mapping.get(CREDENTIALS_KEY) {
            Some(Value::Object(section)) => self.resolve(section),
            Some(_) => return mapping,
            None => self.resolve(&Map::new()),
        };
        if !section.is_empty() || mapping.contains_key(CREDENTIALS_KEY) {
            mapping.insert(CREDENTIALS_KEY.to_owned(), Value::Object(section));
        }
        mapping
    }

    /// Applies environment values to the credentials entry of a layer's
    /// overlay before it is merged.
    ///
    /// Leaf entries (replacements and deletions) and absent known keys are
    /// replaced by their environment value when one is set, so a later layer
    /// can neither override nor delete an environment-supplied credential.
    #[must_use]
    pub fn resolve_overlay(&self, overlay: &Overlay) -> Overlay {
        let mut resolved = overlay.clone();
        let entry = match overlay.get(CREDENTIALS_KEY) {
            None => self.resolve_section_overlay(&Overlay::new()),
            Some(OverlayEntry::Merge(section)) => self.resolve_section_overlay(section),
            Some(OverlayEntry::Replace(Value::Object(section))) => {
                Some(OverlayEntry::Replace(Value::Object(self.resolve(section))))
            }
            Some(OverlayEntry::Omit) => {
                let section = self.resolve(&Map::new());
                (!section.is_empty()).then(|| OverlayEntry::Replace(Value::Object(section)))
            }
            Some(OverlayEntry::Replace(_)) => None,
        };
        if let Some(entry) = entry {
            resolved.insert(CREDENTIALS_KEY, entry);
        }
        resolved
    }

    fn resolve_section_overlay(&self, section: &Overlay) -> Option<OverlayEntry> {
        let mut resolved = section.clone();
        let leaf_keys = section
            .iter()
            .filter(|(_, entry)| !matches!(entry, OverlayEntry::Merge(_)))
            .map(|(key, _)| key.clone());
        let absent_known = self
            .known_keys
            .iter()
            .filter(|key| section.get(key.as_str()).is_none())
            .cloned();

        let mut changed = false;
        for key in leaf_keys.chain(absent_known) {
            if let Some(value) = self.lookup(&key) {
                debug!(
                    key = %key,
                    env_var = %self.env_var_name(&key),
                    "credential supplied by environment"
                );
                resolved.replace(key, Value::String(value));
                changed = true;
            }
        }
        (changed || !section.is_empty()).then(|| OverlayEntry::Merge(resolved))
    }
}
