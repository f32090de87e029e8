//! Database declarations and the main database.
//!
//! Only the declarations are resolved here. Connection pools are built by a
//! collaborator from the registry handed out by the runtime configuration.

use std::collections::BTreeMap;

use ortho_config::serde_json::{Map, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, DatabaseError, Result};

/// A declared database.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseDescriptor {
    /// Unique name the database is referred to by.
    pub name: String,

    /// Connection URL.
    pub url: String,

    /// Extra keyword arguments for the connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_args: Option<Map<String, Value>>,
}

impl DatabaseDescriptor {
    /// Creates a descriptor without connection arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            connect_args: None,
        }
    }

    /// Sets the connection arguments.
    #[must_use]
    pub fn with_connect_args(mut self, connect_args: Map<String, Value>) -> Self {
        self.connect_args = Some(connect_args);
        self
    }
}

// URLs may carry passwords.
impl std::fmt::Debug for DatabaseDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseDescriptor")
            .field("name", &self.name)
            .field("url", &redact_url(&self.url))
            .field(
                "connect_args",
                &self.connect_args.as_ref().map(|args| args.keys().collect::<Vec<_>>()),
            )
            .finish()
    }
}

/// Returns `url` with any userinfo password replaced by `***`.
#[must_use]
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_owned();
    };
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let Some((userinfo, host)) = authority.rsplit_once('@') else {
        return url.to_owned();
    };
    userinfo.split_once(':').map_or_else(
        || url.to_owned(),
        |(user, _)| format!("{scheme}://{user}:***@{host}{tail}"),
    )
}

/// Validated databases keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseRegistry {
    databases: BTreeMap<String, DatabaseDescriptor>,
    main: Option<String>,
}

impl DatabaseRegistry {
    /// Validates `declared` and selects the main database.
    ///
    /// With `main_name` absent, a single declared database is the main one;
    /// with zero or several there is no main database.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty name or URL,
    /// `DatabaseError::DuplicateName` for a repeated name, and
    /// `DatabaseError::UnknownMain` when `main_name` is not declared.
    pub fn resolve(declared: &[DatabaseDescriptor], main_name: Option<&str>) -> Result<Self> {
        let mut databases = BTreeMap::new();
        for descriptor in declared {
            if descriptor.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: String::from("databases.name"),
                    reason: String::from("must not be empty"),
                }
                .into());
            }
            if descriptor.url.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("databases.{}.url", descriptor.name),
                    reason: String::from("must not be empty"),
                }
                .into());
            }
            if databases
                .insert(descriptor.name.clone(), descriptor.clone())
                .is_some()
            {
                return Err(DatabaseError::DuplicateName {
                    name: descriptor.name.clone(),
                }
                .into());
            }
        }

        let main = match main_name {
            Some(name) if databases.contains_key(name) => Some(name.to_owned()),
            Some(name) => {
                return Err(DatabaseError::UnknownMain {
                    name: name.to_owned(),
                }
                .into());
            }
            None if databases.len() == 1 => databases.keys().next().cloned(),
            None => None,
        };

        debug!(
            count = databases.len(),
            main = main.as_deref().unwrap_or("<none>"),
            "database registry resolved"
        );
        Ok(Self { databases, main })
    }

    /// Returns the database called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DatabaseDescriptor> {
        self.databases.get(name)
    }

    /// Returns the main database, if one was selected.
    #[must_use]
    pub fn main(&self) -> Option<&DatabaseDescriptor> {
        self.main.as_deref().and_then(|name| self.databases.get(name))
    }

    /// Returns the main database for collaborators that cannot work without one.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoMainDatabase` when no main database was selected.
    pub fn require_main(&self) -> Result<&DatabaseDescriptor> {
        self.main()
            .ok_or_else(|| DatabaseError::NoMainDatabase.into())
    }

    /// Number of declared databases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.databases.len()
    }

    /// Returns `true` when no database is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Iterates over the databases in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DatabaseDescriptor)> {
        self.databases.iter()
    }

    /// Iterates over the database names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }
}
