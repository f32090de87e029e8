//! Semantic error types for the botconf resolution pipeline.
//!
//! Every condition here is fatal at startup. The enums are semantic (via
//! `thiserror`) so callers and tests can match on the offending key, while
//! the binary converts them into `eyre::Report` at the application boundary.

use thiserror::Error;

/// Errors raised while loading, merging, or validating configuration layers.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the primary nor the secondary source supplied configuration data.
    #[error(
        "no configuration source could be loaded: primary '{primary}', local override '{secondary}'"
    )]
    MissingMandatorySource {
        /// Where the primary source was looked for.
        primary: String,
        /// Where the local override source was looked for.
        secondary: String,
    },

    /// A required credential is absent from every file layer and the environment.
    #[error("missing required credential 'authentication.{key}' (set it inline or via {env_var})")]
    MissingCredential {
        /// The credential key inside the `authentication` table.
        key: String,
        /// The environment variable that would have satisfied it.
        env_var: String,
    },

    /// A configuration source could not be parsed.
    #[error("failed to parse configuration: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },
}

/// Errors raised while computing the extension load plan.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// Two surviving descriptors resolve to the same qualified name.
    #[error("extension '{name}' is declared more than once")]
    Ambiguous {
        /// The qualified name both descriptors resolve to.
        name: String,
    },

    /// An extension name cannot be resolved to a qualified name.
    #[error("invalid extension name '{name}': {reason}")]
    InvalidName {
        /// The name as declared.
        name: String,
        /// Why the name is unusable.
        reason: String,
    },
}

/// Errors raised while validating the declared databases.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Two databases share the same name.
    #[error("database name '{name}' is declared more than once")]
    DuplicateName {
        /// The repeated database name.
        name: String,
    },

    /// `main_database_name` does not match any declared database.
    #[error("main database '{name}' is not among the declared databases")]
    UnknownMain {
        /// The requested main database name.
        name: String,
    },

    /// A collaborator required a main database but none could be chosen.
    #[error("no main database is configured")]
    NoMainDatabase,
}

/// Top-level error type for botconf.
///
/// Aggregates the domain errors into a single type. At the application
/// boundary (`main.rs`) it is converted into `eyre::Report`.
#[derive(Debug, Error)]
pub enum BotconfError {
    /// An error occurred while resolving configuration layers.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred while resolving extensions.
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// An error occurred while resolving databases.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A specialised `Result` type for botconf operations.
pub type Result<T> = std::result::Result<T, BotconfError>;
