//! Layered configuration resolution for a long-running chat bot.
//!
//! `botconf` merges a base configuration file, an optional local override
//! file, credential environment variables, and command-line flags into one
//! immutable [`config::RuntimeConfig`] before the bot connects anywhere. The
//! same pass computes the ordered list of extensions to load and validates the
//! declared databases.
//!
//! Resolution is all-or-nothing: any fatal condition is returned as a
//! [`error::BotconfError`] and no partial configuration is exposed.
//!
//! # Modules
//!
//! - [`config`]: Sources, layer merging, credentials, CLI overlay, and the runtime configuration
//! - [`database`]: Database declarations and the main database
//! - [`error`]: Semantic error types for the library
//! - [`extensions`]: Extension selection and load ordering
//! - [`logging`]: Console logging setup

pub mod config;
pub mod database;
pub mod error;
pub mod extensions;
pub mod logging;
