//! `botconf` application entry point.
//!
//! Resolves the bot configuration and reports the result. Domain errors are
//! converted into `eyre::Report` here, at the application boundary.
//!
//! Configuration is resolved with layered precedence:
//! 1. Built-in defaults
//! 2. Primary source (`--config`, `BOTCONF_CONFIG_SOURCE`, `BOTCONF_CONFIG_PATH`, `config.toml`)
//! 3. Credential environment variables (`AUTH_*` by default)
//! 4. Local override source (`--localconfig`, `BOTCONF_LOCALCONFIG_SOURCE`, `localconfig.toml`)
//! 5. Command-line flags

use botconf::config::{Cli, Commands, LogLevel, RuntimeConfig, load_runtime_config};
use botconf::logging;
use clap::Parser;
use eyre::{Report, Result as EyreResult};
use mockable::DefaultEnv;
use ortho_config::serde_json::{Map, Value};
use tracing::info;

/// Application entry point.
fn main() -> EyreResult<()> {
    let cli = Cli::parse();

    // An invalid level is reported by validation once the layers are merged.
    let cli_level = cli
        .log_level
        .as_deref()
        .and_then(|level| level.parse::<LogLevel>().ok());
    let log = logging::init(cli_level, cli.quiet)?;

    let env = DefaultEnv::new();
    let config = load_runtime_config(&cli, &env).map_err(Report::from)?;
    log.apply(config.settings().log_level, cli.quiet)?;

    match cli.subcommand() {
        Commands::Run => run(&config),
        Commands::Check => check(&config),
        Commands::Extensions => list_extensions(&config),
        Commands::Databases => list_databases(&config),
    }
    Ok(())
}

/// Hand the resolved plan to the bot.
fn run(config: &RuntimeConfig) {
    for extension in config.extensions() {
        info!(extension = %extension.name, "extension scheduled for loading");
    }
    info!(
        extensions = config.extensions().len(),
        databases = config.databases().len(),
        "configuration ready"
    );
}

/// Print a summary of the resolved configuration.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn check(config: &RuntimeConfig) {
    let settings = config.settings();
    println!("configuration OK");
    println!("intents: {}", settings.intents);
    match config.prefix_rule() {
        Ok(rule) => println!(
            "command prefixes: {:?} (mention: {})",
            rule.prefixes, rule.mention
        ),
        Err(e) => println!("command prefixes: {e}"),
    }
    println!(
        "log level: {}",
        settings
            .log_level
            .map_or("WARNING (default)", LogLevel::as_str)
    );
    println!("extensions: {}", config.extensions().len());
    println!(
        "databases: {} (main: {})",
        config.databases().len(),
        config.main_database().map_or("none", |db| db.name.as_str())
    );
}

/// Print the extension load order.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn list_extensions(config: &RuntimeConfig) {
    for (position, extension) in config.extensions().iter().enumerate() {
        let kwargs = extension
            .config
            .as_ref()
            .map(|kwargs| format!(" {}", render_kwargs(kwargs)))
            .unwrap_or_default();
        println!("{:>2}. {}{kwargs}", position + 1, extension.name);
    }
}

/// Print the database registry.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn list_databases(config: &RuntimeConfig) {
    let main = config.main_database().map(|db| db.name.as_str());
    for (name, database) in config.databases().iter() {
        let marker = if Some(name.as_str()) == main { " (main)" } else { "" };
        println!(
            "{name}{marker}: {}",
            botconf::database::redact_url(&database.url)
        );
    }
}

fn render_kwargs(kwargs: &Map<String, Value>) -> String {
    Value::Object(kwargs.clone()).to_string()
}

