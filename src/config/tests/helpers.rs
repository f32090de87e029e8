//! Shared fixtures and helper functions for config tests.

use crate::config::{ConfigMapping, Overlay, Settings, SourceRole, load_source_str, merge_all};
use ortho_config::serde_json::Value;
use rstest::fixture;

/// Fixture providing `Settings` parsed from a full TOML example.
#[fixture]
pub fn settings_from_full_toml() -> Settings {
    let toml = r#"
        [config]
        intents = "0x8001"
        command_prefix = ["!", "?"]
        mention_as_command_prefix = true
        log_level = "info"
        log_file_extension = ".log"
        owner_ids = [1, 2]
        manager_role_ids = [3]
        dev_guild_id = 4
        main_database_name = "main"

        [config.authentication]
        token = "file-token"
        client_id = "1234"

        [[config.extensions]]
        name = ".music"
        package = "thirdparty"
        config = { volume = 30 }

        [[config.databases]]
        name = "main"
        url = "sqlite:///bot.db"
    "#;

    settings_from_layers(&[source(toml)]).expect("full example should validate")
}

/// Fixture providing `Settings` built from defaults alone.
#[fixture]
pub fn default_settings() -> Settings {
    Settings::default()
}

/// Helper: Parses the `config` table of a TOML document.
pub fn source(toml: &str) -> ConfigMapping {
    load_source_str(toml, "test", SourceRole::Primary)
        .expect("source should load")
        .expect("source should have a config table")
}

/// Helper: Converts a JSON object into a mapping.
pub fn mapping(value: Value) -> ConfigMapping {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// Helper: Applies layers over the defaults mapping.
pub fn merged_with_defaults(layers: &[ConfigMapping]) -> ConfigMapping {
    let defaults = Settings::defaults_mapping().expect("defaults should serialise");
    let overlays: Vec<Overlay> = layers.iter().map(Overlay::from_mapping).collect();
    merge_all(defaults, &overlays)
}

/// Helper: Applies layers over the defaults and parses the result.
pub fn settings_from_layers(layers: &[ConfigMapping]) -> crate::error::Result<Settings> {
    Settings::from_mapping(&merged_with_defaults(layers))
}

/// Helper: Asserts that settings hold the built-in defaults.
pub fn assert_settings_have_defaults(settings: &Settings) {
    assert_eq!(
        settings.intents,
        crate::config::DEFAULT_INTENTS,
        "intents should default to the non-privileged set"
    );
    assert_eq!(
        settings.command_prefix,
        Some(crate::config::CommandPrefix::Single(String::from("!"))),
        "command_prefix should default to '!'"
    );
    assert!(
        !settings.mention_as_command_prefix,
        "mention_as_command_prefix should be false"
    );
    assert_eq!(
        settings.default_extensions,
        crate::extensions::bundled_extensions(),
        "default_extensions should be the bundled list"
    );
    assert!(settings.extensions.is_empty(), "extensions should be empty");
    assert!(settings.databases.is_empty(), "databases should be empty");
    assert!(settings.log_level.is_none(), "log_level should be None");
    assert!(settings.authentication.token.is_none(), "token should be None");
}
