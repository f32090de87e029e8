//! Cross-field validation tests for `Settings`.

use super::helpers::{mapping, settings_from_layers};
use crate::config::{PrefixRule, Settings};
use crate::error::{BotconfError, ConfigError};
use ortho_config::serde_json::{Value, json};
use rstest::rstest;

fn validated(layer: Value) -> crate::error::Result<Settings> {
    let settings = settings_from_layers(&[mapping(layer)])?;
    settings.validate()?;
    Ok(settings)
}

fn invalid_field(result: crate::error::Result<Settings>) -> String {
    match result.expect_err("validation should fail") {
        BotconfError::Config(ConfigError::InvalidValue { field, .. }) => field,
        other => panic!("expected ConfigError::InvalidValue, got: {other:?}"),
    }
}

#[rstest]
fn defaults_are_valid() {
    validated(json!({})).expect("defaults should validate");
}

#[rstest]
#[case(json!({"command_prefix": "?"}), vec!["?"], false)]
#[case(json!({"command_prefix": ["?", "!"], "mention_as_command_prefix": true}), vec!["?", "!"], true)]
#[case(json!({"command_prefix": {"$omit": true}, "mention_as_command_prefix": true}), vec![], true)]
fn prefix_rule_combines_prefixes_and_mention(
    #[case] layer: Value,
    #[case] prefixes: Vec<&str>,
    #[case] mention: bool,
) {
    let settings = validated(layer).expect("prefix rule should validate");
    assert_eq!(
        settings.prefix_rule().expect("rule should resolve"),
        PrefixRule {
            prefixes: prefixes.into_iter().map(String::from).collect(),
            mention,
        }
    );
}

#[rstest]
fn no_prefix_and_no_mention_is_rejected() {
    let field = invalid_field(validated(json!({"command_prefix": {"$omit": true}})));
    assert_eq!(field, "mention_as_command_prefix");
}

#[rstest]
#[case(json!({"command_prefix": ""}))]
#[case(json!({"command_prefix": ["!", ""]}))]
fn empty_prefix_is_rejected(#[case] layer: Value) {
    assert_eq!(invalid_field(validated(layer)), "command_prefix");
}

#[rstest]
fn owner_id_and_owner_ids_are_exclusive() {
    let field = invalid_field(validated(json!({"owner_id": 1, "owner_ids": [2]})));
    assert_eq!(field, "owner_ids");
}

#[rstest]
#[case(json!({"owner_ids": []}), "owner_ids")]
#[case(json!({"owner_role_ids": []}), "owner_role_ids")]
fn empty_owner_lists_are_rejected(#[case] layer: Value, #[case] expected: &str) {
    assert_eq!(invalid_field(validated(layer)), expected);
}

#[rstest]
fn missing_log_directory_is_rejected() {
    let field = invalid_field(validated(json!({
        "log_directory": "/definitely/not/a/botconf/directory"
    })));
    assert_eq!(field, "log_directory");
}

#[rstest]
fn existing_log_directory_is_accepted() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().to_str().expect("temp path should be UTF-8");
    validated(json!({"log_directory": path})).expect("existing directory should validate");
}

#[rstest]
#[case(json!({"log_filename": " "}), "log_filename")]
#[case(json!({"extension_namespace": ""}), "extension_namespace")]
fn empty_names_are_rejected(#[case] layer: Value, #[case] expected: &str) {
    assert_eq!(invalid_field(validated(layer)), expected);
}
