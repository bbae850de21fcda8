use std::path::PathBuf;

use expect_test::expect;
use webparts_core::PersonalizationScope;
use webparts_runtime::{logging, PersonalizationConfig, StoreConfig, WebPartsError};

#[test]
fn empty_file_yields_defaults() {
    let config = PersonalizationConfig::from_toml_str("").expect("empty config");
    assert_eq!(config, PersonalizationConfig::default());
    assert!(config.enabled);
    assert_eq!(config.initial_scope, PersonalizationScope::User);
    assert_eq!(config.log_level, "info");
}

#[test]
fn every_section_is_read() {
    let config = PersonalizationConfig::from_toml_str(
        r#"
[personalization]
enabled = true
initial_scope = "Shared"
can_enter_shared_scope = true

[store]
kind = "file"
path = "/var/lib/webparts"

[transformers]
allowed = [" RowToFieldTransformer "]

[log]
level = "debug"
"#,
    )
    .expect("config");
    assert_eq!(config.initial_scope, PersonalizationScope::Shared);
    assert!(config.can_enter_shared_scope);
    assert_eq!(
        config.store,
        StoreConfig::File {
            root: PathBuf::from("/var/lib/webparts"),
        }
    );
    assert_eq!(config.allowed_transformers, ["RowToFieldTransformer"]);
    assert_eq!(config.log_level, "debug");
}

#[test]
fn invalid_values_are_reported() {
    let messages: Vec<String> = [
        "[personalization]\ninitial_scope = \"everyone\"",
        "[store]\nkind = \"redis\"",
        "[store]\nkind = \"file\"\npath = \" \"",
        "[transformers]\nallowed = [\"\"]",
        "[log]\nlevel = \"loud\"",
    ]
    .iter()
    .map(|text| match PersonalizationConfig::from_toml_str(text) {
        Err(WebPartsError::InvalidConfig(message)) => message.to_string(),
        other => panic!("expected invalid config, got {other:?}"),
    })
    .collect();
    expect![[r#"
        [
            "invalid personalization.initial_scope 'everyone'",
            "invalid store.kind 'redis'",
            "store.path required when kind=file",
            "transformers.allowed entries must not be empty",
            "invalid log.level 'loud'",
        ]
    "#]]
    .assert_debug_eq(&messages);
}

#[test]
fn syntax_errors_name_the_file() {
    let err = PersonalizationConfig::from_toml_str("[personalization\n").unwrap_err();
    assert!(matches!(
        &err,
        WebPartsError::InvalidConfig(message) if message.starts_with("personalization.toml:")
    ));
}

#[test]
fn missing_file_is_a_config_error() {
    let path = std::env::temp_dir().join(format!(
        "webparts-config-missing-{}.toml",
        std::process::id()
    ));
    assert!(matches!(
        PersonalizationConfig::load(&path),
        Err(WebPartsError::InvalidConfig(_))
    ));
}

#[test]
fn logging_accepts_configured_levels_only() {
    assert!(logging::init("warn").is_ok());
    assert!(logging::init(" info ").is_ok());
    assert!(matches!(
        logging::init("chatty"),
        Err(WebPartsError::InvalidConfig(_))
    ));
}
