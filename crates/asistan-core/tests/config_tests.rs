//! Tests for config.rs

use asistan_core::config::CoreConfig;
use asistan_core::error::ConfigError;
use asistan_core::tier::TierForce;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_partial_document_keeps_other_defaults() {
    let config = CoreConfig::from_toml_str(
        r#"
[router]
min_confidence = 0.5

[tier]
force = "quality"

[entities]
default_ttl = 5

[entities.ttl_overrides]
email = 2
"#,
    )
    .unwrap();

    assert_eq!(config.router.min_confidence, 0.5);
    assert_eq!(config.router.repair_attempts, 1);
    assert_eq!(config.tier.force, Some(TierForce::Quality));
    assert!(config.tier.is_enabled());
    assert_eq!(config.entities.ttl_for("email"), 2);
    assert_eq!(config.entities.ttl_for("calendar_event"), 5);
    assert_eq!(config.entities.prompt_budget_chars, 400);
    assert_eq!(config.dialog.max_reprompts, 3);
    assert_eq!(config.sanitizer.max_error_chars, 150);
}

#[test]
fn test_custom_tool_catalog_replaces_standard() {
    let config = CoreConfig::from_toml_str(
        r#"
[[tools]]
name = "notes.create"
required_slots = ["title"]
requires_confirmation = true

[[tools]]
name = "notes.delete"
requires_confirmation = true
entity_param = { param = "note_id", entity_type = "note" }
"#,
    )
    .unwrap();

    assert_eq!(config.tools.tools.len(), 2);
    let create = config.tools.spec("notes.create");
    assert!(create.requires_confirmation);
    assert_eq!(create.required_slots, vec!["title"]);
    let delete = config.tools.spec("notes.delete");
    assert_eq!(delete.entity_param.unwrap().entity_type, "note");
    assert!(!config.tools.spec("gmail.send").requires_confirmation);
}

#[test]
fn test_duplicate_tool_rejected() {
    let err = CoreConfig::from_toml_str(
        r#"
[[tools]]
name = "time.now"

[[tools]]
name = "time.now"
"#,
    )
    .unwrap_err();
    match err {
        ConfigError::Invalid(message) => assert!(message.contains("time.now")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_zero_reprompts_rejected() {
    let err = CoreConfig::from_toml_str("[dialog]\nmax_reprompts = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_malformed_toml_is_toml_error() {
    let err = CoreConfig::from_toml_str("[router\nmin_confidence = ").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[tier]\nenabled = false").unwrap();
    let config = CoreConfig::load(file.path()).unwrap();
    assert!(!config.tier.is_enabled());
}

#[test]
fn test_load_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("asistan.toml");
    let err = CoreConfig::load(&missing).unwrap_err();
    assert!(format!("{:#}", err).contains("asistan.toml"));
}

#[test]
fn test_load_or_default_without_path() {
    let config = CoreConfig::load_or_default(None).unwrap();
    assert_eq!(config, CoreConfig::default());
}
