#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;

use notes_core::allowed_html::AllowedHtml;
use notes_core::config::{Config, ConfigError};

#[test]
fn loads_yaml_sections_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        "database:\n  path: /var/lib/notes.db\nlogging:\n  level: debug\nallowed_html:\n  extra:\n    code: [class]\n    blockquote: []\n  remove: [hr]\n",
    )
    .unwrap();

    let cfg = Config::load_file(&path).unwrap();
    assert_eq!(cfg.database.path, "/var/lib/notes.db");
    assert_eq!(cfg.database.busy_timeout_ms, 5000);
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.logging.format, "console");
    assert!(cfg.validate().is_ok());

    let allowed = (cfg.allowed_html_filter())(AllowedHtml::default());
    assert!(allowed.allows_attribute("code", "class"));
    assert!(allowed.allows_tag("blockquote"));
    assert!(!allowed.allows_tag("hr"));
}

#[test]
fn empty_file_is_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "\n").unwrap();
    assert_eq!(Config::load_file(&path).unwrap(), Config::default());
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "logging: [unterminated\n").unwrap();
    assert!(matches!(
        Config::load_file(&path),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn explicit_missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    assert!(matches!(
        Config::load(Some(&path)),
        Err(ConfigError::Read { .. })
    ));
}

#[test]
fn load_validates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "logging:\n  format: xml\n").unwrap();
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "err={err}");
}
