//! Tests for configuration module

use super::*;
use crate::error::{Error, Result};
use std::io::Write;
use tempfile::NamedTempFile;

fn create_temp_config_file(content: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .map_err(|e| Error::config(format!("Failed to create temp file: {e}")))?;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::config(format!("Failed to write temp file: {e}")))?;
    file.flush()
        .map_err(|e| Error::config(format!("Failed to flush temp file: {e}")))?;
    Ok(file)
}

#[test]
fn test_from_toml_str_valid() {
    let toml = r#"
        fixtures_root = "tests/fixtures"
        strict = false

        [http]
        base_url = "http://localhost:9090"
        timeout_secs = 5

        [http.default_headers]
        Accept = "application/json"

        [csrf]
        enabled = true
        token = "abc"
    "#;

    let config = EngineConfig::from_toml_str(toml).expect("Failed to parse valid TOML");
    assert_eq!(config.fixtures_root, "tests/fixtures");
    assert!(!config.strict);
    assert!(config.strict_vars);
    assert_eq!(config.http.base_url, "http://localhost:9090");
    assert_eq!(config.http.timeout_secs, 5);
    assert_eq!(config.http.default_headers["Accept"], "application/json");
    assert_eq!(config.csrf.header_name, "X-CSRF-TOKEN");
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_toml_str_empty_uses_defaults() {
    let config = EngineConfig::from_toml_str("").expect("Failed to parse empty TOML");
    assert_eq!(config.fixtures_root, "fixtures");
    assert_eq!(config.file_names[0], "fixtures.yaml");
    assert!(config.strict);
    assert_eq!(config.overwrite_policy(), OverwritePolicy::Strict);
    assert_eq!(config.http.base_url, "http://localhost:8080");
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_toml_str_invalid_syntax() {
    let toml = r#"
        [http
        base_url = "x"
    "#;

    let result = EngineConfig::from_toml_str(toml);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Failed to parse TOML"));
}

#[test]
fn test_validation_rejects_bad_base_url() {
    let mut config = EngineConfig::default();
    config.http.base_url = "localhost:8080".to_string();
    let result = config.validate();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Invalid http.base_url"));
}

#[test]
fn test_validation_timeout_bounds() {
    let mut config = EngineConfig::default();
    config.http.timeout_secs = 0;
    assert!(config.validate().is_err());
    config.http.timeout_secs = 3601;
    assert!(config.validate().is_err());
    config.http.timeout_secs = 60;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validation_file_names() {
    let mut config = EngineConfig::default();
    config.file_names = vec![];
    assert!(config.validate().is_err());
    config.file_names = vec!["nested/fixtures.yaml".to_string()];
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_csrf_requires_token() {
    let mut config = EngineConfig::default();
    config.csrf.enabled = true;
    assert!(config.validate().is_err());
    config.csrf.token = Some("t".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_validation_basic_auth_pairs() {
    let mut config = EngineConfig::default();
    config.auth.basic_username = Some("admin".to_string());
    assert!(config.validate().is_err());
    config.auth.basic_password = Some("secret".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_debug_redacts_secrets() {
    let mut config = EngineConfig::default();
    config.auth.bearer_token = Some("super-secret".to_string());
    config.csrf.token = Some("csrf-secret".to_string());
    let debug = format!("{config:?}");
    assert!(!debug.contains("super-secret"));
    assert!(!debug.contains("csrf-secret"));
    assert!(debug.contains("***REDACTED***"));
}

#[test]
fn test_from_file_reads_toml() {
    let file = create_temp_config_file(
        r#"
        fixtures_root = "custom"
        strict_vars = false
    "#,
    )
    .expect("temp config");

    let config = EngineConfig::from_file(file.path()).expect("Failed to load config file");
    assert_eq!(config.fixtures_root, "custom");
    assert_eq!(config.overwrite_policy(), OverwritePolicy::Warn);
}

#[test]
fn test_from_file_missing_uses_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = EngineConfig::from_file(&dir.path().join("absent.toml"))
        .expect("missing file should fall back to defaults");
    assert_eq!(config.http.timeout_secs, 30);
}

#[test]
fn test_save_round_trip() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("moxter.toml");
    let mut config = EngineConfig::default();
    config.fixtures_root = "saved".to_string();
    config.save(&path).expect("save config");

    let content = std::fs::read_to_string(&path).expect("read saved config");
    let loaded = EngineConfig::from_toml_str(&content).expect("parse saved config");
    assert_eq!(loaded.fixtures_root, "saved");
}
