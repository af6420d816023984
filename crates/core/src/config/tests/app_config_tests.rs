use std::io::Write;

use crate::config::models::AppConfig;

#[test]
fn test_default_config() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());

    // 验证默认值
    assert_eq!(config.database.url, "sqlite://syncer.db");
    assert_eq!(config.database.max_connections, 5);
    assert_eq!(config.controller.command_buffer, 64);
    assert_eq!(config.api.bind_address, "0.0.0.0:8080");
    assert!(!config.netsuite.enabled);
    assert!(!config.sharepoint.enabled);
    assert_eq!(config.observability.log_format, "pretty");
}

#[test]
fn test_config_from_partial_toml() {
    let toml_content = r#"
[database]
url = "sqlite::memory:"

[api]
bind_address = "127.0.0.1:9090"
"#;

    let config = AppConfig::from_toml(toml_content).unwrap();
    assert_eq!(config.database.url, "sqlite::memory:");
    assert_eq!(config.database.max_connections, 5);
    assert_eq!(config.api.bind_address, "127.0.0.1:9090");
    assert!(config.api.cors_enabled);
    assert_eq!(config.controller.shutdown_timeout_seconds, 30);
}

#[test]
fn test_non_sqlite_url_rejected() {
    let toml_content = r#"
[database]
url = "postgresql://localhost/syncer"
"#;

    let err = AppConfig::from_toml(toml_content).unwrap_err();
    assert!(format!("{err:#}").contains("SQLite"));
}

#[test]
fn test_invalid_log_format_rejected() {
    let mut config = AppConfig::default();
    config.observability.log_format = "xml".to_string();
    assert!(config.validate().is_err());

    config.observability.log_format = "json".to_string();
    config.observability.log_level = "verbose".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_bind_address_rejected() {
    let mut config = AppConfig::default();
    config.api.bind_address = "not-an-address".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_command_buffer_rejected() {
    let mut config = AppConfig::default();
    config.controller.command_buffer = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_enabled_netsuite_requires_endpoints() {
    let mut config = AppConfig::default();
    config.netsuite.enabled = true;
    assert!(config.validate().is_err());

    config.netsuite.token_url = "https://example.com/token".to_string();
    config.netsuite.query_url = "https://example.com/suiteql".to_string();
    config.netsuite.client_id = "client".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_enabled_sharepoint_requires_credentials() {
    let mut config = AppConfig::default();
    config.sharepoint.enabled = true;
    assert!(config.validate().is_err());

    config.sharepoint.token_url =
        "https://login.microsoftonline.com/tenant/oauth2/v2.0/token".to_string();
    config.sharepoint.client_id = "client".to_string();
    assert!(config.validate().is_ok());

    config.sharepoint.request_timeout_seconds = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[controller]
command_buffer = 8

[observability]
log_level = "debug"
log_format = "json"
"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let config = AppConfig::load(Some(&path)).unwrap();
    assert_eq!(config.controller.command_buffer, 8);
    assert_eq!(config.observability.log_level, "debug");
    assert_eq!(config.observability.log_format, "json");
    assert_eq!(config.database.url, "sqlite://syncer.db");
}

#[test]
fn test_load_missing_file_fails() {
    let result = AppConfig::load(Some("/nonexistent/syncer-config.toml"));
    assert!(result.is_err());
}

#[test]
fn test_toml_roundtrip_keeps_values() {
    let mut config = AppConfig::default();
    config.netsuite.request_timeout_seconds = 15;

    let toml_str = config.to_toml().unwrap();
    let parsed = AppConfig::from_toml(&toml_str).unwrap();
    assert_eq!(parsed.netsuite.request_timeout_seconds, 15);
}
