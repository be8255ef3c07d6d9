use std::io::Write;
use webtty_config::ConfigLoader;
use webtty_config::schema::*;

// ── Default tests ──────────────────────────────────────────────

#[test]
fn test_server_config_defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.address, "127.0.0.1");
    assert_eq!(config.port, 8080);
    assert_eq!(config.idle_timeout_secs, 600);
    assert!(config.ws_origin.is_empty());
    assert!(config.auth_token.is_none());
    assert!(!config.cors);
}

#[test]
fn test_logging_config_defaults() {
    let config = LoggingConfig::default();
    assert_eq!(config.level, "info");
    assert_eq!(config.format, "pretty");
}

#[test]
fn test_listen_addr_joins_host_and_port() {
    let mut config = ServerConfig::default();
    config.address = "0.0.0.0".into();
    config.port = 9000;
    assert_eq!(config.listen_addr(), "0.0.0.0:9000");
}

// ── TOML roundtrip tests ───────────────────────────────────────

#[test]
fn test_config_toml_roundtrip() {
    let config = WebttyConfig::default();
    let toml_str = toml::to_string_pretty(&config).unwrap();
    let restored: WebttyConfig = toml::from_str(&toml_str).unwrap();
    assert_eq!(restored.server.address, config.server.address);
    assert_eq!(restored.server.port, config.server.port);
    assert_eq!(restored.logging.level, config.logging.level);
}

#[test]
fn test_partial_toml_applies_defaults() {
    let toml_str = r#"
[server]
port = 9090
ws_origin = "https://example\\.com"
"#;
    let config: WebttyConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.ws_origin, "https://example\\.com");
    // Defaults should fill in
    assert_eq!(config.server.address, "127.0.0.1");
    assert_eq!(config.logging.format, "pretty");
}

// ── Validation tests ───────────────────────────────────────────

#[test]
fn test_default_config_validates() {
    let config = WebttyConfig::default();
    let warnings = config.validate().unwrap();
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}

#[test]
fn test_invalid_origin_regex_is_an_error() {
    let mut config = WebttyConfig::default();
    config.server.ws_origin = "([unclosed".into();
    let err = config.validate().unwrap_err();
    assert!(err.contains("server.ws_origin"));
}

#[test]
fn test_empty_address_is_an_error() {
    let mut config = WebttyConfig::default();
    config.server.address = String::new();
    assert!(config.validate().is_err());
}

#[test]
fn test_wildcard_bind_is_only_a_warning() {
    let mut config = WebttyConfig::default();
    config.server.address = "0.0.0.0".into();
    let warnings = config.validate().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "server.address");
}

// ── Loader tests ───────────────────────────────────────────────

#[test]
fn test_loader_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
address = "127.0.0.1"
port = 4444
idle_timeout_secs = 30
"#
    )
    .unwrap();

    let loader = ConfigLoader::load(Some(file.path())).unwrap();
    let config = loader.get();
    assert_eq!(config.server.port, 4444);
    assert_eq!(config.server.idle_timeout_secs, 30);
    assert_eq!(loader.path(), file.path());
    assert!(format!("{loader:?}").contains("4444"));
}

#[test]
fn test_loader_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    let loader = ConfigLoader::load(Some(&path)).unwrap();
    assert_eq!(loader.get().server.port, 8080);
}

#[test]
fn test_env_auth_token_is_a_fallback() {
    // Only this test touches WEBTTY_AUTH_TOKEN; no other test asserts on
    // the token, so the process-global env is safe to poke here.
    unsafe { std::env::set_var("WEBTTY_AUTH_TOKEN", "from-env") };
    let dir = tempfile::tempdir().unwrap();
    let loader = ConfigLoader::load(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(loader.get().server.auth_token.as_deref(), Some("from-env"));
    unsafe { std::env::remove_var("WEBTTY_AUTH_TOKEN") };
}

#[test]
fn test_loader_rejects_invalid_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
ws_origin = "([unclosed"
"#
    )
    .unwrap();

    let err = ConfigLoader::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, webtty_core::WebttyError::Config(_)));
}
