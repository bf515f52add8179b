use super::settings::Settings;
use super::load_config_from;
use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.feed.publish_timeout(), Duration::from_millis(500));
    assert_eq!(settings.storage.path, "postfeed_db");
    assert_eq!(settings.logging.level, "info");
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.feed.publish_timeout_ms, 500);
}

#[test]
#[serial]
fn test_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        port = 9000

        [feed]
        publish_timeout_ms = 250
    "#;
    fs::write(tmp.path().join("default.toml"), toml).expect("write config file");
    let path = tmp.path().join("default");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.feed.publish_timeout_ms, 250);
    assert_eq!(cfg.storage.path, "postfeed_db");
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    fs::write(tmp.path().join("default.toml"), "[server]\nport = 9000\n")
        .expect("write config file");
    let path = tmp.path().join("default");

    temp_env::with_vars(
        [
            ("POSTFEED_SERVER__PORT", Some("9100")),
            ("POSTFEED_STORAGE__PATH", Some("/tmp/feed")),
            ("POSTFEED_LOGGING__LEVEL", Some("debug")),
        ],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.storage.path, "/tmp/feed");
            assert_eq!(cfg.logging.level, "debug");
        },
    );
}
