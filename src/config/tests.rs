use super::load_config;
use super::settings::Settings;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.bridge.host, "localhost");
    assert_eq!(settings.bridge.port, 9090);
    assert_eq!(settings.bridge.url(), "ws://localhost:9090");
    assert_eq!(settings.bridge.connect_timeout_ms, 5000);
    assert!(settings.logging.enabled);
    assert_eq!(settings.logging.level, "info");
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    // Run from a temp dir so load_config picks up config/default.toml from there.
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [bridge]
        host = "robot.local"
        port = 9091
        reconnect_delay_ms = 0

        [logging]
        enabled = false
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let cfg = load_config();
    env::set_current_dir(orig).expect("restore cwd");

    let cfg = cfg.expect("load_config failed");
    assert_eq!(cfg.bridge.url(), "ws://robot.local:9091");
    assert_eq!(cfg.bridge.reconnect_delay_ms, 0);
    // untouched fields keep their defaults
    assert_eq!(cfg.bridge.connect_timeout_ms, 5000);
    assert!(!cfg.logging.enabled);
    assert_eq!(cfg.logging.level, "info");
}

#[test]
#[serial]
fn load_config_reads_prefixed_environment() {
    temp_env::with_vars(
        [
            ("ROSBRIDGE__BRIDGE__PORT", Some("9555")),
            ("ROSBRIDGE__BRIDGE__CONNECT_TIMEOUT_MS", Some("250")),
            ("ROSBRIDGE__LOGGING__LEVEL", Some("debug")),
        ],
        || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.bridge.port, 9555);
            assert_eq!(cfg.bridge.connect_timeout_ms, 250);
            assert_eq!(cfg.logging.level, "debug");
        },
    );
}
