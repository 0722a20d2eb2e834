// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Vigil configuration system.

use vigil_config::model::VigilConfig;
use vigil_config::{load_config, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_vigil_config() {
    let toml = r#"
[db]
user = "scanner"
password = "hunter2"
host = "db.internal"
port = 27017
name = "scanner"

[scanner]
ip = "10.0.0.5"
port = 3310

[portal]
domain = "siasky.net"

[blocker]
ip = "10.0.0.6"
port = 4001

[server]
port = 4000

[log]
level = "debug"

[worker]
sleep_between_scans_ms = 100
sleep_between_reports_ms = 100
scan_timeout_ms = 60_000
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.db.user.as_deref(), Some("scanner"));
    assert_eq!(config.db.port, Some(27017));
    assert_eq!(config.scanner.ip.as_deref(), Some("10.0.0.5"));
    assert_eq!(config.portal.domain.as_deref(), Some("siasky.net"));
    assert_eq!(config.blocker.port, Some(4001));
    assert_eq!(config.server.port, 4000);
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.worker.sleep_between_scans_ms, 100);
    assert_eq!(config.worker.scan_timeout_ms, 60_000);
    config.validate().expect("complete config should validate");
}

/// Missing sections use defaults without error (validation fails later).
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert!(config.db.user.is_none());
    assert_eq!(config.db.name, "scanner");
    assert!(config.scanner.ip.is_none());
    assert!(config.portal.domain.is_none());
    assert_eq!(config.server.port, 4000);
    assert_eq!(config.log.level, "info");
    assert_eq!(config.worker.sleep_between_scans_ms, 10_000);
    assert_eq!(config.worker.sleep_between_reports_ms, 600_000);
    assert_eq!(config.worker.scan_timeout_ms, 3_600_000);
}

/// Unknown fields are rejected with an actionable error.
#[test]
fn unknown_field_produces_error() {
    let toml = r#"
[db]
usre = "typo"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("usre"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Validation names the missing environment variable.
#[test]
fn validation_names_missing_env_var() {
    let config = VigilConfig::default();
    let err = config.validate().expect_err("empty config must not validate");
    assert!(
        err.to_string().contains("SKYNET_DB_USER"),
        "expected the missing var name, got: {err}"
    );
}

/// The deployment env vars land in their config sections.
#[test]
fn env_vars_override_config_sections() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("SKYNET_DB_USER", "scanner");
        jail.set_env("SKYNET_DB_PASS", "s3cret");
        jail.set_env("SKYNET_DB_HOST", "db.internal");
        jail.set_env("SKYNET_DB_PORT", "5432");
        jail.set_env("SCANNER_IP", "10.0.0.5");
        jail.set_env("SCANNER_PORT", "3310");
        jail.set_env("PORTAL_DOMAIN", "siasky.net");
        jail.set_env("BLOCKER_IP", "10.0.0.6");
        jail.set_env("BLOCKER_PORT", "4001");
        jail.set_env("LOG_LEVEL", "trace");
        jail.set_env("PORT", "4100");

        let config = load_config().expect("env-only config should load");
        assert_eq!(config.db.user.as_deref(), Some("scanner"));
        assert_eq!(config.db.password.as_deref(), Some("s3cret"));
        assert_eq!(config.db.host.as_deref(), Some("db.internal"));
        assert_eq!(config.db.port, Some(5432));
        assert_eq!(config.scanner.ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.scanner.port, Some(3310));
        assert_eq!(config.portal.domain.as_deref(), Some("siasky.net"));
        assert_eq!(config.blocker.ip.as_deref(), Some("10.0.0.6"));
        assert_eq!(config.blocker.port, Some(4001));
        assert_eq!(config.log.level, "trace");
        assert_eq!(config.server.port, 4100);
        config.validate().expect("env-supplied config should validate");
        Ok(())
    });
}

/// A schemeless portal domain gets an https scheme; explicit schemes and
/// ports survive.
#[test]
fn portal_url_defaults_to_https() {
    let mut config = VigilConfig::default();

    config.portal.domain = Some("siasky.net".into());
    assert_eq!(config.portal.url().unwrap(), "https://siasky.net");

    config.portal.domain = Some("http://localhost:9980".into());
    assert_eq!(config.portal.url().unwrap(), "http://localhost:9980");
}

/// The store connection string percent-encodes awkward credentials.
#[test]
fn connection_string_encodes_credentials() {
    let mut config = VigilConfig::default();
    config.db.user = Some("scan ner".into());
    config.db.password = Some("p@ss/word".into());
    config.db.host = Some("db.internal".into());
    config.db.port = Some(5432);

    let conn = config.db.connection_string().unwrap();
    assert!(conn.starts_with("postgres://"));
    assert!(conn.contains("scan%20ner"));
    assert!(!conn.contains("p@ss/word"), "raw password must not appear: {conn}");
    assert!(conn.ends_with("/scanner"));
}

/// Blocker and scanner addresses assemble from their parts.
#[test]
fn collaborator_addresses_assemble() {
    let mut config = VigilConfig::default();
    config.scanner.ip = Some("10.0.0.5".into());
    config.scanner.port = Some(3310);
    config.blocker.ip = Some("10.0.0.6".into());
    config.blocker.port = Some(4001);

    assert_eq!(config.scanner.addr().unwrap(), "10.0.0.5:3310");
    assert_eq!(config.blocker.url().unwrap(), "http://10.0.0.6:4001");
}
