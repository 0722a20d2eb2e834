// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Vigil scanning service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages. Required
//! values are modeled as `Option` so the loader can merge partial sources;
//! the accessor methods surface a missing value as a configuration error
//! naming the environment variable that supplies it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;
use vigil_core::VigilError;

/// Top-level Vigil configuration.
///
/// Loaded from an optional `vigil.toml` with environment variable
/// overrides. All sections default so a fully env-driven deployment needs
/// no file at all.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VigilConfig {
    /// Queue store credentials.
    #[serde(default)]
    pub db: DbConfig,

    /// External virus-scanning daemon address.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Portal serving skylink content.
    #[serde(default)]
    pub portal: PortalConfig,

    /// Blocker service receiving infected verdicts.
    #[serde(default)]
    pub blocker: BlockerConfig,

    /// HTTP ingress settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Background worker timing.
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl VigilConfig {
    /// Checks that every required value is present and well-formed.
    ///
    /// Called once at startup; a failure here is fatal.
    pub fn validate(&self) -> Result<(), VigilError> {
        self.db.connection_string()?;
        self.scanner.addr()?;
        self.portal.url()?;
        self.blocker.url()?;
        Ok(())
    }
}

/// Queue store credentials, supplied via the `SKYNET_DB_*` env vars.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DbConfig {
    /// Store user (`SKYNET_DB_USER`).
    #[serde(default)]
    pub user: Option<String>,

    /// Store password (`SKYNET_DB_PASS`).
    #[serde(default)]
    pub password: Option<String>,

    /// Store host (`SKYNET_DB_HOST`).
    #[serde(default)]
    pub host: Option<String>,

    /// Store port (`SKYNET_DB_PORT`).
    #[serde(default)]
    pub port: Option<u16>,

    /// Database name.
    #[serde(default = "default_db_name")]
    pub name: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            host: None,
            port: None,
            name: default_db_name(),
        }
    }
}

fn default_db_name() -> String {
    "scanner".to_string()
}

impl DbConfig {
    /// Builds the store connection string, percent-encoding credentials.
    pub fn connection_string(&self) -> Result<String, VigilError> {
        let user = require(&self.user, "SKYNET_DB_USER")?;
        let password = require(&self.password, "SKYNET_DB_PASS")?;
        let host = require(&self.host, "SKYNET_DB_HOST")?;
        let port = self
            .port
            .ok_or_else(|| VigilError::Config("missing env var SKYNET_DB_PORT".into()))?;

        let mut url = Url::parse(&format!("postgres://{host}:{port}/{}", self.name))
            .map_err(|e| VigilError::Config(format!("invalid store address: {e}")))?;
        url.set_username(user)
            .map_err(|_| VigilError::Config(format!("invalid store user '{user}'")))?;
        url.set_password(Some(password))
            .map_err(|_| VigilError::Config("invalid store password".into()))?;
        Ok(url.to_string())
    }
}

/// External virus-scanning daemon address, supplied via `SCANNER_IP` and
/// `SCANNER_PORT`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScannerConfig {
    #[serde(default)]
    pub ip: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

impl ScannerConfig {
    /// The daemon's TCP address as `ip:port`.
    pub fn addr(&self) -> Result<String, VigilError> {
        let ip = require(&self.ip, "SCANNER_IP")?;
        let port = self
            .port
            .ok_or_else(|| VigilError::Config("missing env var SCANNER_PORT".into()))?;
        Ok(format!("{ip}:{port}"))
    }
}

/// Portal serving skylink content, supplied via `PORTAL_DOMAIN`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PortalConfig {
    #[serde(default)]
    pub domain: Option<String>,
}

impl PortalConfig {
    /// The portal base URL. A schemeless domain is prefixed with
    /// `https://`; a trailing slash is dropped.
    pub fn url(&self) -> Result<String, VigilError> {
        let domain = require(&self.domain, "PORTAL_DOMAIN")?;
        let with_scheme = if domain.contains("://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        };
        let parsed = Url::parse(&with_scheme)
            .map_err(|e| VigilError::Config(format!("invalid PORTAL_DOMAIN '{domain}': {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| VigilError::Config(format!("PORTAL_DOMAIN '{domain}' has no host")))?;
        let url = match parsed.port() {
            Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
            None => format!("{}://{host}", parsed.scheme()),
        };
        Ok(url)
    }
}

/// Blocker service address, supplied via `BLOCKER_IP` and `BLOCKER_PORT`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BlockerConfig {
    #[serde(default)]
    pub ip: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

impl BlockerConfig {
    /// The blocker base URL (plain HTTP, service-internal).
    pub fn url(&self) -> Result<String, VigilError> {
        let ip = require(&self.ip, "BLOCKER_IP")?;
        let port = self
            .port
            .ok_or_else(|| VigilError::Config("missing env var BLOCKER_PORT".into()))?;
        Ok(format!("http://{ip}:{port}"))
    }
}

/// HTTP ingress settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen port (`PORT`).
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
        }
    }
}

fn default_server_port() -> u16 {
    4000
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (`LOG_LEVEL`): trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Background worker timing.
///
/// Defaults are the production profile. Tests construct this struct
/// directly with millisecond sleeps.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Idle sleep of the scan loop when the queue is empty.
    #[serde(default = "default_sleep_between_scans_ms")]
    pub sleep_between_scans_ms: u64,

    /// Interval between reporter sweeps.
    #[serde(default = "default_sleep_between_reports_ms")]
    pub sleep_between_reports_ms: u64,

    /// How long a claim may stay in `scanning` before the reaper returns
    /// it to `new`. Also the reaper's tick interval.
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sleep_between_scans_ms: default_sleep_between_scans_ms(),
            sleep_between_reports_ms: default_sleep_between_reports_ms(),
            scan_timeout_ms: default_scan_timeout_ms(),
        }
    }
}

impl WorkerConfig {
    pub fn sleep_between_scans(&self) -> Duration {
        Duration::from_millis(self.sleep_between_scans_ms)
    }

    pub fn sleep_between_reports(&self) -> Duration {
        Duration::from_millis(self.sleep_between_reports_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }
}

fn default_sleep_between_scans_ms() -> u64 {
    10_000
}

fn default_sleep_between_reports_ms() -> u64 {
    600_000
}

fn default_scan_timeout_ms() -> u64 {
    3_600_000
}

fn require<'a>(value: &'a Option<String>, env_var: &str) -> Result<&'a str, VigilError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(VigilError::Config(format!("missing env var {env_var}"))),
    }
}
