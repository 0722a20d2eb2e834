// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order: compiled defaults < `./vigil.toml` < environment
//! variables. The environment layer is restricted to the exact variable
//! names of the deployment contract (`SKYNET_DB_*`, `SCANNER_*`,
//! `PORTAL_DOMAIN`, `BLOCKER_*`, `LOG_LEVEL`, `PORT`) and mapped onto the
//! matching config sections.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::VigilConfig;

/// Load configuration from `./vigil.toml` (if present) with env var
/// overrides on top of compiled defaults.
pub fn load_config() -> Result<VigilConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VigilConfig::default()))
        .merge(Toml::file("vigil.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<VigilConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VigilConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Create the environment variable provider.
///
/// Uses `only()` so unrelated environment noise never reaches the models
/// (they all carry `deny_unknown_fields`), and an explicit `map()` because
/// the deployment variable names predate the config sections and do not
/// follow a common prefix.
fn env_provider() -> Env {
    Env::raw()
        .only(&[
            "SKYNET_DB_USER",
            "SKYNET_DB_PASS",
            "SKYNET_DB_HOST",
            "SKYNET_DB_PORT",
            "SCANNER_IP",
            "SCANNER_PORT",
            "PORTAL_DOMAIN",
            "BLOCKER_IP",
            "BLOCKER_PORT",
            "LOG_LEVEL",
            "PORT",
        ])
        .map(|key| {
            let lower = key.as_str().to_ascii_lowercase();
            match lower.as_str() {
                "skynet_db_user" => "db.user".into(),
                "skynet_db_pass" => "db.password".into(),
                "skynet_db_host" => "db.host".into(),
                "skynet_db_port" => "db.port".into(),
                "scanner_ip" => "scanner.ip".into(),
                "scanner_port" => "scanner.port".into(),
                "portal_domain" => "portal.domain".into(),
                "blocker_ip" => "blocker.ip".into(),
                "blocker_port" => "blocker.port".into(),
                "log_level" => "log.level".into(),
                "port" => "server.port".into(),
                _ => lower.into(),
            }
        })
}
