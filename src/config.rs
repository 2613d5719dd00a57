// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup; an unusable value stops the process before it binds.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` (`API_PORT`) | Server bind port | `8080` |
//! | `DATA_DIR` | Directory of the account database | `./data` |
//! | `JWKS_URL` | Signing key set endpoint | Google certs |
//! | `TOKEN_ISSUERS` | Comma-separated accepted issuers | Google issuers |
//! | `CLIENT_IDS` (`WEB_CLIENT_ID`) | Comma-separated accepted audiences | none |
//! | `CHECK_NOT_BEFORE` | Enforce the `nbf` claim | `false` |
//! | `KEY_FETCH_TIMEOUT_SECS` | Key set request timeout | `10` |
//! | `PERSISTENCE_TIMEOUT_SECS` | Account reconciliation timeout | `5` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::authenticator::DEFAULT_PERSISTENCE_TIMEOUT;
use crate::auth::claims::{ValidationPolicy, GOOGLE_ISSUERS};
use crate::auth::jwks::{DEFAULT_FETCH_TIMEOUT, GOOGLE_JWKS_URL};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
/// Older name for [`PORT_ENV`], read when `PORT` is unset.
pub const API_PORT_ENV: &str = "API_PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const JWKS_URL_ENV: &str = "JWKS_URL";
pub const TOKEN_ISSUERS_ENV: &str = "TOKEN_ISSUERS";
pub const CLIENT_IDS_ENV: &str = "CLIENT_IDS";
/// Single web client ID, appended to [`CLIENT_IDS_ENV`].
pub const WEB_CLIENT_ID_ENV: &str = "WEB_CLIENT_ID";
pub const CHECK_NOT_BEFORE_ENV: &str = "CHECK_NOT_BEFORE";
pub const KEY_FETCH_TIMEOUT_ENV: &str = "KEY_FETCH_TIMEOUT_SECS";
pub const PERSISTENCE_TIMEOUT_ENV: &str = "PERSISTENCE_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// File name of the account database inside the data directory.
pub const DATABASE_FILE: &str = "accounts.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwks_url: String,
    pub issuers: Vec<String>,
    pub client_ids: Vec<String>,
    pub check_not_before: bool,
    pub key_fetch_timeout: Duration,
    pub persistence_timeout: Duration,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = match var(HOST_ENV) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(HOST_ENV, &raw, e))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port_var = var(PORT_ENV)
            .map(|raw| (PORT_ENV, raw))
            .or_else(|| var(API_PORT_ENV).map(|raw| (API_PORT_ENV, raw)));
        let port = match port_var {
            Some((name, raw)) => raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(name, &raw, e))?,
            None => DEFAULT_PORT,
        };

        let mut client_ids = var(CLIENT_IDS_ENV)
            .map(|raw| split_list(&raw))
            .unwrap_or_default();
        if let Some(web) = var(WEB_CLIENT_ID_ENV) {
            let web = web.trim().to_string();
            if !client_ids.contains(&web) {
                client_ids.push(web);
            }
        }

        let log_format = match var(LOG_FORMAT_ENV) {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::invalid(
                        LOG_FORMAT_ENV,
                        &raw,
                        "expected json or pretty",
                    ))
                }
            },
            None => LogFormat::default(),
        };

        let jwks_url = match var(JWKS_URL_ENV) {
            Some(raw) => parse_jwks_url(&raw)?,
            None => GOOGLE_JWKS_URL.to_string(),
        };

        Ok(Self {
            host,
            port,
            data_dir: var(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            jwks_url,
            issuers: var(TOKEN_ISSUERS_ENV)
                .map(|raw| split_list(&raw))
                .unwrap_or_else(|| GOOGLE_ISSUERS.iter().map(|iss| iss.to_string()).collect()),
            client_ids,
            check_not_before: match var(CHECK_NOT_BEFORE_ENV) {
                Some(raw) => parse_flag(CHECK_NOT_BEFORE_ENV, &raw)?,
                None => false,
            },
            key_fetch_timeout: parse_secs(
                KEY_FETCH_TIMEOUT_ENV,
                var(KEY_FETCH_TIMEOUT_ENV),
                DEFAULT_FETCH_TIMEOUT,
            )?,
            persistence_timeout: parse_secs(
                PERSISTENCE_TIMEOUT_ENV,
                var(PERSISTENCE_TIMEOUT_ENV),
                DEFAULT_PERSISTENCE_TIMEOUT,
            )?,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// Claim policy for tokens accepted by this server. Expiry is always
    /// checked.
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy::google(self.client_ids.iter().cloned())
            .with_issuers(self.issuers.iter().cloned())
            .with_not_before(self.check_not_before)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_jwks_url(raw: &str) -> Result<String, ConfigError> {
    let url =
        url::Url::parse(raw.trim()).map_err(|e| ConfigError::invalid(JWKS_URL_ENV, raw, e))?;
    match url.scheme() {
        "https" | "http" => Ok(url.to_string()),
        other => Err(ConfigError::invalid(
            JWKS_URL_ENV,
            raw,
            format!("unsupported scheme {other}"),
        )),
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(name, raw, "expected a boolean")),
    }
}

fn parse_secs(
    name: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let secs = match raw {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::invalid(name, &raw, e))?,
        None => return Ok(default),
    };
    if secs == 0 {
        return Err(ConfigError::invalid(name, "0", "must be at least one second"));
    }
    Ok(Duration::from_secs(secs))
}
