//! Environment configuration
//!
//! Read once at startup. Missing or malformed values fail fast with the
//! name of the offending variable.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;
use types::ids::{RoutingNumber, TransactionId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Key used to verify bearer tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthKey {
    /// HS256 shared secret
    Secret(String),
    /// RS256 public key, PEM file
    PublicKeyPath(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub local_routing: RoutingNumber,
    pub port: u16,
    pub poll_interval: Duration,
    pub cache_size: usize,
    pub cache_expiry: Duration,
    pub history_limit: usize,
    pub dedup_window: Duration,
    pub balances_api_addr: Option<String>,
    pub auth_key: AuthKey,
    pub extra_latency: Option<Duration>,
    pub start_after: Option<TransactionId>,
    pub version: String,
    pub log_level: Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let routing = get("LOCAL_ROUTING_NUM").ok_or(ConfigError::Missing("LOCAL_ROUTING_NUM"))?;
        let local_routing = RoutingNumber::new(routing.trim());
        if !local_routing.is_well_formed() {
            return Err(ConfigError::Invalid {
                var: "LOCAL_ROUTING_NUM",
                value: routing,
                reason: format!("expected {} digits", RoutingNumber::LEN),
            });
        }

        let auth_key = match (get("JWT_SECRET"), get("PUB_KEY_PATH")) {
            (Some(secret), _) => AuthKey::Secret(secret),
            (None, Some(path)) => AuthKey::PublicKeyPath(PathBuf::from(path)),
            (None, None) => return Err(ConfigError::Missing("JWT_SECRET or PUB_KEY_PATH")),
        };

        let log_level = match get("LOG_LEVEL") {
            Some(level) => Level::from_str(level.trim()).map_err(|e| ConfigError::Invalid {
                var: "LOG_LEVEL",
                value: level.clone(),
                reason: e.to_string(),
            })?,
            None => Level::INFO,
        };

        Ok(Self {
            local_routing,
            port: parse_or(&get, "PORT", 8080)?,
            poll_interval: Duration::from_millis(parse_or(&get, "POLL_MS", 100)?),
            cache_size: positive(parse_or(&get, "CACHE_SIZE", 1_000_000)?, "CACHE_SIZE")?,
            cache_expiry: minutes(parse_or(&get, "CACHE_MINUTES", 60)?, "CACHE_MINUTES")?,
            history_limit: positive(parse_or(&get, "HISTORY_LIMIT", 100)?, "HISTORY_LIMIT")?,
            dedup_window: minutes(parse_or(&get, "DEDUP_MINUTES", 60)?, "DEDUP_MINUTES")?,
            balances_api_addr: get("BALANCES_API_ADDR"),
            auth_key,
            extra_latency: parse_opt::<u64, _>(&get, "EXTRA_LATENCY_MILLIS")?.map(Duration::from_millis),
            start_after: parse_opt::<i64, _>(&get, "LEDGER_START_AFTER")?.map(TransactionId::new),
            version: get("VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            log_level,
        })
    }
}

fn parse_opt<T, G>(get: &G, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => Err(ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        },
        None => Ok(None),
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(get, var)?.unwrap_or(default))
}

fn positive(value: usize, var: &'static str) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn minutes(value: u64, var: &'static str) -> Result<Duration, ConfigError> {
    value
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "too many minutes".to_string(),
        })
}
