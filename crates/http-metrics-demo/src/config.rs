//! Demo service configuration.
//!
//! Configuration is loaded from environment variables. Every setting has a
//! default, so an empty environment starts a working service.

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8022";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, for local development.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

/// Demo service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8022").
    pub bind_address: SocketAddr,

    /// Record the `Host` of inbound requests as a label.
    pub metrics_track_host: bool,

    /// Record the protocol of inbound requests as a label.
    pub metrics_track_protocol: bool,

    /// Record the destination host of outbound calls as a label.
    pub transport_track_host: bool,

    /// Generate inbound and outbound traffic in the background.
    pub simulate_traffic: bool,

    pub log_format: LogFormat,

    /// Seconds to wait after a shutdown signal before exiting (default: 0).
    pub drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid boolean: {0}")]
    InvalidBool(String),

    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),

    #[error("Invalid drain period: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_str = vars
            .get("BIND_ADDRESS")
            .map(String::as_str)
            .unwrap_or(DEFAULT_BIND_ADDRESS);
        let bind_address: SocketAddr = bind_str.parse().map_err(|e| {
            ConfigError::InvalidBindAddress(format!(
                "BIND_ADDRESS must be host:port, got '{}': {}",
                bind_str, e
            ))
        })?;

        let log_format = match vars.get("LOG_FORMAT").map(|s| s.to_ascii_lowercase()) {
            None => LogFormat::default(),
            Some(value) if value == "pretty" => LogFormat::Pretty,
            Some(value) if value == "json" => LogFormat::Json,
            Some(value) => {
                return Err(ConfigError::InvalidLogFormat(format!(
                    "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                    value
                )))
            }
        };

        let drain_seconds = match vars.get("DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "DRAIN_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => 0,
        };

        Ok(Self {
            bind_address,
            metrics_track_host: parse_bool(vars, "METRICS_TRACK_HOST", false)?,
            metrics_track_protocol: parse_bool(vars, "METRICS_TRACK_PROTOCOL", true)?,
            transport_track_host: parse_bool(vars, "TRANSPORT_TRACK_HOST", true)?,
            simulate_traffic: parse_bool(vars, "SIMULATE_TRAFFIC", true)?,
            log_format,
            drain_seconds,
        })
    }
}

fn parse_bool(
    vars: &HashMap<String, String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(value) = vars.get(key) else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}
