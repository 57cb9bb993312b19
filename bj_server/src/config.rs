//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.
//! Command-line flags win over the environment, which wins over the defaults.

use blackjack::{
    constants::MAX_NAME_LEN,
    discovery::{BROADCAST_ADDR, OFFER_UDP_PORT},
    server::{BlackjackConfig, SHUTDOWN_GRACE},
    utils::IO_TIMEOUT,
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
    time::Duration,
};

pub const DEFAULT_SERVER_NAME: &str = "Blackijecky";

/// Complete server configuration loaded from flags and environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Name advertised in every offer
    pub name: String,
    /// Address the TCP listener binds to
    pub bind_ip: IpAddr,
    /// TCP port, 0 for an ephemeral port
    pub tcp_port: u16,
    /// UDP port offers are broadcast to
    pub discovery_port: u16,
    pub broadcast_addr: Ipv4Addr,
    /// Read and write timeout for gameplay sockets
    pub io_timeout: Duration,
    /// Time in-flight sessions get to finish on shutdown
    pub shutdown_grace: Duration,
    pub deck_seed: Option<u64>,
}

/// Values given on the command line. Anything left `None` falls back to the
/// environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub name: Option<String>,
    pub bind_ip: Option<IpAddr>,
    pub tcp_port: Option<u16>,
    pub discovery_port: Option<u16>,
    pub broadcast_addr: Option<Ipv4Addr>,
    pub io_timeout_secs: Option<u64>,
    pub shutdown_grace_secs: Option<u64>,
    pub deck_seed: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(overrides: Overrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = overrides
            .name
            .or_else(|| lookup("BJ_SERVER_NAME"))
            .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());

        let bind_ip = match overrides.bind_ip {
            Some(ip) => ip,
            None => parse_env_or(&lookup, "BJ_BIND_IP", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
        };
        let tcp_port = match overrides.tcp_port {
            Some(port) => port,
            None => parse_env_or(&lookup, "BJ_TCP_PORT", 0)?,
        };
        let discovery_port = match overrides.discovery_port {
            Some(port) => port,
            None => parse_env_or(&lookup, "BJ_DISCOVERY_PORT", OFFER_UDP_PORT)?,
        };
        let broadcast_addr = match overrides.broadcast_addr {
            Some(addr) => addr,
            None => parse_env_or(&lookup, "BJ_BROADCAST_ADDR", BROADCAST_ADDR)?,
        };
        let io_timeout_secs = match overrides.io_timeout_secs {
            Some(secs) => secs,
            None => parse_env_or(&lookup, "BJ_IO_TIMEOUT_SECS", IO_TIMEOUT.as_secs())?,
        };
        let shutdown_grace_secs = match overrides.shutdown_grace_secs {
            Some(secs) => secs,
            None => parse_env_or(
                &lookup,
                "BJ_SHUTDOWN_GRACE_SECS",
                SHUTDOWN_GRACE.as_secs(),
            )?,
        };
        let deck_seed = match overrides.deck_seed {
            Some(seed) => Some(seed),
            None => lookup("BJ_DECK_SEED")
                .map(|raw| parse_var("BJ_DECK_SEED", &raw))
                .transpose()?,
        };

        Ok(ServerConfig {
            name,
            bind_ip,
            tcp_port,
            discovery_port,
            broadcast_addr,
            io_timeout: Duration::from_secs(io_timeout_secs),
            shutdown_grace: Duration::from_secs(shutdown_grace_secs),
            deck_seed,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() || self.name.len() > MAX_NAME_LEN {
            return Err(ConfigError::Invalid {
                var: "BJ_SERVER_NAME".to_string(),
                reason: format!("Must be 1-{MAX_NAME_LEN} bytes, got {}", self.name.len()),
            });
        }

        if self.io_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "BJ_IO_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.discovery_port == 0 {
            return Err(ConfigError::Invalid {
                var: "BJ_DISCOVERY_PORT".to_string(),
                reason: "Clients listen on a fixed port, 0 is not one".to_string(),
            });
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.tcp_port)
    }

    /// Where offers are sent.
    pub fn broadcast_target(&self) -> SocketAddr {
        SocketAddr::from((self.broadcast_addr, self.discovery_port))
    }

    /// The part of the configuration the session workers see.
    pub fn blackjack_config(&self) -> BlackjackConfig {
        BlackjackConfig {
            io_timeout: self.io_timeout,
            shutdown_grace: self.shutdown_grace,
            deck_seed: self.deck_seed,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("Cannot parse '{raw}'"),
    })
}

/// Helper to parse an environment variable with default fallback. A set but
/// malformed variable is an error rather than silently ignored.
fn parse_env_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_var(key, &raw),
        None => Ok(default),
    }
}
