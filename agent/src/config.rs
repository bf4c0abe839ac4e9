//! Agent configuration: server address, identity and timing

use crate::backoff::Backoff;
use crate::chatter::CHAT_PERIOD;
use crate::motion::MOTION_PERIOD;
use crate::session::ConnectTarget;
use shared::DEFAULT_PORT;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("server list is empty")]
    NoServers,
    #[error("invalid port in server address {0:?}")]
    InvalidPort(String),
}

/// A `host[:port]` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    /// Picks the first non-empty entry of a comma-separated server list.
    pub fn first_of(list: &str) -> Result<Self, ConfigError> {
        list.split(',')
            .map(str::trim)
            .find(|entry| !entry.is_empty())
            .ok_or(ConfigError::NoServers)?
            .parse()
    }
}

impl FromStr for ServerAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::NoServers);
        }
        match s.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| ConfigError::InvalidPort(s.to_string()))?;
                Ok(Self {
                    host: host.to_string(),
                    port,
                })
            }
            None => Ok(Self {
                host: s.to_string(),
                port: DEFAULT_PORT,
            }),
        }
    }
}

impl std::fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Periods of the idle drivers and the reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub motion_period: Duration,
    pub chat_period: Duration,
    pub backoff: Backoff,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            motion_period: MOTION_PERIOD,
            chat_period: CHAT_PERIOD,
            backoff: Backoff::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub server: ServerAddress,
    pub identity: String,
    pub auth_mode: String,
    pub timing: Timing,
}

impl AgentConfig {
    pub fn new(server: ServerAddress, identity: impl Into<String>) -> Self {
        Self {
            server,
            identity: identity.into(),
            auth_mode: "offline".to_string(),
            timing: Timing::default(),
        }
    }

    pub fn target(&self) -> ConnectTarget {
        ConnectTarget {
            host: self.server.host.clone(),
            port: self.server.port,
            identity: self.identity.clone(),
            auth_mode: self.auth_mode.clone(),
        }
    }
}
