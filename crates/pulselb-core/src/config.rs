//! Configuration types for pulselb

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::BalancerError;

/// Path browsers request on their own; answered locally, never forwarded
pub const FAVICON_PATH: &str = "/favicon.ico";

/// Main balancer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration
    pub server: ServerConfig,
    /// Node liveness configuration
    pub health: HealthConfig,
    /// Outbound forwarding configuration
    pub upstream: UpstreamConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl BalancerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, BalancerError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, BalancerError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the router cannot be built from
    pub fn validate(&self) -> Result<(), BalancerError> {
        let path = &self.server.heartbeat_path;
        if !path.starts_with('/') {
            return Err(BalancerError::Config(format!(
                "server.heartbeat_path must start with '/', got {:?}",
                path
            )));
        }
        if path == FAVICON_PATH {
            return Err(BalancerError::Config(format!(
                "server.heartbeat_path must not be {}",
                FAVICON_PATH
            )));
        }
        if self.server.max_body_bytes == 0 {
            return Err(BalancerError::Config(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the balancer
    pub address: String,
    /// Port for the balancer
    pub port: u16,
    /// Path workers post heartbeats to
    pub heartbeat_path: String,
    /// Largest request body accepted for forwarding
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
            heartbeat_path: "/heartbeat".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Node liveness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Seconds without a heartbeat before a node is evicted
    pub node_timeout_secs: u64,
    /// Seconds between liveness sweeps
    pub monitor_interval_secs: u64,
}

impl HealthConfig {
    pub fn node_timeout(&self) -> Duration {
        Duration::from_secs(self.node_timeout_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            node_timeout_secs: 30,
            monitor_interval_secs: 10,
        }
    }
}

/// Outbound forwarding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Whole-exchange timeout in seconds
    pub request_timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 3,
            request_timeout_secs: 3,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
