//! Node record and heartbeat wire types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Message returned with every accepted heartbeat
pub const HEARTBEAT_ACK_MESSAGE: &str = "Heartbeat acknowledged";

/// A registered worker node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Identity supplied by the worker, stable across its heartbeats
    pub identity: String,
    /// Host to route to
    pub host: String,
    /// Port to route to
    pub port: u16,
    /// Whether the node is eligible for selection
    pub healthy: bool,
    /// Balancer receive time of the most recent heartbeat
    pub last_heartbeat_at: DateTime<Utc>,
}

impl NodeRecord {
    /// Create a healthy record stamped with the given receive time
    pub fn new(identity: String, host: String, port: u16, received_at: DateTime<Utc>) -> Self {
        Self {
            identity,
            host,
            port,
            healthy: true,
            last_heartbeat_at: received_at,
        }
    }

    /// Get the base URL for this node
    ///
    /// IPv6 literals are bracketed, e.g. `http://[::1]:9001`.
    pub fn url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// Time elapsed since the last heartbeat, as seen at `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_heartbeat_at
    }

    /// Whether the last heartbeat is older than `timeout` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: std::time::Duration) -> bool {
        match Duration::from_std(timeout) {
            Ok(timeout) => self.age(now) > timeout,
            Err(_) => false,
        }
    }
}

/// Status report posted by a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub service_id: String,
    pub host: String,
    pub port: u16,
    /// Free-form status tag, currently always "UP"; not interpreted
    pub status: String,
    /// Worker clock in epoch milliseconds; advisory only
    pub timestamp: i64,
}

/// Acknowledgment returned to a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub acknowledged: bool,
    pub message: String,
    /// Balancer receive time in epoch milliseconds
    pub timestamp: i64,
}

impl HeartbeatResponse {
    pub fn acknowledged(at: DateTime<Utc>) -> Self {
        Self {
            acknowledged: true,
            message: HEARTBEAT_ACK_MESSAGE.to_string(),
            timestamp: at.timestamp_millis(),
        }
    }
}
