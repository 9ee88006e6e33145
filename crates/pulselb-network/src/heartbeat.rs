//! Heartbeat intake

use chrono::{DateTime, Utc};
use pulselb_core::{HeartbeatRequest, HeartbeatResponse, NodeRecord};
use std::sync::Arc;
use tracing::{debug, info};

use crate::registry::NodeRegistry;

/// Turns worker status reports into registry records
pub struct HeartbeatHandler {
    registry: Arc<NodeRegistry>,
}

impl HeartbeatHandler {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self { registry }
    }

    /// Record a heartbeat received now
    pub async fn handle(&self, request: HeartbeatRequest) -> HeartbeatResponse {
        self.handle_at(request, Utc::now()).await
    }

    /// Record a heartbeat received at `received_at`
    ///
    /// The receive time, not the worker's timestamp, becomes the node's
    /// last-heartbeat time. The status tag is accepted as-is.
    pub async fn handle_at(
        &self,
        request: HeartbeatRequest,
        received_at: DateTime<Utc>,
    ) -> HeartbeatResponse {
        debug!(
            service_id = %request.service_id,
            status = %request.status,
            clock_skew_ms = received_at.timestamp_millis().saturating_sub(request.timestamp),
            "Heartbeat payload"
        );

        let node = NodeRecord::new(request.service_id, request.host, request.port, received_at);

        info!(
            service_id = %node.identity,
            endpoint = %node.url(),
            "Received heartbeat"
        );

        self.registry.upsert(node).await;

        HeartbeatResponse::acknowledged(received_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn heartbeat(service_id: &str, host: &str, port: u16) -> HeartbeatRequest {
        HeartbeatRequest {
            service_id: service_id.to_string(),
            host: host.to_string(),
            port,
            status: "UP".to_string(),
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_heartbeat_registers_node() {
        let registry = Arc::new(NodeRegistry::new());
        let handler = HeartbeatHandler::new(registry.clone());
        let received_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let response = handler
            .handle_at(heartbeat("node-a", "10.0.0.1", 9001), received_at)
            .await;

        assert!(response.acknowledged);
        assert_eq!(response.message, "Heartbeat acknowledged");
        assert_eq!(response.timestamp, received_at.timestamp_millis());

        let node = registry.get("node-a").await.unwrap();
        assert!(node.healthy);
        assert_eq!(node.host, "10.0.0.1");
        assert_eq!(node.port, 9001);
        // Receive time wins over the worker-supplied timestamp
        assert_eq!(node.last_heartbeat_at, received_at);
    }

    #[tokio::test]
    async fn test_repeat_heartbeat_replaces_location() {
        let registry = Arc::new(NodeRegistry::new());
        let handler = HeartbeatHandler::new(registry.clone());

        handler.handle(heartbeat("node-a", "10.0.0.1", 9001)).await;
        handler.handle(heartbeat("node-a", "10.0.0.9", 9009)).await;

        let nodes = registry.snapshot_all().await;
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].host, "10.0.0.9");
        assert_eq!(nodes[0].port, 9009);
    }

    #[tokio::test]
    async fn test_any_status_is_accepted() {
        let registry = Arc::new(NodeRegistry::new());
        let handler = HeartbeatHandler::new(registry.clone());

        let mut request = heartbeat("node-a", "10.0.0.1", 9001);
        request.status = "DOWN".to_string();
        let response = handler.handle(request).await;

        assert!(response.acknowledged);
        assert!(registry.get("node-a").await.unwrap().healthy);
    }

    #[tokio::test]
    async fn test_distinct_heartbeats_register_each_node() {
        let registry = Arc::new(NodeRegistry::new());
        let handler = HeartbeatHandler::new(registry.clone());

        for i in 0..10u16 {
            handler
                .handle(heartbeat(&format!("node-{}", i), "10.0.0.1", 9000 + i))
                .await;
        }

        assert_eq!(registry.snapshot_all().await.len(), 10);
    }

    #[tokio::test]
    async fn test_extreme_timestamps_under_debug_logging() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let registry = Arc::new(NodeRegistry::new());
        let handler = HeartbeatHandler::new(registry.clone());

        for (i, timestamp) in [i64::MIN, i64::MAX].into_iter().enumerate() {
            let mut request = heartbeat(&format!("node-{}", i), "10.0.0.1", 9001);
            request.timestamp = timestamp;
            let response = handler.handle(request).await;
            assert!(response.acknowledged);
        }

        assert_eq!(registry.len().await, 2);
    }
}
