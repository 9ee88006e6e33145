//! Router and heartbeat handler

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Json,
    routing::{any, post},
    Router,
};
use pulselb_core::{
    BalancerConfig, BalancerResult, HeartbeatRequest, HeartbeatResponse, FAVICON_PATH,
};
use pulselb_network::{Forwarder, HeartbeatHandler, NodeRegistry, Selector};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::proxy::proxy_request;

/// Application state shared across handlers
pub struct AppState {
    pub registry: Arc<NodeRegistry>,
    pub heartbeat: HeartbeatHandler,
    pub forwarder: Forwarder,
    heartbeat_path: String,
    max_body_bytes: usize,
}

impl AppState {
    /// Wire the heartbeat handler and forwarder to a shared registry
    pub fn new(registry: Arc<NodeRegistry>, config: &BalancerConfig) -> BalancerResult<Self> {
        config.validate()?;
        let selector = Arc::new(Selector::new(registry.clone()));
        let forwarder = Forwarder::new(selector, &config.upstream)?;

        Ok(Self {
            heartbeat: HeartbeatHandler::new(registry.clone()),
            registry,
            forwarder,
            heartbeat_path: config.server.heartbeat_path.clone(),
            max_body_bytes: config.server.max_body_bytes,
        })
    }
}

/// Create the balancer router
///
/// Every request that is neither a heartbeat nor the favicon probe is
/// forwarded to a node. Bodies larger than `server.max_body_bytes` are
/// refused with 413.
pub fn create_router(state: Arc<AppState>) -> Router {
    let heartbeat_path = state.heartbeat_path.clone();

    Router::new()
        .route(&heartbeat_path, post(handle_heartbeat))
        .route(FAVICON_PATH, any(favicon))
        .fallback(proxy_request)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Accept a worker heartbeat
async fn handle_heartbeat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HeartbeatRequest>,
) -> Json<HeartbeatResponse> {
    Json(state.heartbeat.handle(req).await)
}

/// Browsers probe this on every page load; never worth a node
async fn favicon() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    fn state() -> Arc<AppState> {
        let registry = Arc::new(NodeRegistry::new());
        Arc::new(AppState::new(registry, &BalancerConfig::default()).unwrap())
    }

    fn heartbeat_body(service_id: &str, port: u16) -> Body {
        Body::from(
            serde_json::json!({
                "serviceId": service_id,
                "host": "10.0.0.1",
                "port": port,
                "status": "UP",
                "timestamp": 1_700_000_000_000i64,
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_router() {
        let router = create_router(state());

        // Only POST is routed to the heartbeat handler
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/heartbeat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/heartbeat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[test]
    fn test_unroutable_heartbeat_path_rejected() {
        for path in ["heartbeat", "", FAVICON_PATH] {
            let mut config = BalancerConfig::default();
            config.server.heartbeat_path = path.to_string();
            let result = AppState::new(Arc::new(NodeRegistry::new()), &config);
            assert!(
                matches!(result, Err(pulselb_core::BalancerError::Config(_))),
                "accepted {:?}",
                path
            );
        }
    }

    #[tokio::test]
    async fn test_heartbeat_endpoint() {
        let state = state();
        let router = create_router(state.clone());

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/heartbeat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(heartbeat_body("node-a", 9001))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let ack: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(ack["acknowledged"], true);
        assert_eq!(ack["message"], "Heartbeat acknowledged");
        assert!(ack["timestamp"].as_i64().unwrap() > 0);

        let node = state.registry.get("node-a").await.unwrap();
        assert_eq!(node.host, "10.0.0.1");
        assert_eq!(node.port, 9001);
    }

    #[tokio::test]
    async fn test_custom_heartbeat_path() {
        let mut config = BalancerConfig::default();
        config.server.heartbeat_path = "/_pulse".to_string();
        let registry = Arc::new(NodeRegistry::new());
        let state = Arc::new(AppState::new(registry.clone(), &config).unwrap());

        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/_pulse")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(heartbeat_body("node-b", 9002))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_favicon_bypasses_selection() {
        // No nodes registered: a forwarded request would be a 5xx
        for method in [Method::GET, Method::POST] {
            let response = create_router(state())
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/favicon.ico")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_no_healthy_nodes_is_server_error() {
        let response = create_router(state())
            .oneshot(
                Request::builder()
                    .uri("/api/demo")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_server_error());
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
