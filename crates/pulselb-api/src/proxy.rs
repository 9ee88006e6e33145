//! Forwarding handler

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use pulselb_core::BalancerError;
use pulselb_network::{ForwardRequest, ForwardResponse};
use std::sync::Arc;

use crate::rest::AppState;

/// Forward any request to the next node and relay its answer
///
/// The body is buffered under the router's `DefaultBodyLimit`; oversized
/// bodies are refused with 413 before a node is selected.
pub async fn proxy_request(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let forward = ForwardRequest {
        method,
        path_and_query,
        headers,
        body,
    };

    // Failures were already logged where they were detected
    match state.forwarder.forward(forward).await {
        Ok(upstream) => relay(upstream),
        Err(e) => (error_status(&e), e.to_string()).into_response(),
    }
}

fn relay(upstream: ForwardResponse) -> Response {
    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = upstream.headers;
    response
}

/// Status reported to the caller when forwarding fails
pub fn error_status(err: &BalancerError) -> StatusCode {
    match err {
        BalancerError::NoHealthyNodes => StatusCode::SERVICE_UNAVAILABLE,
        BalancerError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
        BalancerError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
