//! Forwarding of inbound requests to selected nodes

use hyper::body::Bytes;
use hyper::header::{self, HeaderMap, HeaderName};
use hyper::{Method, StatusCode};
use pulselb_core::{BalancerError, BalancerResult, UpstreamConfig};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::balancer::Selector;

/// Headers that describe a single connection and are never relayed
const HOP_BY_HOP_HEADERS: [HeaderName; 5] = [
    header::CONNECTION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// An inbound request, reduced to what is relayed upstream
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    /// Path and query string exactly as received, e.g. `/api/items?page=2`
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// An upstream response, relayed back unchanged
#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Relays requests to the node chosen by the selector
pub struct Forwarder {
    selector: Arc<Selector>,
    client: reqwest::Client,
}

impl Forwarder {
    /// Create a forwarder with the configured outbound timeouts
    pub fn new(selector: Arc<Selector>, config: &UpstreamConfig) -> BalancerResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| BalancerError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { selector, client })
    }

    /// Forward one request to the next node
    ///
    /// There is no retry: a failed exchange with the chosen node fails the
    /// request even when other nodes are healthy.
    pub async fn forward(&self, request: ForwardRequest) -> BalancerResult<ForwardResponse> {
        let target = self.selector.next_target().await?;
        let url = format!("{}{}", target.url(), request.path_and_query);

        info!(method = %request.method, url = %url, node = %target.identity, "Forwarding request");

        let response = self
            .client
            .request(request.method, &url)
            .headers(strip_hop_by_hop(request.headers, true))
            .body(request.body)
            .send()
            .await
            .map_err(|e| upstream_error(&url, e))?;

        let status = response.status();
        let headers = strip_hop_by_hop(response.headers().clone(), false);
        let body = response.bytes().await.map_err(|e| upstream_error(&url, e))?;

        if status == StatusCode::NOT_FOUND {
            warn!(url = %url, "Resource not found upstream");
        }

        Ok(ForwardResponse {
            status,
            headers,
            body,
        })
    }
}

/// Drop connection-scoped headers
///
/// Besides the fixed list, any header named in a `Connection` value is
/// connection-scoped too. Requests sent upstream also lose `host` and
/// `content-length`, which the client derives from the target URL and the body.
fn strip_hop_by_hop(mut headers: HeaderMap, upstream_request: bool) -> HeaderMap {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
    if upstream_request {
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);
    }
    headers
}

fn upstream_error(url: &str, err: reqwest::Error) -> BalancerError {
    error!(url = %url, error = %err, "Error forwarding request");

    if err.is_timeout() {
        BalancerError::UpstreamTimeout {
            url: url.to_string(),
        }
    } else {
        BalancerError::UpstreamUnreachable {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}
