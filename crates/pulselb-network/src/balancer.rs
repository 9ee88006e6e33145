//! Round-robin node selection

use pulselb_core::{BalancerError, BalancerResult, NodeRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::registry::NodeRegistry;

/// Selects the node that serves the next forwarded request
///
/// Over any window of `n` consecutive selections against an unchanged set of
/// `n` healthy nodes, each node is returned exactly once. A window that spans
/// a node joining or leaving may skip a node or repeat one immediately.
pub struct Selector {
    registry: Arc<NodeRegistry>,
    /// Counter for round-robin
    counter: AtomicUsize,
}

impl Selector {
    /// Create a selector over the given registry
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            counter: AtomicUsize::new(0),
        }
    }

    /// Pick the next healthy node
    pub async fn next_target(&self) -> BalancerResult<NodeRecord> {
        let mut healthy: Vec<NodeRecord> = self
            .registry
            .snapshot_all()
            .await
            .into_iter()
            .filter(|node| node.healthy)
            .collect();

        if healthy.is_empty() {
            warn!("No healthy nodes available");
            return Err(BalancerError::NoHealthyNodes);
        }

        // fetch_add wraps on overflow, so the cursor never needs a reset
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % healthy.len();

        debug!(
            selected_index = index,
            total_healthy = healthy.len(),
            "Selected node"
        );

        Ok(healthy.swap_remove(index))
    }
}
