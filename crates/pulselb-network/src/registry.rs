//! Registry of live worker nodes

use chrono::{DateTime, Utc};
use pulselb_core::NodeRecord;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct RegistryState {
    /// Records indexed by identity
    nodes: HashMap<String, NodeRecord>,
    /// Identities in first-registration order
    order: Vec<String>,
}

/// Node registry shared by the heartbeat handler, liveness monitor and selector
///
/// Every mutation happens under a single write lock, so readers never see a
/// half-written record. Snapshots are returned in first-registration order,
/// which stays fixed while the node set is unchanged: a re-heartbeat keeps a
/// node's position, and only eviction removes it.
pub struct NodeRegistry {
    state: RwLock<RegistryState>,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Insert a record, or fully replace the record with the same identity
    pub async fn upsert(&self, record: NodeRecord) {
        let mut state = self.state.write().await;
        let identity = record.identity.clone();

        if state.nodes.insert(identity.clone(), record).is_none() {
            state.order.push(identity.clone());
            debug!(identity = %identity, "Node registered");
        } else {
            debug!(identity = %identity, "Node record replaced");
        }
    }

    /// Remove a record; absent identities are ignored
    pub async fn remove(&self, identity: &str) -> Option<NodeRecord> {
        let mut state = self.state.write().await;
        Self::remove_locked(&mut state, identity)
    }

    /// Remove a record only if it is still stale at `now`
    ///
    /// Staleness is judged against the record currently stored, so a
    /// heartbeat that replaced the record after a caller took its snapshot
    /// keeps the node alive.
    pub async fn remove_if_stale(
        &self,
        identity: &str,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Option<NodeRecord> {
        let mut state = self.state.write().await;
        let stale = state
            .nodes
            .get(identity)
            .map_or(false, |record| record.is_stale(now, timeout));
        if !stale {
            return None;
        }
        Self::remove_locked(&mut state, identity)
    }

    fn remove_locked(state: &mut RegistryState, identity: &str) -> Option<NodeRecord> {
        let removed = state.nodes.remove(identity)?;
        state.order.retain(|id| id != identity);
        debug!(identity = %identity, "Node removed");
        Some(removed)
    }

    /// Point-in-time copy of every record, in registration order
    pub async fn snapshot_all(&self) -> Vec<NodeRecord> {
        let state = self.state.read().await;
        state
            .order
            .iter()
            .filter_map(|id| state.nodes.get(id))
            .cloned()
            .collect()
    }

    /// Look up a single record
    pub async fn get(&self, identity: &str) -> Option<NodeRecord> {
        self.state.read().await.nodes.get(identity).cloned()
    }

    /// Number of registered nodes
    pub async fn len(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
