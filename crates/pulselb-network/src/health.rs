//! Liveness monitoring for registered nodes

use chrono::{DateTime, Utc};
use pulselb_core::HealthConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::registry::NodeRegistry;

/// Evicts nodes whose last heartbeat is older than the node timeout
pub struct LivenessMonitor {
    registry: Arc<NodeRegistry>,
    /// Maximum heartbeat age before eviction
    timeout: Duration,
    /// Time between sweeps
    interval: Duration,
}

impl LivenessMonitor {
    /// Create a new liveness monitor
    pub fn new(registry: Arc<NodeRegistry>, config: &HealthConfig) -> Self {
        Self::with_timing(registry, config.node_timeout(), config.monitor_interval())
    }

    pub fn with_timing(registry: Arc<NodeRegistry>, timeout: Duration, interval: Duration) -> Self {
        Self {
            registry,
            timeout,
            interval,
        }
    }

    /// Run one sweep against the wall clock
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    /// Run one sweep as if the current time were `now`; returns the number evicted
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let candidates: Vec<String> = self
            .registry
            .snapshot_all()
            .await
            .into_iter()
            .filter(|node| node.is_stale(now, self.timeout))
            .map(|node| node.identity)
            .collect();

        let mut evicted = 0;
        for identity in candidates {
            if let Some(node) = self
                .registry
                .remove_if_stale(&identity, now, self.timeout)
                .await
            {
                info!(
                    identity = %node.identity,
                    endpoint = %node.url(),
                    age_secs = node.age(now).num_seconds(),
                    "Evicted node after missed heartbeats"
                );
                evicted += 1;
            }
        }

        debug!(evicted, "Liveness sweep completed");
        evicted
    }

    /// Start the periodic sweep task
    pub fn spawn(self) -> MonitorHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            self.run(shutdown_rx).await;
        });

        MonitorHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            timeout_secs = self.timeout.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Liveness monitor started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Liveness monitor stopped");
    }
}

/// Handle to a running liveness monitor
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the monitor to stop and wait for it to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Liveness monitor task failed");
        }
    }
}
