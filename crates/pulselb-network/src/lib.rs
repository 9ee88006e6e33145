//! pulselb-network: Node bookkeeping and request forwarding
//!
//! This crate provides the concurrency-sensitive core of the balancer:
//! - Node registry fed by worker heartbeats
//! - Liveness monitoring and eviction of silent nodes
//! - Round-robin node selection
//! - Forwarding of inbound requests to the selected node

pub mod balancer;
pub mod health;
pub mod heartbeat;
pub mod proxy;
pub mod registry;

pub use balancer::Selector;
pub use health::{LivenessMonitor, MonitorHandle};
pub use heartbeat::HeartbeatHandler;
pub use proxy::{ForwardRequest, ForwardResponse, Forwarder};
pub use registry::NodeRegistry;
