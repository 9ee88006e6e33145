//! pulselb-api: HTTP front end for pulselb
//!
//! This crate exposes the balancer over HTTP:
//! - Heartbeat intake for workers
//! - Request forwarding for everything else

pub mod proxy;
pub mod rest;

pub use rest::{create_router, AppState};
