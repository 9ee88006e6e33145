//! pulselb-core: Core types for the pulselb load balancer
//!
//! This crate provides the fundamental types shared by every pulselb crate:
//! - Node records and the heartbeat wire format
//! - Configuration types
//! - Error handling

pub mod config;
pub mod error;
pub mod model;

pub use config::*;
pub use error::*;
pub use model::*;
