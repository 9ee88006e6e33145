//! Error types for pulselb

use thiserror::Error;

/// Main error type for pulselb
#[derive(Error, Debug)]
pub enum BalancerError {
    /// The registry holds no node eligible for selection
    #[error("No healthy nodes available")]
    NoHealthyNodes,

    /// The selected node could not be reached or spoke invalid HTTP
    #[error("Upstream {url} unreachable: {reason}")]
    UpstreamUnreachable { url: String, reason: String },

    /// The selected node did not answer within the outbound timeout
    #[error("Upstream {url} timed out")]
    UpstreamTimeout { url: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for pulselb operations
pub type BalancerResult<T> = Result<T, BalancerError>;

impl From<toml::de::Error> for BalancerError {
    fn from(err: toml::de::Error) -> Self {
        BalancerError::Config(err.to_string())
    }
}
