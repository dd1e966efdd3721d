//! Error types for relay-rs

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Relay control plane error types
#[derive(Error, Debug)]
pub enum RelayError {
    /// Malformed, duplicate or missing route or configuration file
    #[error("Configuration error: {0}")]
    Config(String),

    /// The router factory produced nothing, or a router failed to start
    #[error("Activation error: {0}")]
    Activation(String),

    /// No TLS identity could be established
    #[error("Bootstrap error: {0}")]
    Bootstrap(String),

    /// Certificate or key could not be loaded
    #[error("TLS error: {0}")]
    Tls(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
