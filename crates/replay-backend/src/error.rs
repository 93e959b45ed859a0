//! Error types for backends

use std::time::Duration;
use thiserror::Error;

/// Result type for capability parsing
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Errors parsing capability overrides
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// A non-blank line was not `key=value`
    #[error("invalid capability, expected key=value: {line}")]
    InvalidSyntax { line: String },
}

/// Result type for registry lookups
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors resolving a backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unsupported backend type: {0}")]
    UnsupportedBackendType(String),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised by a backend or a live client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend could not produce a client
    #[error("failed to launch {backend}: {message}")]
    Launch { backend: String, message: String },

    /// A launch option could not be applied
    #[error("invalid launch option: {0}")]
    InvalidOption(String),

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The WebDriver server rejected a command
    #[error("WebDriver error ({status}): {message}")]
    WebDriver { status: u16, message: String },

    /// The client was already closed
    #[error("client is closed")]
    Closed,

    /// The operation exceeded its time bound
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}
