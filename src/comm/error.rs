// Error types for Comm module

use crate::bridge::BridgeError;
use thiserror::Error;

/// Comm module initialization errors
#[derive(Debug, Error)]
pub enum CommInitError {
    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind listener: {0}")]
    BindFailed(String),
}

/// Comm module runtime errors
#[derive(Debug, Error)]
pub enum CommError {
    /// Capacity and host refusals, visible only to the transport caller
    #[error(transparent)]
    Refused(#[from] BridgeError),

    #[error("server shutting down")]
    ShuttingDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for comm operations
pub type Result<T> = std::result::Result<T, CommError>;
