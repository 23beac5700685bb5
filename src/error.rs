//! Error types for pksd
//!
//! Provides a unified error type for the key server and the store node.

use hyper::StatusCode;
use thiserror::Error;

use crate::store::BackendFault;

/// Result type alias using PksError
pub type Result<T> = std::result::Result<T, PksError>;

/// Unified error type for pksd operations
#[derive(Debug, Error)]
pub enum PksError {
    // -------------------------------------------------------------------------
    // Input Errors (client side, never retried)
    // -------------------------------------------------------------------------
    #[error("No key in request object")]
    EmptyKeyText,

    #[error("Invalid armored key: {0}")]
    InvalidArmor(String),

    #[error("No search term in request")]
    EmptyKeyId,

    #[error("Invalid key ID: {0}")]
    InvalidKeyId(#[from] hex::FromHexError),

    #[error("Invalid form data: {0}")]
    InvalidForm(String),

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Backend(#[from] BackendFault),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL / Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration / Runtime Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl PksError {
    /// Whether the error was caused by the request rather than the server.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PksError::EmptyKeyText
                | PksError::InvalidArmor(_)
                | PksError::EmptyKeyId
                | PksError::InvalidKeyId(_)
                | PksError::InvalidForm(_)
        )
    }

    /// HTTP status reported to the client for this error.
    ///
    /// Backend faults, including `InvalidRequest`, are all reported as 500.
    pub fn status(&self) -> StatusCode {
        if self.is_input_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
