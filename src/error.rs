//! Error types for proglog
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Unified error type for proglog operations
#[derive(Debug, Error)]
pub enum LogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    /// The index has no room for another entry; the segment must rotate.
    #[error("Index full: capacity of {capacity} bytes exhausted")]
    IndexFull { capacity: u64 },

    #[error("Offset {offset} out of range [{lowest}, {next})")]
    OffsetOutOfRange { offset: u64, lowest: u64, next: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Log is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An error status relayed by a remote server
    #[error("Server error: {message}")]
    Server { message: String, retryable: bool },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LogError {
    /// Whether the caller may reasonably retry the failed operation.
    ///
    /// Transient I/O and network failures are retryable. Missing offsets,
    /// corruption and misconfiguration will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            LogError::Io(_) | LogError::Network(_) => true,
            LogError::Server { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Whether the error means the requested record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, LogError::OffsetOutOfRange { .. } | LogError::NotFound(_))
    }
}
