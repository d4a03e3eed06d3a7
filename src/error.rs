//! Error types for AtlasLedger
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Unified error type for AtlasLedger operations
///
/// A duplicate append is not an error: it is reported through
/// [`AppendReceipt::duplicate`](crate::store::AppendReceipt::duplicate).
#[derive(Debug, Error)]
pub enum LedgerError {
    // -------------------------------------------------------------------------
    // Caller Errors (no state change)
    // -------------------------------------------------------------------------
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Invalid query spec: {0}")]
    InvalidQuerySpec(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    /// Backend I/O failed. Fatal for the call that hit it; never retried internally.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] std::io::Error),

    #[error("Log corruption detected: {0}")]
    LogCorruption(String),

    #[error("No record at sequence {0}")]
    SequenceNotFound(u64),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}
