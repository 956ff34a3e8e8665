//! Error types for NimbusKV
//!
//! Provides a unified error type for all operations, shared by the
//! in-process engine and the network client.

use thiserror::Error;

use crate::value::ValueType;

/// Result type alias using NimbusError
pub type Result<T> = std::result::Result<T, NimbusError>;

/// Unified error type for NimbusKV operations
#[derive(Debug, Error)]
pub enum NimbusError {
    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Record not found")]
    RecordNotFound,

    #[error("Record generation mismatch: expected {expected}, stored {actual}")]
    RecordGenerationMismatch { expected: u32, actual: u32 },

    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    // -------------------------------------------------------------------------
    // Bin Errors
    // -------------------------------------------------------------------------
    #[error("Bin type mismatch on '{bin}': expected {expected}, found {found}")]
    BinTypeMismatch {
        bin: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("Bin not found: {bin}")]
    BinNotFound { bin: String },

    #[error("Element not found in list bin '{bin}'")]
    ElementNotFound { bin: String },

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Invalid parameter: {0}")]
    Parameter(String),

    #[error("Server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for NimbusError {
    fn from(e: bincode::Error) -> Self {
        NimbusError::Serialization(e.to_string())
    }
}
