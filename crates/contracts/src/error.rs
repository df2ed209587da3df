//! Layered error definitions
//!
//! Categorized by source: config / chunk store / record sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Chunk Store Errors =====
    /// Chunk write rejected by the store
    #[error("chunk '{key}' write error: {message}")]
    ChunkWrite { key: String, message: String },

    /// Chunk read failed
    #[error("chunk '{key}' read error: {message}")]
    ChunkRead { key: String, message: String },

    /// Chunk key unknown to the store
    #[error("chunk not found: {key}")]
    ChunkNotFound { key: String },

    /// Chunk document could not be encoded/decoded
    #[error("chunk '{key}' codec error: {message}")]
    ChunkCodec { key: String, message: String },

    // ===== Record Sink Errors =====
    /// Session record submission failed
    #[error("record '{record_id}' submit error: {message}")]
    RecordSubmit { record_id: String, message: String },

    // ===== General Errors =====
    /// Operation exceeded its deadline
    #[error("{operation} timed out after {waited_ms}ms")]
    Timeout { operation: String, waited_ms: u64 },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create chunk write error
    pub fn chunk_write(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChunkWrite {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create chunk read error
    pub fn chunk_read(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChunkRead {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create timeout error
    pub fn timeout(operation: impl Into<String>, waited_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            waited_ms,
        }
    }
}
