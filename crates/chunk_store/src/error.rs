//! Chunk store error types

use thiserror::Error;

/// Errors raised while opening a store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store could not be created from its configuration
    #[error("failed to create store '{name}': {message}")]
    StoreCreation { name: String, message: String },

    /// Error from a store operation
    #[error("store error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create a store creation error
    pub fn store_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
