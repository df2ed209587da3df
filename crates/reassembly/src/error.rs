//! Reassembly error types

use thiserror::Error;

/// Reassembly errors
#[derive(Debug, Error)]
pub enum ReassemblyError {
    /// A reassembly is already running on this reassembler
    #[error("a reassembly is already in progress")]
    ReassemblyInProgress,

    /// The job was dropped before delivering its result
    #[error("reassembly job dropped before completion")]
    Abandoned,
}

/// Reassembly Result alias
pub type Result<T> = std::result::Result<T, ReassemblyError>;
