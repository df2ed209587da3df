//! Detection error types

use thiserror::Error;

/// Detection errors
#[derive(Debug, Error)]
pub enum DetectionError {
    /// Detection worker has shut down
    #[error("detection worker closed")]
    WorkerClosed,
}

/// Detection Result alias
pub type Result<T> = std::result::Result<T, DetectionError>;
