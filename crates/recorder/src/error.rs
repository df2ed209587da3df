//! Recorder error types

use contracts::SessionChunkKey;
use thiserror::Error;

/// Recorder errors
#[derive(Debug, Error)]
pub enum RecorderError {
    /// start() while a session is active
    #[error("a walking session is already being recorded")]
    AlreadyRecording,

    /// stop()/cancel() while idle, or finalize with no session
    #[error("no walking session is being recorded")]
    NotRecording,

    /// Persistence boundary rejected a chunk
    ///
    /// The key stays in the session's key list so a higher layer can retry it.
    #[error("chunk {key} write failed: {message}")]
    ChunkWriteFailed {
        /// Key of the failed chunk
        key: SessionChunkKey,
        /// Failure reason
        message: String,
    },

    /// Writer worker is gone
    #[error("chunk writer closed")]
    WriterClosed,
}

/// Recorder Result alias
pub type Result<T> = std::result::Result<T, RecorderError>;
