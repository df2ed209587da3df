//! ChunkStore / RecordSink traits - persistence boundary
//!
//! Transient I/O failures are retried behind these traits, not by the core.

use crate::{ContractError, FusedSample, SessionChunkKey, SessionRecord};

/// Keyed chunk persistence
#[trait_variant::make(ChunkStore: Send)]
pub trait LocalChunkStore {
    /// Store name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Persist one chunk under `key`
    ///
    /// # Errors
    /// Returns write error (should include the key)
    async fn put_chunk(
        &self,
        key: &SessionChunkKey,
        samples: &[FusedSample],
    ) -> Result<(), ContractError>;

    /// Fetch a chunk by key
    ///
    /// An empty chunk is valid and returns an empty vector.
    async fn get_chunk(&self, key: &SessionChunkKey) -> Result<Vec<FusedSample>, ContractError>;
}

/// Destination for finished session records
#[trait_variant::make(RecordSink: Send)]
pub trait LocalRecordSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Submit a finished session record
    async fn submit(&self, record: &SessionRecord) -> Result<(), ContractError>;
}
