//! # Chunk Store
//!
//! Persistence boundary implementations.
//!
//! Contains MemoryChunkStore, FileChunkStore, the record sinks, and
//! [`ConfiguredStore`] which picks a backend from [`StoreConfig`].

mod error;
mod file;
mod memory;
mod records;

use contracts::{ChunkStore, ContractError, FusedSample, SessionChunkKey, StoreConfig, StoreKind};
use tracing::{info, instrument};

pub use error::StoreError;
pub use file::FileChunkStore;
pub use memory::MemoryChunkStore;
pub use records::{FileRecordSink, LogRecordSink, MemoryRecordSink};

/// Store chosen at runtime from configuration
#[derive(Debug, Clone)]
pub enum ConfiguredStore {
    Memory(MemoryChunkStore),
    File(FileChunkStore),
}

impl ConfiguredStore {
    /// Build the store described by `config`
    #[instrument(name = "chunk_store_open", skip(config), fields(kind = ?config.kind))]
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let store = match config.kind {
            StoreKind::Memory => ConfiguredStore::Memory(MemoryChunkStore::new("memory")),
            StoreKind::File => {
                let base_path = config.base_path.as_ref().ok_or_else(|| {
                    StoreError::store_creation("file", "base_path is required for a file store")
                })?;
                ConfiguredStore::File(FileChunkStore::new("file", base_path)?)
            }
        };
        info!(store = store.name(), "Chunk store opened");
        Ok(store)
    }
}

impl ChunkStore for ConfiguredStore {
    fn name(&self) -> &str {
        match self {
            ConfiguredStore::Memory(store) => store.name(),
            ConfiguredStore::File(store) => store.name(),
        }
    }

    async fn put_chunk(
        &self,
        key: &SessionChunkKey,
        samples: &[FusedSample],
    ) -> Result<(), ContractError> {
        match self {
            ConfiguredStore::Memory(store) => store.put_chunk(key, samples).await,
            ConfiguredStore::File(store) => store.put_chunk(key, samples).await,
        }
    }

    async fn get_chunk(&self, key: &SessionChunkKey) -> Result<Vec<FusedSample>, ContractError> {
        match self {
            ConfiguredStore::Memory(store) => store.get_chunk(key).await,
            ConfiguredStore::File(store) => store.get_chunk(key).await,
        }
    }
}
